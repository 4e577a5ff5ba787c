//! Reconciliation of local intent with the remote manifest into a deployment plan.

mod plan;
mod precondition;
mod reconciler;

//--------------------------------------------------------------------------------------------------
// Exports
//--------------------------------------------------------------------------------------------------

pub use plan::*;
pub use precondition::*;
pub use reconciler::*;
