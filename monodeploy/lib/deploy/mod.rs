//! Driving a deployment plan through the build, verify and publish stages.

mod event;
mod orchestrator;
mod pipeline;
mod publish;
mod report;
mod state;

//--------------------------------------------------------------------------------------------------
// Exports
//--------------------------------------------------------------------------------------------------

pub use event::*;
pub use orchestrator::*;
pub use pipeline::*;
pub use publish::*;
pub use report::*;
pub use state::*;
