//! High-level operations behind the command line: loading a project, planning and deploying it.

mod deploy;
mod project;

//--------------------------------------------------------------------------------------------------
// Exports
//--------------------------------------------------------------------------------------------------

pub use deploy::*;
pub use project::*;
