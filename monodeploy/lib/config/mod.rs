//! Configuration types and defaults.

mod cpu_arch;
mod defaults;
mod deploy;
mod project;

//--------------------------------------------------------------------------------------------------
// Exports
//--------------------------------------------------------------------------------------------------

pub use cpu_arch::*;
pub use defaults::*;
pub use deploy::*;
pub use project::*;
