//! Descriptors of the deployable units of a project and the registry that holds them.
//!
//! Descriptors are produced by a [`DescriptorSource`] (a static registration list or the project
//! file), validated, and cached by the [`DescriptorRegistry`]. Discovery never fails because of a
//! malformed declaration; problems are reported as [`ValidationHint`]s instead.

mod hint;
mod registry;
mod service;
mod source;
mod storage;

//--------------------------------------------------------------------------------------------------
// Exports
//--------------------------------------------------------------------------------------------------

pub use hint::*;
pub use registry::*;
pub use service::*;
pub use source::*;
pub use storage::*;
