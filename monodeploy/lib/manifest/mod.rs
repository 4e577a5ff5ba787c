//! The local deployment model and the wire entities exchanged with the platform.

mod image;
mod model;
mod wire;

//--------------------------------------------------------------------------------------------------
// Exports
//--------------------------------------------------------------------------------------------------

pub use image::*;
pub use model::*;
pub use wire::*;
