//! The external collaborators a deployment talks to: the platform API, the container engine and
//! the health endpoints of locally running services.

mod docker;
mod health;
mod http;
mod traits;

//--------------------------------------------------------------------------------------------------
// Exports
//--------------------------------------------------------------------------------------------------

pub use docker::*;
pub use health::*;
pub use http::*;
pub use traits::*;
