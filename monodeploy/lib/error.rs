use std::{
    error::Error,
    fmt::{self, Display},
    time::Duration,
};
use thiserror::Error;

use crate::{deploy::PublishState, reconcile::PreconditionViolation};

//--------------------------------------------------------------------------------------------------
// Types
//--------------------------------------------------------------------------------------------------

/// The result of a monodeploy-related operation.
pub type MonodeployResult<T> = Result<T, MonodeployError>;

/// An error that occurred while planning or running a deployment.
#[derive(pretty_error_debug::Debug, Error)]
pub enum MonodeployError {
    /// An I/O error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// An error that can represent any error.
    #[error(transparent)]
    Custom(#[from] AnyError),

    /// An error that occurred during JSON (de)serialization.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// An error that occurred during YAML (de)serialization.
    #[error("yaml error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// An error that occurred during an HTTP request.
    #[error("http request error: {0}")]
    HttpRequest(#[from] reqwest::Error),

    /// An error that occurred during an HTTP middleware operation.
    #[error("http middleware error: {0}")]
    HttpMiddleware(#[from] reqwest_middleware::Error),

    /// The deployment plan violates one or more preconditions. Nothing was built.
    #[error("deployment preconditions not met: {}", format_violations(.0))]
    Precondition(Vec<PreconditionViolation>),

    /// Building the image of a service failed.
    #[error("failed to build service '{service}': {reason}")]
    BuildFailed {
        /// The service being built.
        service: String,

        /// The underlying reason reported by the container engine.
        reason: String,
    },

    /// The built image targets an architecture outside the supported set.
    #[error("service '{service}' was built for unsupported architecture '{arch}'")]
    UnsupportedArchitecture {
        /// The service being built.
        service: String,

        /// The architecture reported for the built image.
        arch: String,
    },

    /// Starting the service locally for verification failed.
    #[error("failed to run service '{service}' locally: {reason}")]
    LocalRunFailed {
        /// The service being verified.
        service: String,

        /// The underlying reason reported by the container engine.
        reason: String,
    },

    /// The service never reported healthy within the configured timeout.
    #[error("service '{service}' did not become healthy within {timeout:?}")]
    HealthCheckTimeout {
        /// The service being verified.
        service: String,

        /// The timeout that elapsed.
        timeout: Duration,
    },

    /// Uploading the image of a service failed.
    #[error("failed to upload service '{service}': {reason}")]
    UploadFailed {
        /// The service being uploaded.
        service: String,

        /// The underlying reason reported by the container engine.
        reason: String,
    },

    /// The deployment was cancelled through its cancellation token.
    #[error("deployment cancelled")]
    Cancelled,

    /// Fetching the remote manifest failed.
    #[error("failed to fetch remote manifest: {0}")]
    RemoteManifestFetch(String),

    /// Submitting the final manifest failed.
    #[error("failed to submit manifest: {0}")]
    ManifestSubmission(String),

    /// An unknown CPU architecture string.
    #[error("invalid cpu architecture: {0}")]
    InvalidCpuArch(String),

    /// A publish state was asked to move backwards or out of a terminal state.
    #[error("invalid publish state transition from {from:?} to {to:?}")]
    InvalidStateTransition {
        /// The current state.
        from: PublishState,

        /// The requested state.
        to: PublishState,
    },

    /// An external command exited unsuccessfully.
    #[error("command `{command}` failed with {status}: {stderr}")]
    CommandFailed {
        /// The command line that was run.
        command: String,

        /// The exit status.
        status: String,

        /// Captured standard error.
        stderr: String,
    },

    /// The project file could not be found.
    #[error("project file not found: {0}")]
    ProjectFileNotFound(String),

    /// The requested service is not known to the registry.
    #[error("service not found: {0}")]
    ServiceNotFound(String),
}

/// An error that can represent any error.
#[derive(Debug)]
pub struct AnyError {
    error: anyhow::Error,
}

//--------------------------------------------------------------------------------------------------
// Methods
//--------------------------------------------------------------------------------------------------

impl MonodeployError {
    /// Creates a new `Err` result.
    pub fn custom(error: impl Into<anyhow::Error>) -> MonodeployError {
        MonodeployError::Custom(AnyError {
            error: error.into(),
        })
    }

    /// Returns `true` if the error reports a cancelled deployment.
    pub fn is_cancellation(&self) -> bool {
        matches!(self, MonodeployError::Cancelled)
    }

    /// Returns `true` if the error was raised before any pipeline stage ran.
    pub fn is_precondition(&self) -> bool {
        matches!(self, MonodeployError::Precondition(_))
    }
}

impl AnyError {
    /// Downcasts the error to a `T`.
    pub fn downcast<T>(&self) -> Option<&T>
    where
        T: Display + fmt::Debug + Send + Sync + 'static,
    {
        self.error.downcast_ref::<T>()
    }
}

//--------------------------------------------------------------------------------------------------
// Functions
//--------------------------------------------------------------------------------------------------

/// Creates an `Ok` `MonodeployResult`.
#[allow(non_snake_case)]
pub fn Ok<T>(value: T) -> MonodeployResult<T> {
    Result::Ok(value)
}

fn format_violations(violations: &[PreconditionViolation]) -> String {
    violations
        .iter()
        .map(|v| v.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

//--------------------------------------------------------------------------------------------------
// Trait Implementations
//--------------------------------------------------------------------------------------------------

impl PartialEq for AnyError {
    fn eq(&self, other: &Self) -> bool {
        self.error.to_string() == other.error.to_string()
    }
}

impl Display for AnyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.error)
    }
}

impl Error for AnyError {}
