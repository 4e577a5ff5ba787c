use std::time::Duration;

//--------------------------------------------------------------------------------------------------
// Constants
//--------------------------------------------------------------------------------------------------

/// The default interval between two health polls of a locally running service.
pub const DEFAULT_HEALTH_CHECK_INTERVAL: Duration = Duration::from_millis(500);

/// The default time a locally running service has to report healthy.
pub const DEFAULT_HEALTH_CHECK_TIMEOUT: Duration = Duration::from_secs(10);

/// The default port the health endpoint of a service listens on.
pub const DEFAULT_HEALTH_PORT: u16 = 6565;

/// The default path of the health endpoint of a service.
pub const DEFAULT_HEALTH_PATH: &str = "/health";

/// The default prefix for image tags and container names.
pub const DEFAULT_IMAGE_PREFIX: &str = "monodeploy";

/// The default base URL of the platform API.
pub const DEFAULT_PLATFORM_API_URL: &str = "http://127.0.0.1:8080";

/// The default environment variable holding the platform access token.
pub const DEFAULT_ACCESS_TOKEN_ENV: &str = "MONODEPLOY_ACCESS_TOKEN";

/// The default number of retries for idempotent platform requests.
pub const DEFAULT_MAX_RETRIES: u32 = 3;
