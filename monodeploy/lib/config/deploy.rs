//! Deployment settings.

use std::time::Duration;

use getset::Getters;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use typed_builder::TypedBuilder;

use super::{
    CpuArch, DEFAULT_ACCESS_TOKEN_ENV, DEFAULT_HEALTH_CHECK_INTERVAL, DEFAULT_HEALTH_CHECK_TIMEOUT,
    DEFAULT_HEALTH_PATH, DEFAULT_HEALTH_PORT, DEFAULT_IMAGE_PREFIX, DEFAULT_MAX_RETRIES,
    DEFAULT_PLATFORM_API_URL,
};

//--------------------------------------------------------------------------------------------------
// Types
//--------------------------------------------------------------------------------------------------

/// Settings that shape a deployment attempt.
///
/// Every field has a default so an empty `settings:` block in the project file is valid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TypedBuilder, Getters)]
#[getset(get = "pub with_prefix")]
pub struct DeployConfig {
    /// Whether freshly built images are booted locally and health checked before upload.
    #[serde(default = "DeployConfig::default_verify_health")]
    #[builder(default = DeployConfig::default_verify_health())]
    pub(super) verify_health: bool,

    /// The interval between two health polls.
    #[serde(
        default = "DeployConfig::default_health_check_interval",
        rename = "health_check_interval_ms",
        serialize_with = "serialize_millis",
        deserialize_with = "deserialize_millis"
    )]
    #[builder(default = DEFAULT_HEALTH_CHECK_INTERVAL)]
    pub(super) health_check_interval: Duration,

    /// The time a locally running service has to report healthy.
    #[serde(
        default = "DeployConfig::default_health_check_timeout",
        rename = "health_check_timeout_ms",
        serialize_with = "serialize_millis",
        deserialize_with = "deserialize_millis"
    )]
    #[builder(default = DEFAULT_HEALTH_CHECK_TIMEOUT)]
    pub(super) health_check_timeout: Duration,

    /// The port the health endpoint of every service listens on.
    #[serde(default = "DeployConfig::default_health_port")]
    #[builder(default = DEFAULT_HEALTH_PORT)]
    pub(super) health_port: u16,

    /// The path of the health endpoint.
    #[serde(default = "DeployConfig::default_health_path")]
    #[builder(default = DEFAULT_HEALTH_PATH.to_string(), setter(into))]
    pub(super) health_path: String,

    /// The architectures images are built for.
    #[serde(default = "DeployConfig::default_architectures")]
    #[builder(default = DeployConfig::default_architectures())]
    pub(super) architectures: Vec<CpuArch>,

    /// The prefix used for image tags and container names.
    #[serde(default = "DeployConfig::default_image_prefix")]
    #[builder(default = DEFAULT_IMAGE_PREFIX.to_string(), setter(into))]
    pub(super) image_prefix: String,

    /// How to reach the platform.
    #[serde(default)]
    #[builder(default)]
    pub(super) platform: PlatformConfig,
}

/// How to reach the remote platform and its image registry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TypedBuilder, Getters)]
#[getset(get = "pub with_prefix")]
pub struct PlatformConfig {
    /// The base URL of the platform API.
    #[serde(default = "PlatformConfig::default_api_url")]
    #[builder(default = DEFAULT_PLATFORM_API_URL.to_string(), setter(into))]
    pub(super) api_url: String,

    /// The environment variable holding the access token sent with platform requests.
    #[serde(default = "PlatformConfig::default_access_token_env")]
    #[builder(default = DEFAULT_ACCESS_TOKEN_ENV.to_string(), setter(into))]
    pub(super) access_token_env: String,

    /// The registry images are pushed to. Images are pushed under their local tag when unset.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    #[builder(default, setter(strip_option, into))]
    pub(super) registry: Option<String>,

    /// The number of retries for idempotent requests.
    #[serde(default = "PlatformConfig::default_max_retries")]
    #[builder(default = DEFAULT_MAX_RETRIES)]
    pub(super) max_retries: u32,
}

//--------------------------------------------------------------------------------------------------
// Methods
//--------------------------------------------------------------------------------------------------

impl DeployConfig {
    fn default_verify_health() -> bool {
        true
    }

    fn default_health_check_interval() -> Duration {
        DEFAULT_HEALTH_CHECK_INTERVAL
    }

    fn default_health_check_timeout() -> Duration {
        DEFAULT_HEALTH_CHECK_TIMEOUT
    }

    fn default_health_port() -> u16 {
        DEFAULT_HEALTH_PORT
    }

    fn default_health_path() -> String {
        DEFAULT_HEALTH_PATH.to_string()
    }

    fn default_architectures() -> Vec<CpuArch> {
        vec![CpuArch::Amd64]
    }

    fn default_image_prefix() -> String {
        DEFAULT_IMAGE_PREFIX.to_string()
    }

    /// Returns a copy of this configuration with health verification switched on or off.
    pub fn with_verify_health(mut self, verify_health: bool) -> Self {
        self.verify_health = verify_health;
        self
    }
}

impl PlatformConfig {
    fn default_api_url() -> String {
        DEFAULT_PLATFORM_API_URL.to_string()
    }

    fn default_access_token_env() -> String {
        DEFAULT_ACCESS_TOKEN_ENV.to_string()
    }

    fn default_max_retries() -> u32 {
        DEFAULT_MAX_RETRIES
    }
}

//--------------------------------------------------------------------------------------------------
// Trait Implementations
//--------------------------------------------------------------------------------------------------

impl Default for DeployConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl Default for PlatformConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}

//--------------------------------------------------------------------------------------------------
// Functions: Serialization helpers
//--------------------------------------------------------------------------------------------------

fn serialize_millis<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_u64(duration.as_millis() as u64)
}

fn deserialize_millis<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    let millis = u64::deserialize(deserializer)?;
    Ok(Duration::from_millis(millis))
}

//--------------------------------------------------------------------------------------------------
// Tests
//--------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deploy_config_defaults() {
        let config = DeployConfig::default();
        assert!(*config.get_verify_health());
        assert_eq!(*config.get_health_check_interval(), Duration::from_millis(500));
        assert_eq!(*config.get_health_check_timeout(), Duration::from_secs(10));
        assert_eq!(*config.get_health_port(), 6565);
        assert_eq!(config.get_health_path(), "/health");
        assert_eq!(config.get_architectures(), &vec![CpuArch::Amd64]);
        assert_eq!(config.get_platform().get_registry(), &None);
    }

    #[test]
    fn test_deploy_config_from_empty_yaml() {
        let config: DeployConfig = serde_yaml::from_str("{}").unwrap();
        assert_eq!(config, DeployConfig::default());
    }

    #[test]
    fn test_deploy_config_from_yaml() {
        let yaml = r#"
verify_health: false
health_check_interval_ms: 250
health_check_timeout_ms: 3000
architectures: [amd64, arm64]
platform:
  api_url: https://platform.example.com
  registry: registry.example.com/team
"#;
        let config: DeployConfig = serde_yaml::from_str(yaml).unwrap();
        assert!(!*config.get_verify_health());
        assert_eq!(*config.get_health_check_interval(), Duration::from_millis(250));
        assert_eq!(*config.get_health_check_timeout(), Duration::from_secs(3));
        assert_eq!(config.get_architectures().len(), 2);
        assert_eq!(
            config.get_platform().get_api_url(),
            "https://platform.example.com"
        );
        assert_eq!(
            config.get_platform().get_registry().as_deref(),
            Some("registry.example.com/team")
        );
        assert_eq!(*config.get_platform().get_max_retries(), DEFAULT_MAX_RETRIES);
    }
}
