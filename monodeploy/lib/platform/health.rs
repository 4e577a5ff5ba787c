use std::time::Duration;

use reqwest::{Client, StatusCode};

use crate::{config::DeployConfig, descriptor::ServiceDescriptor, MonodeployResult};

use super::{HealthProbe, HealthStatus};

//--------------------------------------------------------------------------------------------------
// Constants
//--------------------------------------------------------------------------------------------------

/// The time a single health request may take.
const HEALTH_REQUEST_TIMEOUT: Duration = Duration::from_secs(2);

//--------------------------------------------------------------------------------------------------
// Types
//--------------------------------------------------------------------------------------------------

/// A [`HealthProbe`] that calls the health endpoint of a service running on the local host.
#[derive(Debug, Clone)]
pub struct HttpHealthProbe {
    client: Client,
    port: u16,
    path: String,
}

//--------------------------------------------------------------------------------------------------
// Methods
//--------------------------------------------------------------------------------------------------

impl HttpHealthProbe {
    /// Creates a probe for the health port and path in `config`.
    pub fn new(config: &DeployConfig) -> MonodeployResult<Self> {
        let client = Client::builder().timeout(HEALTH_REQUEST_TIMEOUT).build()?;
        Ok(Self {
            client,
            port: *config.get_health_port(),
            path: config.get_health_path().clone(),
        })
    }

    /// Returns the URL the probe polls.
    pub fn url(&self) -> String {
        format!("http://127.0.0.1:{}{}", self.port, self.path)
    }
}

//--------------------------------------------------------------------------------------------------
// Trait Implementations
//--------------------------------------------------------------------------------------------------

#[async_trait::async_trait]
impl HealthProbe for HttpHealthProbe {
    async fn query_health(&self, service: &ServiceDescriptor) -> MonodeployResult<HealthStatus> {
        let response = self.client.get(self.url()).send().await?;
        let status = response.status();
        tracing::debug!(service = %service.get_name(), %status, "health response");

        Ok(match status {
            s if s.is_success() => HealthStatus::Healthy,
            StatusCode::SERVICE_UNAVAILABLE => HealthStatus::Unhealthy,
            _ => HealthStatus::Unknown,
        })
    }
}

//--------------------------------------------------------------------------------------------------
// Tests
//--------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_health_probe_url() -> anyhow::Result<()> {
        let config = DeployConfig::builder()
            .health_port(7070)
            .health_path("/ready")
            .build();
        let probe = HttpHealthProbe::new(&config)?;
        assert_eq!(probe.url(), "http://127.0.0.1:7070/ready");
        Ok(())
    }
}
