use reqwest::{Client, StatusCode};
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware};
use reqwest_retry::{policies::ExponentialBackoff, RetryTransientMiddleware};

use crate::{
    config::PlatformConfig,
    manifest::{RemoteManifest, WireManifest},
    MonodeployError, MonodeployResult,
};

use super::PlatformApi;

//--------------------------------------------------------------------------------------------------
// Constants
//--------------------------------------------------------------------------------------------------

/// The route returning the last accepted manifest.
const CURRENT_MANIFEST_ROUTE: &str = "/api/deploy/manifest/current";

/// The route accepting a new manifest.
const SUBMIT_MANIFEST_ROUTE: &str = "/api/deploy/manifest";

//--------------------------------------------------------------------------------------------------
// Types
//--------------------------------------------------------------------------------------------------

/// A [`PlatformApi`] over HTTP.
///
/// Fetching retries transient errors with exponential backoff. Submitting does not retry.
#[derive(Debug, Clone)]
pub struct HttpPlatformClient {
    api_url: String,
    access_token: Option<String>,
    fetch_client: ClientWithMiddleware,
    submit_client: Client,
}

//--------------------------------------------------------------------------------------------------
// Methods
//--------------------------------------------------------------------------------------------------

impl HttpPlatformClient {
    /// Creates a client from the platform settings.
    ///
    /// The access token is read from the environment variable the settings name.
    pub fn new(config: &PlatformConfig) -> Self {
        let access_token = std::env::var(config.get_access_token_env()).ok();
        if access_token.is_none() {
            tracing::warn!(
                env = %config.get_access_token_env(),
                "no access token set, platform requests are unauthenticated"
            );
        }

        Self::with_token(config, access_token)
    }

    /// Creates a client with an explicit access token.
    pub fn with_token(config: &PlatformConfig, access_token: Option<String>) -> Self {
        let retry_policy =
            ExponentialBackoff::builder().build_with_max_retries(*config.get_max_retries());
        let fetch_client = ClientBuilder::new(Client::new())
            .with(RetryTransientMiddleware::new_with_policy(retry_policy))
            .build();

        Self {
            api_url: config.get_api_url().trim_end_matches('/').to_string(),
            access_token,
            fetch_client,
            submit_client: Client::new(),
        }
    }

    fn url(&self, route: &str) -> String {
        format!("{}{route}", self.api_url)
    }
}

//--------------------------------------------------------------------------------------------------
// Trait Implementations
//--------------------------------------------------------------------------------------------------

#[async_trait::async_trait]
impl PlatformApi for HttpPlatformClient {
    async fn fetch_remote_manifest(&self) -> MonodeployResult<RemoteManifest> {
        let mut request = self.fetch_client.get(self.url(CURRENT_MANIFEST_ROUTE));
        if let Some(token) = &self.access_token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        let status = response.status();

        // Nothing deployed yet.
        if status == StatusCode::NOT_FOUND {
            tracing::info!("platform has no manifest yet");
            return Ok(RemoteManifest::default());
        }

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(MonodeployError::RemoteManifestFetch(format!(
                "{status}: {body}"
            )));
        }

        let manifest = response.json::<RemoteManifest>().await?;
        tracing::debug!(
            services = manifest.services.len(),
            storages = manifest.storages.len(),
            "fetched remote manifest"
        );

        Ok(manifest)
    }

    async fn submit_manifest(&self, manifest: &WireManifest) -> MonodeployResult<()> {
        let mut request = self
            .submit_client
            .post(self.url(SUBMIT_MANIFEST_ROUTE))
            .json(manifest);
        if let Some(token) = &self.access_token {
            request = request.bearer_auth(token);
        }

        let response = request
            .send()
            .await
            .map_err(|e| MonodeployError::ManifestSubmission(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(MonodeployError::ManifestSubmission(format!(
                "{status}: {body}"
            )));
        }

        Ok(())
    }
}
