use std::{collections::BTreeMap, path::PathBuf};

use getset::Getters;
use typed_builder::TypedBuilder;

use crate::{
    config::CpuArch,
    descriptor::ServiceDescriptor,
    manifest::{ImageDetails, RemoteManifest, WireManifest},
    MonodeployResult,
};

//--------------------------------------------------------------------------------------------------
// Types
//--------------------------------------------------------------------------------------------------

/// Options for a single image build.
#[derive(Debug, Clone, PartialEq, Eq, TypedBuilder, Getters)]
#[getset(get = "pub with_prefix")]
pub struct BuildOptions {
    /// The tag the image is built under.
    #[builder(setter(into))]
    image_tag: String,

    /// The directory the image is built from.
    #[builder(setter(into))]
    build_context: PathBuf,

    /// Whether the engine should ignore its layer cache.
    #[builder(default)]
    no_cache: bool,
}

/// The answer of a health endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HealthStatus {
    /// The service reports it is ready.
    Healthy,

    /// The service reports it is not ready yet.
    Unhealthy,

    /// The service answered with something that is neither.
    Unknown,
}

//--------------------------------------------------------------------------------------------------
// Traits
//--------------------------------------------------------------------------------------------------

/// The deployment API of the remote platform.
#[async_trait::async_trait]
pub trait PlatformApi: Send + Sync {
    /// Fetches the manifest the platform last accepted.
    async fn fetch_remote_manifest(&self) -> MonodeployResult<RemoteManifest>;

    /// Submits the target state of a deployment. Never retried.
    async fn submit_manifest(&self, manifest: &WireManifest) -> MonodeployResult<()>;
}

/// Builds, runs and uploads service images.
#[async_trait::async_trait]
pub trait ContainerEngine: Send + Sync {
    /// Builds the image of a service for the given architectures.
    async fn build_image(
        &self,
        service: &ServiceDescriptor,
        architectures: &[CpuArch],
        options: &BuildOptions,
    ) -> MonodeployResult<ImageDetails>;

    /// Stops the local instance of a service. Stopping a service that is not running succeeds.
    async fn stop_instance(&self, service: &ServiceDescriptor) -> MonodeployResult<()>;

    /// Stops the client code generator attached to a service, if one is running.
    async fn stop_client_generator(&self, service: &ServiceDescriptor) -> MonodeployResult<()>;

    /// Starts the freshly built image of a service locally.
    ///
    /// `connections` maps storage names to connection strings.
    async fn run_instance_locally(
        &self,
        service: &ServiceDescriptor,
        connections: &BTreeMap<String, String>,
    ) -> MonodeployResult<()>;

    /// Uploads an image, reporting progress between `0.0` and `1.0`.
    async fn upload_image(
        &self,
        service: &ServiceDescriptor,
        image_id: &str,
        on_progress: &(dyn Fn(f32) + Send + Sync),
    ) -> MonodeployResult<()>;

    /// Returns the connection strings of the locally running storages a service depends on.
    async fn connection_strings(
        &self,
        service: &ServiceDescriptor,
    ) -> MonodeployResult<BTreeMap<String, String>>;
}

/// Queries the health endpoint of a locally running service.
#[async_trait::async_trait]
pub trait HealthProbe: Send + Sync {
    /// Polls the health endpoint once.
    ///
    /// An error means the endpoint could not be reached at all.
    async fn query_health(&self, service: &ServiceDescriptor) -> MonodeployResult<HealthStatus>;
}
