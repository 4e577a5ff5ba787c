use std::{
    collections::{BTreeMap, BTreeSet},
    process::Stdio,
};

use tokio::{
    io::{AsyncBufReadExt, BufReader},
    process::Command,
};

use crate::{
    config::{CpuArch, DeployConfig},
    descriptor::{container_name, image_tag, ServiceDescriptor},
    manifest::ImageDetails,
    MonodeployError, MonodeployResult,
};

use super::{BuildOptions, ContainerEngine};

//--------------------------------------------------------------------------------------------------
// Constants
//--------------------------------------------------------------------------------------------------

/// The container engine binary.
const DOCKER_BIN: &str = "docker";

/// The suffix of the container running the client code generator of a service.
const CODEGEN_SUFFIX: &str = "codegen";

/// The port storages listen on inside their container.
const STORAGE_CONTAINER_PORT: u16 = 27017;

//--------------------------------------------------------------------------------------------------
// Types
//--------------------------------------------------------------------------------------------------

/// A [`ContainerEngine`] driving the `docker` command line.
///
/// Images are loaded into the local image store so they can be verified, which limits every build
/// to a single platform: the first configured architecture.
#[derive(Debug, Clone)]
pub struct DockerEngine {
    image_prefix: String,
    registry: Option<String>,
    health_port: u16,
}

/// Tracks the layers reported by `docker push`.
#[derive(Debug, Default)]
struct PushProgress {
    layers: BTreeSet<String>,
    done: BTreeSet<String>,
}

//--------------------------------------------------------------------------------------------------
// Methods
//--------------------------------------------------------------------------------------------------

impl DockerEngine {
    /// Creates an engine from the deployment settings.
    pub fn new(config: &DeployConfig) -> Self {
        Self {
            image_prefix: config.get_image_prefix().clone(),
            registry: config.get_platform().get_registry().clone(),
            health_port: *config.get_health_port(),
        }
    }

    /// Returns the name of the local container of a storage.
    pub fn storage_container(&self, storage: &str) -> String {
        format!("{}-storage-{storage}", self.image_prefix)
    }

    /// Returns the tag an image is pushed under.
    pub fn remote_tag(&self, service: &str, image_id: &str) -> String {
        let short_id = image_id.trim_start_matches("sha256:");
        let short_id = &short_id[..short_id.len().min(12)];
        match &self.registry {
            Some(registry) => format!(
                "{}/{}/{service}:{short_id}",
                registry.trim_end_matches('/'),
                self.image_prefix
            ),
            None => format!("{}/{service}:{short_id}", self.image_prefix),
        }
    }

    async fn docker(&self, args: &[String]) -> MonodeployResult<String> {
        tracing::debug!(args = ?args, "running docker");
        let output = Command::new(DOCKER_BIN).args(args).output().await?;

        if !output.status.success() {
            return Err(MonodeployError::CommandFailed {
                command: format!("{DOCKER_BIN} {}", args.join(" ")),
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }

    async fn remove_container(&self, name: &str) -> MonodeployResult<()> {
        match self
            .docker(&["rm".into(), "-f".into(), name.to_string()])
            .await
        {
            Err(MonodeployError::CommandFailed { stderr, .. })
                if stderr.contains("No such container") =>
            {
                Ok(())
            }
            result => result.map(|_| ()),
        }
    }

    async fn push(
        &self,
        remote_tag: &str,
        on_progress: &(dyn Fn(f32) + Send + Sync),
    ) -> MonodeployResult<()> {
        let mut child = Command::new(DOCKER_BIN)
            .args(["push", remote_tag])
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()?;

        let mut progress = PushProgress::default();
        if let Some(stdout) = child.stdout.take() {
            let mut lines = BufReader::new(stdout).lines();
            while let Some(line) = lines.next_line().await? {
                if let Some(fraction) = progress.observe(&line) {
                    on_progress(fraction);
                }
            }
        }

        let output = child.wait_with_output().await?;
        if !output.status.success() {
            return Err(MonodeployError::CommandFailed {
                command: format!("{DOCKER_BIN} push {remote_tag}"),
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        on_progress(1.0);
        Ok(())
    }
}

impl PushProgress {
    /// Feeds one output line and returns the fraction of finished layers if it changed.
    ///
    /// Only `<layer id>: <status>` lines count. The closing `<tag>: digest: ...` line does not.
    fn observe(&mut self, line: &str) -> Option<f32> {
        let (layer, status) = line.trim().split_once(": ")?;
        if status.starts_with("digest:") || !layer.chars().all(|c| c.is_ascii_hexdigit()) {
            return None;
        }

        self.layers.insert(layer.to_string());
        if status.starts_with("Pushed") || status.starts_with("Layer already exists") {
            self.done.insert(layer.to_string());
            return Some(self.done.len() as f32 / self.layers.len() as f32);
        }

        None
    }
}

//--------------------------------------------------------------------------------------------------
// Trait Implementations
//--------------------------------------------------------------------------------------------------

#[async_trait::async_trait]
impl ContainerEngine for DockerEngine {
    async fn build_image(
        &self,
        service: &ServiceDescriptor,
        architectures: &[CpuArch],
        options: &BuildOptions,
    ) -> MonodeployResult<ImageDetails> {
        let build_failed = |e: MonodeployError| MonodeployError::BuildFailed {
            service: service.get_name().clone(),
            reason: e.to_string(),
        };

        if architectures.len() > 1 {
            tracing::warn!(
                service = %service.get_name(),
                ?architectures,
                "local builds load a single platform, building for the first architecture only"
            );
        }

        self.docker(&build_args(architectures, options))
            .await
            .map_err(build_failed)?;

        let inspect = self
            .docker(&[
                "image".into(),
                "inspect".into(),
                "--format".into(),
                "{{.Id}} {{.Os}}/{{.Architecture}}".into(),
                options.get_image_tag().clone(),
            ])
            .await
            .map_err(build_failed)?;

        let (image_id, platform) =
            inspect
                .split_once(' ')
                .ok_or_else(|| MonodeployError::BuildFailed {
                    service: service.get_name().clone(),
                    reason: format!("unexpected image inspect output: {inspect}"),
                })?;

        Ok(ImageDetails::new(image_id, platform))
    }

    async fn stop_instance(&self, service: &ServiceDescriptor) -> MonodeployResult<()> {
        self.remove_container(&container_name(&self.image_prefix, service.get_name()))
            .await
    }

    async fn stop_client_generator(&self, service: &ServiceDescriptor) -> MonodeployResult<()> {
        let name = format!(
            "{}-{CODEGEN_SUFFIX}",
            container_name(&self.image_prefix, service.get_name())
        );
        self.remove_container(&name).await
    }

    async fn run_instance_locally(
        &self,
        service: &ServiceDescriptor,
        connections: &BTreeMap<String, String>,
    ) -> MonodeployResult<()> {
        let port = self.health_port.to_string();
        let mut args = vec![
            "run".to_string(),
            "-d".to_string(),
            "--name".to_string(),
            container_name(&self.image_prefix, service.get_name()),
            "-p".to_string(),
            format!("{port}:{port}"),
        ];
        for (storage, connection) in connections {
            args.push("-e".to_string());
            args.push(format!("{}={connection}", connection_env_var(storage)));
        }
        args.push(image_tag(&self.image_prefix, service.get_name()));

        self.docker(&args)
            .await
            .map_err(|e| MonodeployError::LocalRunFailed {
                service: service.get_name().clone(),
                reason: e.to_string(),
            })?;

        Ok(())
    }

    async fn upload_image(
        &self,
        service: &ServiceDescriptor,
        image_id: &str,
        on_progress: &(dyn Fn(f32) + Send + Sync),
    ) -> MonodeployResult<()> {
        let upload_failed = |e: MonodeployError| MonodeployError::UploadFailed {
            service: service.get_name().clone(),
            reason: e.to_string(),
        };

        let remote_tag = self.remote_tag(service.get_name(), image_id);
        self.docker(&["tag".into(), image_id.to_string(), remote_tag.clone()])
            .await
            .map_err(upload_failed)?;

        on_progress(0.0);
        self.push(&remote_tag, on_progress)
            .await
            .map_err(upload_failed)
    }

    async fn connection_strings(
        &self,
        service: &ServiceDescriptor,
    ) -> MonodeployResult<BTreeMap<String, String>> {
        let mut connections = BTreeMap::new();
        for storage in service.get_dependencies() {
            let port = self
                .docker(&[
                    "port".into(),
                    self.storage_container(storage),
                    STORAGE_CONTAINER_PORT.to_string(),
                ])
                .await;

            // A storage that is not running locally has no connection string.
            let Ok(port) = port else {
                tracing::debug!(storage = %storage, "storage not running locally");
                continue;
            };

            if let Some(address) = port.lines().next() {
                let address = address.replace("0.0.0.0", "127.0.0.1");
                connections.insert(storage.clone(), format!("mongodb://{address}/{storage}"));
            }
        }

        Ok(connections)
    }
}

//--------------------------------------------------------------------------------------------------
// Functions
//--------------------------------------------------------------------------------------------------

/// Returns the `docker buildx build` arguments for a single-platform, locally loaded image.
fn build_args(architectures: &[CpuArch], options: &BuildOptions) -> Vec<String> {
    let arch = architectures.first().copied().unwrap_or(CpuArch::Amd64);

    let mut args = vec![
        "buildx".to_string(),
        "build".to_string(),
        "--platform".to_string(),
        arch.platform(),
        "--load".to_string(),
        "-t".to_string(),
        options.get_image_tag().clone(),
    ];
    if *options.get_no_cache() {
        args.push("--no-cache".to_string());
    }
    args.push(options.get_build_context().display().to_string());
    args
}

/// Returns the environment variable a connection string is passed in.
pub fn connection_env_var(storage: &str) -> String {
    let name: String = storage
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_uppercase()
            } else {
                '_'
            }
        })
        .collect();
    format!("CONNECTION_STRING_{name}")
}

//--------------------------------------------------------------------------------------------------
// Tests
//--------------------------------------------------------------------------------------------------
