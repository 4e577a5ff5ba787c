use std::{path::Path, sync::Arc};

use tokio_util::sync::CancellationToken;

use crate::{
    config::ProjectFile,
    deploy::{DeployEvent, DeployReport, Orchestrator},
    descriptor::{DescriptorRegistry, ProjectDiscovery, TracingHintSink, ValidationHint},
    manifest::{ManifestModel, RemoteManifest},
    platform::{DockerEngine, HttpHealthProbe, HttpPlatformClient, PlatformApi},
    reconcile::{DeploymentPlan, Reconciler},
    MonodeployResult,
};

use super::{apply_declarations, load_project};

//--------------------------------------------------------------------------------------------------
// Types
//--------------------------------------------------------------------------------------------------

/// Options of a deployment started from the command line.
#[derive(Debug, Default, Clone)]
pub struct DeployOptions {
    /// Skip booting and health checking images locally.
    pub skip_verify: bool,

    /// A comment attached to the submitted manifest.
    pub comment: Option<String>,
}

//--------------------------------------------------------------------------------------------------
// Functions
//--------------------------------------------------------------------------------------------------

/// Discovers the descriptors of a project and returns every validation hint.
pub async fn validate(
    project_dir: Option<&Path>,
    project_file: Option<&str>,
) -> MonodeployResult<Vec<ValidationHint>> {
    let (project, project_dir) = load_project(project_dir, project_file).await?;
    let registry = discover(&project, &project_dir).await?;
    Ok(registry.hints().to_vec())
}

/// Reconciles a project with the platform without deploying anything.
pub async fn plan(
    project_dir: Option<&Path>,
    project_file: Option<&str>,
) -> MonodeployResult<DeploymentPlan> {
    let (project, project_dir) = load_project(project_dir, project_file).await?;
    let registry = discover(&project, &project_dir).await?;

    let platform = HttpPlatformClient::new(project.get_settings().get_platform());
    let remote = platform.fetch_remote_manifest().await?;
    let model = compose_model(&registry, &remote, &project, None);

    Reconciler::reconcile(&model, &remote, &registry)
}

/// Deploys a project.
///
/// Progress is logged through `tracing`. The deployment stops at the first failure or when
/// `cancel` fires.
pub async fn deploy(
    project_dir: Option<&Path>,
    project_file: Option<&str>,
    options: DeployOptions,
    cancel: CancellationToken,
) -> MonodeployResult<DeployReport> {
    let (project, project_dir) = load_project(project_dir, project_file).await?;
    let registry = discover(&project, &project_dir).await?;

    let mut config = project.get_settings().clone();
    if options.skip_verify {
        config = config.with_verify_health(false);
    }

    let platform = Arc::new(HttpPlatformClient::new(config.get_platform()));
    let remote = platform.fetch_remote_manifest().await?;
    let model = compose_model(&registry, &remote, &project, options.comment);

    let engine = Arc::new(DockerEngine::new(&config));
    let probe = Arc::new(HttpHealthProbe::new(&config)?);
    let mut orchestrator = Orchestrator::new(registry, platform, engine, probe, config);

    let mut events = orchestrator.subscribe();
    let listener = tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            match event {
                DeployEvent::ServiceStateChanged { name, state } => {
                    tracing::info!(service = %name, ?state, "state changed")
                }
                DeployEvent::ServiceProgress { name, progress } => {
                    tracing::debug!(service = %name, progress = %format!("{:.0}%", progress * 100.0), "upload progress")
                }
                event => tracing::debug!(?event, "deploy event"),
            }
        }
    });

    let result = orchestrator
        .deploy(
            &model,
            cancel,
            |name| tracing::info!(service = %name, "published"),
            |message| tracing::info!("{message}"),
        )
        .await;

    drop(orchestrator);
    let _ = listener.await;

    result
}

/// Composes the model of one deployment attempt from the registry, the remote manifest and the
/// flags set in the project file.
pub fn compose_model(
    registry: &DescriptorRegistry,
    remote: &RemoteManifest,
    project: &ProjectFile,
    comment: Option<String>,
) -> ManifestModel {
    let mut model = ManifestModel::compose(registry, remote);
    apply_declarations(project, &mut model);
    model.comment = comment;
    model
}

async fn discover(project: &ProjectFile, project_dir: &Path) -> MonodeployResult<DescriptorRegistry> {
    let source = ProjectDiscovery::new(project_dir, project.clone());
    DescriptorRegistry::discover(&source, &TracingHintSink).await
}
