use std::{collections::BTreeMap, sync::Arc};

use chrono::Utc;
use tokio::sync::mpsc::UnboundedReceiver;
use tokio_util::sync::CancellationToken;

use crate::{
    config::DeployConfig,
    descriptor::DescriptorRegistry,
    manifest::{ImageDetails, ManifestModel},
    platform::{BuildOptions, ContainerEngine, HealthProbe, PlatformApi},
    reconcile::{PlanEntry, Reconciler},
    MonodeployError, MonodeployResult,
};

use super::{
    DeployEvent, DeployReport, EventBus, PipelineStage, Pipeline, PublishState, UploadSession,
};

//--------------------------------------------------------------------------------------------------
// Types
//--------------------------------------------------------------------------------------------------

/// Drives deployments of a project.
///
/// A deployment fetches the remote manifest, reconciles it with the local model, runs the pipeline
/// for every buildable entry in plan order, and submits the resulting manifest. Entries are
/// processed one at a time and the first failure aborts the attempt. Entries published before the
/// failure stay published; entries after it stay `NotStarted`.
///
/// The orchestrator keeps the images it uploaded, so deploying the same images again through the
/// same orchestrator never uploads twice.
pub struct Orchestrator {
    registry: DescriptorRegistry,
    platform: Arc<dyn PlatformApi>,
    engine: Arc<dyn ContainerEngine>,
    probe: Arc<dyn HealthProbe>,
    config: DeployConfig,
    states: BTreeMap<String, PublishState>,
    bus: EventBus,
    session: UploadSession,
}

struct Progress {
    published: Vec<String>,
    uploaded: Vec<String>,
    skipped_uploads: Vec<String>,
}

//--------------------------------------------------------------------------------------------------
// Methods
//--------------------------------------------------------------------------------------------------

impl Orchestrator {
    /// Creates an orchestrator over the given registry and collaborators.
    pub fn new(
        registry: DescriptorRegistry,
        platform: Arc<dyn PlatformApi>,
        engine: Arc<dyn ContainerEngine>,
        probe: Arc<dyn HealthProbe>,
        config: DeployConfig,
    ) -> Self {
        Self {
            registry,
            platform,
            engine,
            probe,
            config,
            states: BTreeMap::new(),
            bus: EventBus::default(),
            session: UploadSession::default(),
        }
    }

    /// Returns a receiver of every event emitted from now on.
    pub fn subscribe(&mut self) -> UnboundedReceiver<DeployEvent> {
        self.bus.subscribe()
    }

    /// Returns the publish state of a service or storage in the current or last attempt.
    ///
    /// An attempt that fails before its plan is ready leaves no states behind.
    pub fn state_of(&self, name: &str) -> Option<PublishState> {
        self.states.get(name).copied()
    }

    /// Returns every publish state of the current or last attempt.
    pub fn states(&self) -> &BTreeMap<String, PublishState> {
        &self.states
    }

    /// Returns the descriptor registry.
    pub fn registry(&self) -> &DescriptorRegistry {
        &self.registry
    }

    /// Returns the deployment settings.
    pub fn config(&self) -> &DeployConfig {
        &self.config
    }

    /// Deploys `model`.
    ///
    /// `on_published` is called with the name of every service that reaches `Published`, and
    /// `on_log` with a message before and after every stage.
    ///
    /// ## Errors
    ///
    /// Returns the precondition error if the plan cannot be deployed, the first pipeline or upload
    /// error otherwise, [`MonodeployError::Cancelled`] if `cancel` fires, or the submission error
    /// if the platform rejects the manifest. Every failure is also emitted as
    /// [`DeployEvent::DeployFailed`].
    pub async fn deploy(
        &mut self,
        model: &ManifestModel,
        cancel: CancellationToken,
        mut on_published: impl FnMut(&str) + Send,
        mut on_log: impl FnMut(&str) + Send,
    ) -> MonodeployResult<DeployReport> {
        match self
            .run(model, &cancel, &mut on_published, &mut on_log)
            .await
        {
            Ok(report) => {
                let count = report.published.len();
                on_log(&format!("deployment succeeded, {count} published"));
                self.bus.emit(DeployEvent::DeploySucceeded { count });
                Ok(report)
            }
            Err(e) => {
                let message = e.to_string();
                tracing::error!(error = %message, "deployment failed");
                on_log(&format!("deployment failed: {message}"));
                self.bus.emit(DeployEvent::DeployFailed { message });
                Err(e)
            }
        }
    }

    async fn run(
        &mut self,
        model: &ManifestModel,
        cancel: &CancellationToken,
        on_published: &mut (dyn FnMut(&str) + Send),
        on_log: &mut (dyn FnMut(&str) + Send),
    ) -> MonodeployResult<DeployReport> {
        let started_at = Utc::now();
        self.states.clear();

        on_log("fetching remote manifest");
        let remote = self.platform.fetch_remote_manifest().await?;
        let plan = Reconciler::reconcile(model, &remote, &self.registry)?;

        self.states = plan
            .get_entries()
            .iter()
            .map(|e| e.get_name())
            .chain(plan.get_storages().iter().map(|s| s.get_name()))
            .map(|name| (name.clone(), PublishState::NotStarted))
            .collect();
        self.bus.emit(DeployEvent::BeforeDeploy { total: plan.len() });
        on_log(&format!("deploying {} entries", plan.len()));

        let mut progress = Progress {
            published: Vec::new(),
            uploaded: Vec::new(),
            skipped_uploads: Vec::new(),
        };
        let mut images = BTreeMap::new();

        for entry in plan.buildable() {
            if cancel.is_cancelled() {
                return Err(MonodeployError::Cancelled);
            }

            let image = self
                .deploy_entry(entry, cancel, &mut progress, on_log)
                .await?;
            on_published(entry.get_name());
            images.insert(entry.get_name().clone(), image);
        }

        for entry in plan.pass_through() {
            transition(&mut self.states, &self.bus, entry.get_name(), PublishState::Published)?;
            progress.published.push(entry.get_name().clone());
            on_published(entry.get_name());
        }

        for storage in plan.get_storages() {
            transition(&mut self.states, &self.bus, storage.get_name(), PublishState::Published)?;
            progress.published.push(storage.get_name().clone());
        }

        let manifest = plan.to_wire_manifest(&images);
        let manifest_digest = manifest.digest()?;
        on_log(&format!("submitting manifest {manifest_digest}"));
        tracing::info!(
            services = manifest.get_manifest().len(),
            storages = manifest.get_storage_reference().len(),
            digest = %manifest_digest,
            "submitting manifest"
        );
        self.platform.submit_manifest(&manifest).await?;
        on_log("manifest accepted");

        Ok(DeployReport {
            published: progress.published,
            uploaded: progress.uploaded,
            skipped_uploads: progress.skipped_uploads,
            manifest_digest,
            started_at,
            finished_at: Utc::now(),
        })
    }

    async fn deploy_entry(
        &mut self,
        entry: &PlanEntry,
        cancel: &CancellationToken,
        progress: &mut Progress,
        on_log: &mut (dyn FnMut(&str) + Send),
    ) -> MonodeployResult<ImageDetails> {
        let name = entry.get_name();
        let id = entry
            .get_descriptor()
            .ok_or_else(|| MonodeployError::ServiceNotFound(name.clone()))?;
        let service = self
            .registry
            .service(id)
            .cloned()
            .ok_or_else(|| MonodeployError::ServiceNotFound(name.clone()))?;
        let builder = self
            .registry
            .builder_mut(id, self.config.get_image_prefix())
            .ok_or_else(|| MonodeployError::ServiceNotFound(name.clone()))?;
        let options = BuildOptions::builder()
            .image_tag(builder.get_image_tag().clone())
            .build_context(builder.get_build_context().clone())
            .build();

        let pipeline = Pipeline::new(self.engine.as_ref(), self.probe.as_ref(), &self.config);
        let states = &mut self.states;
        let bus = &self.bus;
        let mut on_stage = |stage: PipelineStage| {
            on_log(&stage_message(name, stage));
            if let Some(state) = stage.publish_state() {
                if let Err(e) = transition(states, bus, name, state) {
                    tracing::warn!(service = %name, error = %e, "ignored publish state change");
                }
            }
        };
        let image = pipeline.run(&service, &options, cancel, &mut on_stage).await?;

        let bus = &self.bus;
        let on_progress = |value: f32| {
            bus.emit(DeployEvent::ServiceProgress {
                name: name.clone(),
                progress: value,
            })
        };
        let outcome = self
            .session
            .publish(
                self.engine.as_ref(),
                &service,
                &image,
                entry.get_prior().as_ref(),
                &on_progress,
            )
            .await;

        let outcome = match outcome {
            Ok(outcome) => outcome,
            Err(e) => {
                transition(&mut self.states, &self.bus, name, PublishState::Failed)?;
                return Err(e);
            }
        };

        if outcome.is_skipped() {
            on_log(&format!("{name}: upload skipped ({outcome:?})"));
            progress.skipped_uploads.push(name.clone());
        } else {
            on_log(&format!("{name}: uploaded"));
            progress.uploaded.push(name.clone());
        }

        transition(&mut self.states, &self.bus, name, PublishState::Published)?;
        progress.published.push(name.clone());

        Ok(image)
    }
}

//--------------------------------------------------------------------------------------------------
// Functions
//--------------------------------------------------------------------------------------------------

fn transition(
    states: &mut BTreeMap<String, PublishState>,
    bus: &EventBus,
    name: &str,
    next: PublishState,
) -> MonodeployResult<()> {
    let current = states
        .get(name)
        .copied()
        .unwrap_or(PublishState::NotStarted);
    let state = current.advance(next)?;
    if state != current {
        states.insert(name.to_string(), state);
        bus.emit(DeployEvent::ServiceStateChanged {
            name: name.to_string(),
            state,
        });
    }

    Ok(())
}

fn stage_message(name: &str, stage: PipelineStage) -> String {
    match stage {
        PipelineStage::NotStarted => format!("{name}: waiting"),
        PipelineStage::Stopping => format!("{name}: stopping local instances"),
        PipelineStage::Building => format!("{name}: building image"),
        PipelineStage::Verifying => format!("{name}: verifying health"),
        PipelineStage::Ready => format!("{name}: image ready"),
        PipelineStage::Failed => format!("{name}: failed"),
    }
}
