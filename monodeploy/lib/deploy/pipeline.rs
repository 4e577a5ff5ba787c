use tokio::time;
use tokio_util::sync::CancellationToken;

use crate::{
    config::DeployConfig,
    descriptor::ServiceDescriptor,
    manifest::ImageDetails,
    platform::{BuildOptions, ContainerEngine, HealthProbe, HealthStatus},
    MonodeployError, MonodeployResult,
};

use super::PipelineStage;

//--------------------------------------------------------------------------------------------------
// Types
//--------------------------------------------------------------------------------------------------

/// Runs the stop, build and verify stages for a single service.
///
/// Every stage change is reported through the `on_stage` callback given to [`Pipeline::run`]. On
/// error the pipeline reports [`PipelineStage::Failed`] before returning.
pub struct Pipeline<'a> {
    engine: &'a dyn ContainerEngine,
    probe: &'a dyn HealthProbe,
    config: &'a DeployConfig,
}

//--------------------------------------------------------------------------------------------------
// Methods
//--------------------------------------------------------------------------------------------------

impl<'a> Pipeline<'a> {
    /// Creates a pipeline over the given collaborators.
    pub fn new(
        engine: &'a dyn ContainerEngine,
        probe: &'a dyn HealthProbe,
        config: &'a DeployConfig,
    ) -> Self {
        Self {
            engine,
            probe,
            config,
        }
    }

    /// Runs the pipeline and returns the built image once it is ready for upload.
    pub async fn run(
        &self,
        service: &ServiceDescriptor,
        options: &BuildOptions,
        cancel: &CancellationToken,
        on_stage: &mut (dyn FnMut(PipelineStage) + Send),
    ) -> MonodeployResult<ImageDetails> {
        match self.stages(service, options, cancel, on_stage).await {
            Ok(image) => {
                on_stage(PipelineStage::Ready);
                Ok(image)
            }
            Err(e) => {
                tracing::error!(service = %service.get_name(), error = %e, "pipeline failed");
                on_stage(PipelineStage::Failed);
                Err(e)
            }
        }
    }

    async fn stages(
        &self,
        service: &ServiceDescriptor,
        options: &BuildOptions,
        cancel: &CancellationToken,
        on_stage: &mut (dyn FnMut(PipelineStage) + Send),
    ) -> MonodeployResult<ImageDetails> {
        on_stage(PipelineStage::Stopping);
        self.stop_stale(service).await;

        if cancel.is_cancelled() {
            return Err(MonodeployError::Cancelled);
        }

        on_stage(PipelineStage::Building);
        let image = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(MonodeployError::Cancelled),
            image = self.engine.build_image(service, self.config.get_architectures(), options) => image?,
        };
        image.supported_arch(service.get_name())?;

        tracing::info!(
            service = %service.get_name(),
            image_id = %image.get_image_id(),
            platform = %image.get_platform(),
            "image built"
        );

        if *self.config.get_verify_health() {
            on_stage(PipelineStage::Verifying);
            self.verify(service, cancel).await?;
        }

        Ok(image)
    }

    /// Stops whatever is left of a previous run. Failures are logged and ignored.
    async fn stop_stale(&self, service: &ServiceDescriptor) {
        if let Err(e) = self.engine.stop_instance(service).await {
            tracing::warn!(service = %service.get_name(), error = %e, "failed to stop stale instance");
        }

        if let Err(e) = self.engine.stop_client_generator(service).await {
            tracing::warn!(service = %service.get_name(), error = %e, "failed to stop client generator");
        }
    }

    /// Boots the image locally and waits for it to report healthy.
    ///
    /// The local instance is stopped exactly once afterwards, whatever the outcome.
    async fn verify(
        &self,
        service: &ServiceDescriptor,
        cancel: &CancellationToken,
    ) -> MonodeployResult<()> {
        let result = self.boot_and_wait(service, cancel).await;

        if let Err(e) = self.engine.stop_instance(service).await {
            tracing::warn!(service = %service.get_name(), error = %e, "failed to stop verified instance");
        }

        result
    }

    async fn boot_and_wait(
        &self,
        service: &ServiceDescriptor,
        cancel: &CancellationToken,
    ) -> MonodeployResult<()> {
        let connections = self.engine.connection_strings(service).await?;
        self.engine.run_instance_locally(service, &connections).await?;
        self.wait_healthy(service, cancel).await
    }

    async fn wait_healthy(
        &self,
        service: &ServiceDescriptor,
        cancel: &CancellationToken,
    ) -> MonodeployResult<()> {
        let timeout = *self.config.get_health_check_timeout();
        let interval = *self.config.get_health_check_interval();
        let deadline = time::sleep(timeout);
        tokio::pin!(deadline);

        let timed_out = || MonodeployError::HealthCheckTimeout {
            service: service.get_name().clone(),
            timeout,
        };

        let mut attempt = 0u32;
        loop {
            attempt += 1;
            tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(MonodeployError::Cancelled),
                _ = &mut deadline => return Err(timed_out()),
                status = self.probe.query_health(service) => match status {
                    Ok(HealthStatus::Healthy) => {
                        tracing::info!(service = %service.get_name(), attempt, "service healthy");
                        return Ok(());
                    }
                    Ok(status) => {
                        tracing::debug!(service = %service.get_name(), attempt, ?status, "service not healthy yet");
                    }
                    Err(e) => {
                        tracing::warn!(service = %service.get_name(), attempt, error = %e, "health check failed");
                    }
                },
            }

            tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(MonodeployError::Cancelled),
                _ = &mut deadline => return Err(timed_out()),
                _ = time::sleep(interval) => {}
            }
        }
    }
}
