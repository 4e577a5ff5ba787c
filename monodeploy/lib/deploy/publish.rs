use std::collections::BTreeSet;

use crate::{
    descriptor::ServiceDescriptor,
    manifest::{ImageDetails, ServiceReference},
    platform::ContainerEngine,
    MonodeployResult,
};

//--------------------------------------------------------------------------------------------------
// Types
//--------------------------------------------------------------------------------------------------

/// What the publish stage did with an image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublishOutcome {
    /// The platform already runs this exact image.
    AlreadyDeployed,

    /// The image was uploaded for this service earlier in this session.
    AlreadyUploaded,

    /// The image was uploaded.
    Uploaded,
}

/// The images uploaded by an orchestrator, across deployment attempts.
///
/// Uploads are keyed by service and image id, since every service is pushed under its own tag.
#[derive(Debug, Default, Clone)]
pub struct UploadSession {
    uploaded: BTreeSet<(String, String)>,
}

//--------------------------------------------------------------------------------------------------
// Methods
//--------------------------------------------------------------------------------------------------

impl PublishOutcome {
    /// Returns `true` if no upload happened.
    pub fn is_skipped(self) -> bool {
        self != Self::Uploaded
    }
}

impl UploadSession {
    /// Uploads `image` unless the platform already runs it for `service` or this session already
    /// uploaded it for `service`.
    ///
    /// The image is skipped only when its id matches exactly.
    pub async fn publish(
        &mut self,
        engine: &dyn ContainerEngine,
        service: &ServiceDescriptor,
        image: &ImageDetails,
        prior: Option<&ServiceReference>,
        on_progress: &(dyn Fn(f32) + Send + Sync),
    ) -> MonodeployResult<PublishOutcome> {
        let image_id = image.get_image_id();
        let key = (service.get_name().clone(), image_id.clone());

        if prior.and_then(|p| p.get_image_id().as_ref()) == Some(image_id) {
            tracing::info!(service = %service.get_name(), %image_id, "image already deployed, skipping upload");
            return Ok(PublishOutcome::AlreadyDeployed);
        }

        if self.uploaded.contains(&key) {
            tracing::info!(service = %service.get_name(), %image_id, "image already uploaded, skipping upload");
            return Ok(PublishOutcome::AlreadyUploaded);
        }

        tracing::info!(service = %service.get_name(), %image_id, "uploading image");
        engine.upload_image(service, image_id, on_progress).await?;
        self.uploaded.insert(key);

        Ok(PublishOutcome::Uploaded)
    }

    /// Returns `true` if the image was uploaded for `service` in this session.
    pub fn contains(&self, service: &str, image_id: &str) -> bool {
        self.uploaded
            .iter()
            .any(|(name, id)| name == service && id == image_id)
    }

    /// Returns the number of images uploaded in this session.
    pub fn len(&self) -> usize {
        self.uploaded.len()
    }

    /// Returns `true` if nothing was uploaded in this session.
    pub fn is_empty(&self) -> bool {
        self.uploaded.is_empty()
    }
}
