use chrono::{DateTime, Utc};
use getset::Getters;
use serde::{Deserialize, Serialize};

//--------------------------------------------------------------------------------------------------
// Types
//--------------------------------------------------------------------------------------------------

/// The summary of a successful deployment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Getters)]
#[getset(get = "pub with_prefix")]
pub struct DeployReport {
    /// The services and storages that reached `Published`, in publish order.
    pub(super) published: Vec<String>,

    /// The services whose image was uploaded.
    pub(super) uploaded: Vec<String>,

    /// The services built in this attempt whose upload was skipped.
    pub(super) skipped_uploads: Vec<String>,

    /// The digest of the submitted manifest.
    pub(super) manifest_digest: String,

    /// When the deployment started.
    pub(super) started_at: DateTime<Utc>,

    /// When the manifest was accepted.
    pub(super) finished_at: DateTime<Utc>,
}
