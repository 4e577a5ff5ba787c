use getset::Getters;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use typed_builder::TypedBuilder;

use crate::MonodeployResult;

//--------------------------------------------------------------------------------------------------
// Types
//--------------------------------------------------------------------------------------------------

/// The platform's view of a service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TypedBuilder, Getters)]
#[getset(get = "pub with_prefix")]
#[serde(rename_all = "camelCase")]
pub struct ServiceReference {
    /// The name of the service.
    #[builder(setter(into))]
    pub(crate) service_name: String,

    /// Whether the service runs.
    #[serde(default = "default_true")]
    #[builder(default = true)]
    pub(crate) enabled: bool,

    /// Whether the service is archived.
    #[serde(default)]
    #[builder(default)]
    pub(crate) archived: bool,

    /// The platform template the service is created from.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    #[builder(default, setter(strip_option, into))]
    pub(crate) template_id: Option<String>,

    /// The content identity of the deployed image.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    #[builder(default, setter(strip_option, into))]
    pub(crate) image_id: Option<String>,

    /// The CPU architecture of the deployed image.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    #[builder(default, setter(strip_option, into))]
    pub(crate) image_cpu_arch: Option<String>,

    /// A comment attached to the service.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    #[builder(default, setter(strip_option, into))]
    pub(crate) comments: Option<String>,

    /// The storages the service depends on.
    #[serde(default)]
    #[builder(default)]
    pub(crate) dependencies: Vec<DependencyReference>,
}

/// A dependency of a service on a storage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DependencyReference {
    /// The name of the storage.
    pub id: String,

    /// The storage engine kind.
    #[serde(rename = "type")]
    pub storage_type: String,
}

/// The platform's view of a storage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TypedBuilder, Getters)]
#[getset(get = "pub with_prefix")]
#[serde(rename_all = "camelCase")]
pub struct StorageReference {
    /// The name of the storage.
    #[builder(setter(into))]
    pub(crate) id: String,

    /// The storage engine kind.
    #[serde(rename = "type")]
    #[builder(setter(into))]
    pub(crate) storage_type: String,

    /// Whether the storage is provisioned.
    #[serde(default = "default_true")]
    #[builder(default = true)]
    pub(crate) enabled: bool,

    /// Whether the storage is archived.
    #[serde(default)]
    #[builder(default)]
    pub(crate) archived: bool,

    /// The platform template the storage is created from.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    #[builder(default, setter(strip_option, into))]
    pub(crate) template_id: Option<String>,
}

/// The last manifest the platform accepted.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteManifest {
    /// The deployed services.
    #[serde(default)]
    pub services: Vec<ServiceReference>,

    /// The provisioned storages.
    #[serde(default)]
    pub storages: Vec<StorageReference>,
}

/// The target state submitted to the platform at the end of a deployment.
///
/// Holds at most one reference per service name and per storage name.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize, Getters)]
#[getset(get = "pub with_prefix")]
#[serde(rename_all = "camelCase")]
pub struct WireManifest {
    /// The services.
    pub(crate) manifest: Vec<ServiceReference>,

    /// The storages.
    pub(crate) storage_reference: Vec<StorageReference>,

    /// A comment describing the deployment.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub(crate) comments: Option<String>,
}

//--------------------------------------------------------------------------------------------------
// Methods
//--------------------------------------------------------------------------------------------------

impl ServiceReference {
    /// Returns `true` if the service depends on the given storage.
    pub fn depends_on(&self, storage: &str) -> bool {
        self.dependencies.iter().any(|d| d.id == storage)
    }
}

impl RemoteManifest {
    /// Returns the remote reference of a service.
    pub fn find_service(&self, name: &str) -> Option<&ServiceReference> {
        self.services.iter().find(|s| s.service_name == name)
    }

    /// Returns the remote reference of a storage.
    pub fn find_storage(&self, name: &str) -> Option<&StorageReference> {
        self.storages.iter().find(|s| s.id == name)
    }
}

impl WireManifest {
    /// Returns the reference of a service.
    pub fn find_service(&self, name: &str) -> Option<&ServiceReference> {
        self.manifest.iter().find(|s| s.service_name == name)
    }

    /// Returns the reference of a storage.
    pub fn find_storage(&self, name: &str) -> Option<&StorageReference> {
        self.storage_reference.iter().find(|s| s.id == name)
    }

    /// Returns the hex encoded SHA-256 of the JSON form of the manifest.
    pub fn digest(&self) -> MonodeployResult<String> {
        let bytes = serde_json::to_vec(self)?;
        Ok(hex::encode(Sha256::digest(&bytes)))
    }

    /// Converts the manifest into the remote form the platform reports back.
    pub fn into_remote(self) -> RemoteManifest {
        RemoteManifest {
            services: self.manifest,
            storages: self.storage_reference,
        }
    }
}

//--------------------------------------------------------------------------------------------------
// Functions
//--------------------------------------------------------------------------------------------------

fn default_true() -> bool {
    true
}

//--------------------------------------------------------------------------------------------------
// Tests
//--------------------------------------------------------------------------------------------------
