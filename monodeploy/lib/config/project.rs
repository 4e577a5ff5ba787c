//! The `monodeploy.yaml` project file.

use std::path::PathBuf;

use getset::Getters;
use serde::{Deserialize, Serialize};
use typed_builder::TypedBuilder;

use crate::descriptor::{EndpointDescriptor, DEFAULT_STORAGE_TYPE};

use super::DeployConfig;

//--------------------------------------------------------------------------------------------------
// Types
//--------------------------------------------------------------------------------------------------

/// The contents of a project file.
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize, TypedBuilder, Getters)]
#[getset(get = "pub with_prefix")]
pub struct ProjectFile {
    /// Deployment settings.
    #[serde(default)]
    #[builder(default)]
    pub(super) settings: DeployConfig,

    /// The declared services.
    #[serde(default)]
    #[builder(default)]
    pub(super) services: Vec<ServiceDeclaration>,

    /// The declared storages.
    #[serde(default)]
    #[builder(default)]
    pub(super) storages: Vec<StorageDeclaration>,
}

/// A service declared in the project file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TypedBuilder, Getters)]
#[getset(get = "pub with_prefix")]
pub struct ServiceDeclaration {
    /// The name of the service.
    #[builder(setter(transform = |name: impl AsRef<str>| name.as_ref().to_string()))]
    pub(super) name: String,

    /// The build context of the service, relative to the project directory.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    #[builder(default, setter(strip_option, into))]
    pub(super) path: Option<PathBuf>,

    /// The storages the service depends on.
    #[serde(default)]
    #[builder(default)]
    pub(super) depends_on: Vec<String>,

    /// The endpoints the service exposes.
    #[serde(default)]
    #[builder(default)]
    pub(super) endpoints: Vec<EndpointDescriptor>,

    /// The federated identity namespaces the service implements.
    #[serde(default)]
    #[builder(default)]
    pub(super) federated_identity_namespaces: Vec<String>,

    /// Overrides the enabled flag of the service.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    #[builder(default, setter(strip_option))]
    pub(super) enabled: Option<bool>,

    /// Overrides the archived flag of the service.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    #[builder(default, setter(strip_option))]
    pub(super) archived: Option<bool>,

    /// The platform template the service is created from.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    #[builder(default, setter(strip_option, into))]
    pub(super) template_id: Option<String>,

    /// A comment attached to the service entry.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    #[builder(default, setter(strip_option, into))]
    pub(super) comment: Option<String>,
}

/// A storage declared in the project file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TypedBuilder, Getters)]
#[getset(get = "pub with_prefix")]
pub struct StorageDeclaration {
    /// The name of the storage.
    #[builder(setter(transform = |name: impl AsRef<str>| name.as_ref().to_string()))]
    pub(super) name: String,

    /// The storage engine kind.
    #[serde(rename = "type", default = "StorageDeclaration::default_storage_type")]
    #[builder(default = DEFAULT_STORAGE_TYPE.to_string(), setter(into))]
    pub(super) storage_type: String,

    /// Overrides the enabled flag of the storage.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    #[builder(default, setter(strip_option))]
    pub(super) enabled: Option<bool>,

    /// Overrides the archived flag of the storage.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    #[builder(default, setter(strip_option))]
    pub(super) archived: Option<bool>,

    /// The platform template the storage is created from.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    #[builder(default, setter(strip_option, into))]
    pub(super) template_id: Option<String>,
}

//--------------------------------------------------------------------------------------------------
// Methods
//--------------------------------------------------------------------------------------------------

impl ProjectFile {
    /// Returns the declaration of the given service.
    pub fn find_service(&self, name: &str) -> Option<&ServiceDeclaration> {
        self.services.iter().find(|s| s.name == name)
    }

    /// Returns the declaration of the given storage.
    pub fn find_storage(&self, name: &str) -> Option<&StorageDeclaration> {
        self.storages.iter().find(|s| s.name == name)
    }
}

impl StorageDeclaration {
    fn default_storage_type() -> String {
        DEFAULT_STORAGE_TYPE.to_string()
    }
}

//--------------------------------------------------------------------------------------------------
// Tests
//--------------------------------------------------------------------------------------------------
