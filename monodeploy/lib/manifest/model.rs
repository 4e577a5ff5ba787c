use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use typed_builder::TypedBuilder;

use crate::descriptor::DescriptorRegistry;

use super::{RemoteManifest, ServiceReference};

//--------------------------------------------------------------------------------------------------
// Types
//--------------------------------------------------------------------------------------------------

/// The desired state of a project for one deployment attempt.
///
/// A model is composed fresh for every attempt from the registry and the last remote manifest and
/// is never persisted.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize, TypedBuilder)]
pub struct ManifestModel {
    /// The desired services, keyed by name.
    #[builder(default)]
    pub services: BTreeMap<String, ServiceEntry>,

    /// The desired storages, keyed by name.
    #[builder(default)]
    pub storages: BTreeMap<String, StorageEntry>,

    /// Snapshot of the services the platform last reported, keyed by name.
    #[builder(default)]
    pub server_manifest: BTreeMap<String, ServiceReference>,

    /// A comment describing the deployment.
    #[builder(default, setter(strip_option, into))]
    pub comment: Option<String>,
}

/// The desired state of a service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TypedBuilder)]
pub struct ServiceEntry {
    /// Whether the service should run.
    #[builder(default = true)]
    pub enabled: bool,

    /// Whether the service is archived.
    #[builder(default)]
    pub archived: bool,

    /// The platform template the service is created from.
    #[builder(default, setter(strip_option, into))]
    pub template_id: Option<String>,

    /// The storages the service depends on.
    #[builder(default)]
    pub dependencies: BTreeSet<String>,

    /// A comment attached to the service.
    #[builder(default, setter(strip_option, into))]
    pub comment: Option<String>,
}

/// The desired state of a storage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TypedBuilder)]
pub struct StorageEntry {
    /// Whether the storage should be provisioned.
    #[builder(default = true)]
    pub enabled: bool,

    /// Whether the storage is archived.
    #[builder(default)]
    pub archived: bool,

    /// The storage engine kind.
    #[builder(setter(into))]
    pub storage_type: String,

    /// The platform template the storage is created from.
    #[builder(default, setter(strip_option, into))]
    pub template_id: Option<String>,
}

//--------------------------------------------------------------------------------------------------
// Methods
//--------------------------------------------------------------------------------------------------

impl ManifestModel {
    /// Composes the desired state from the discovered descriptors and the remote manifest.
    ///
    /// Every discovered service and storage gets an entry. Flags come from the remote reference
    /// of the same name when there is one; otherwise the entry is enabled and not archived.
    /// Storages always start enabled, since the reconciler decides whether they stay enabled.
    /// Service dependencies always come from the descriptor.
    pub fn compose(registry: &DescriptorRegistry, remote: &RemoteManifest) -> Self {
        let services = registry
            .all_services()
            .iter()
            .map(|service| {
                let prior = remote.find_service(service.get_name());
                let entry = ServiceEntry {
                    enabled: prior.map_or(true, |p| p.enabled),
                    archived: prior.is_some_and(|p| p.archived),
                    template_id: prior.and_then(|p| p.template_id.clone()),
                    dependencies: service.get_dependencies().clone(),
                    comment: None,
                };
                (service.get_name().clone(), entry)
            })
            .collect();

        let storages = registry
            .all_storages()
            .iter()
            .map(|storage| {
                let prior = remote.find_storage(storage.get_name());
                // The remote flag is the outcome of the last reconciliation, not intent.
                let entry = StorageEntry {
                    enabled: true,
                    archived: prior.is_some_and(|p| p.archived),
                    storage_type: storage.get_storage_type().clone(),
                    template_id: prior.and_then(|p| p.template_id.clone()),
                };
                (storage.get_name().clone(), entry)
            })
            .collect();

        Self {
            services,
            storages,
            server_manifest: Self::snapshot(remote),
            comment: None,
        }
    }

    /// Returns the remote services keyed by name.
    pub fn snapshot(remote: &RemoteManifest) -> BTreeMap<String, ServiceReference> {
        remote
            .services
            .iter()
            .map(|s| (s.service_name.clone(), s.clone()))
            .collect()
    }

    /// Adds or replaces a service entry.
    pub fn with_service(mut self, name: impl Into<String>, entry: ServiceEntry) -> Self {
        self.services.insert(name.into(), entry);
        self
    }

    /// Adds or replaces a storage entry.
    pub fn with_storage(mut self, name: impl Into<String>, entry: StorageEntry) -> Self {
        self.storages.insert(name.into(), entry);
        self
    }
}

//--------------------------------------------------------------------------------------------------
// Tests
//--------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use crate::{
        descriptor::{CollectingHintSink, Discovery, ServiceDescriptor, StorageDescriptor},
        manifest::StorageReference,
    };

    use super::*;

    #[test]
    fn test_compose_prefers_remote_flags() {
        let discovery = Discovery {
            services: vec![
                ServiceDescriptor::builder()
                    .name("inventory")
                    .dependencies(BTreeSet::from(["inventory-db".to_string()]))
                    .build(),
                ServiceDescriptor::builder().name("billing").build(),
            ],
            storages: vec![StorageDescriptor::builder().name("inventory-db").build()],
            hints: vec![],
        };
        let registry = DescriptorRegistry::from_discovery(discovery, &CollectingHintSink::default());

        let remote = RemoteManifest {
            services: vec![
                ServiceReference::builder()
                    .service_name("billing")
                    .enabled(false)
                    .template_id("tpl-1")
                    .build(),
                ServiceReference::builder().service_name("legacy").build(),
            ],
            storages: vec![StorageReference::builder()
                .id("inventory-db")
                .storage_type("mongov1")
                .enabled(false)
                .archived(true)
                .build()],
        };

        let model = ManifestModel::compose(&registry, &remote);

        let inventory = &model.services["inventory"];
        assert!(inventory.enabled);
        assert!(inventory.dependencies.contains("inventory-db"));

        let billing = &model.services["billing"];
        assert!(!billing.enabled);
        assert_eq!(billing.template_id.as_deref(), Some("tpl-1"));

        assert!(!model.services.contains_key("legacy"));
        assert!(model.server_manifest.contains_key("legacy"));
        assert!(model.storages["inventory-db"].archived);
        assert!(model.storages["inventory-db"].enabled);
    }
}
