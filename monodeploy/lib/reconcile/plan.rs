use std::collections::BTreeMap;

use getset::Getters;

use crate::{
    descriptor::{DescriptorId, DEFAULT_STORAGE_TYPE},
    manifest::{
        DependencyReference, ImageDetails, ServiceEntry, ServiceReference, StorageEntry,
        StorageReference, WireManifest,
    },
};

//--------------------------------------------------------------------------------------------------
// Types
//--------------------------------------------------------------------------------------------------

/// The reconciled, ordered target state of one deployment attempt.
///
/// Buildable entries come first, in discovery order, followed by the pass-through entries sorted
/// by name. Every service and storage name appears once.
#[derive(Debug, Clone, PartialEq, Getters)]
#[getset(get = "pub with_prefix")]
pub struct DeploymentPlan {
    /// The service entries, in pipeline order.
    pub(super) entries: Vec<PlanEntry>,

    /// The storages, sorted by name.
    pub(super) storages: Vec<PlannedStorage>,

    /// A comment describing the deployment.
    pub(super) comment: Option<String>,
}

/// A service in a [`DeploymentPlan`].
#[derive(Debug, Clone, PartialEq, Getters)]
#[getset(get = "pub with_prefix")]
pub struct PlanEntry {
    /// The name of the service.
    pub(super) name: String,

    /// The descriptor of the service, if it was discovered locally.
    pub(super) descriptor: Option<DescriptorId>,

    /// The effective desired state.
    pub(super) entry: ServiceEntry,

    /// What the platform last reported for this service.
    pub(super) prior: Option<ServiceReference>,

    /// What the orchestrator does with the entry.
    pub(super) action: PlanAction,
}

/// A storage in a [`DeploymentPlan`].
#[derive(Debug, Clone, PartialEq, Getters)]
#[getset(get = "pub with_prefix")]
pub struct PlannedStorage {
    /// The name of the storage.
    pub(super) name: String,

    /// The effective desired state, with the final enabled flag.
    pub(super) entry: StorageEntry,
}

/// What the orchestrator does with a plan entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlanAction {
    /// Run the build, verify and publish stages.
    Build,

    /// Mark as published without running any stage.
    PassThrough,
}

//--------------------------------------------------------------------------------------------------
// Methods
//--------------------------------------------------------------------------------------------------

impl DeploymentPlan {
    /// Returns the entries that go through the pipeline.
    pub fn buildable(&self) -> impl Iterator<Item = &PlanEntry> {
        self.entries.iter().filter(|e| e.action == PlanAction::Build)
    }

    /// Returns the entries that are published without running any stage.
    pub fn pass_through(&self) -> impl Iterator<Item = &PlanEntry> {
        self.entries
            .iter()
            .filter(|e| e.action == PlanAction::PassThrough)
    }

    /// Returns the entry of a service.
    pub fn entry(&self, name: &str) -> Option<&PlanEntry> {
        self.entries.iter().find(|e| e.name == name)
    }

    /// Returns a planned storage.
    pub fn storage(&self, name: &str) -> Option<&PlannedStorage> {
        self.storages.iter().find(|s| s.name == name)
    }

    /// Returns the number of services and storages in the plan.
    pub fn len(&self) -> usize {
        self.entries.len() + self.storages.len()
    }

    /// Returns `true` if the plan holds nothing.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Assembles the manifest submitted to the platform.
    ///
    /// Services built during this attempt carry the identity of the new image; every other service
    /// keeps the image the platform last reported.
    pub fn to_wire_manifest(&self, images: &BTreeMap<String, ImageDetails>) -> WireManifest {
        let manifest = self
            .entries
            .iter()
            .map(|entry| {
                let (image_id, image_cpu_arch) = match images.get(&entry.name) {
                    Some(image) => (
                        Some(image.get_image_id().clone()),
                        Some(image.get_cpu_arch().clone()),
                    ),
                    None => (
                        entry.prior.as_ref().and_then(|p| p.image_id.clone()),
                        entry.prior.as_ref().and_then(|p| p.image_cpu_arch.clone()),
                    ),
                };

                ServiceReference {
                    service_name: entry.name.clone(),
                    enabled: entry.entry.enabled,
                    archived: entry.entry.archived,
                    template_id: entry.entry.template_id.clone(),
                    image_id,
                    image_cpu_arch,
                    comments: entry.entry.comment.clone(),
                    dependencies: entry
                        .entry
                        .dependencies
                        .iter()
                        .map(|id| DependencyReference {
                            id: id.clone(),
                            storage_type: self
                                .storage(id)
                                .map(|s| s.entry.storage_type.clone())
                                .unwrap_or_else(|| DEFAULT_STORAGE_TYPE.to_string()),
                        })
                        .collect(),
                }
            })
            .collect();

        let storage_reference = self
            .storages
            .iter()
            .map(|storage| StorageReference {
                id: storage.name.clone(),
                storage_type: storage.entry.storage_type.clone(),
                enabled: storage.entry.enabled,
                archived: storage.entry.archived,
                template_id: storage.entry.template_id.clone(),
            })
            .collect();

        WireManifest {
            manifest,
            storage_reference,
            comments: self.comment.clone(),
        }
    }
}

impl PlanEntry {
    /// Returns `true` if the entry goes through the pipeline.
    pub fn is_buildable(&self) -> bool {
        self.action == PlanAction::Build
    }
}
