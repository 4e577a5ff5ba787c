use std::collections::{BTreeMap, BTreeSet};

use crate::{
    descriptor::DescriptorRegistry,
    manifest::{ManifestModel, RemoteManifest, ServiceEntry, StorageEntry},
    MonodeployError, MonodeployResult,
};

use super::{
    check_dependencies, check_descriptor, DeploymentPlan, PlanAction, PlanEntry, PlannedStorage,
};

//--------------------------------------------------------------------------------------------------
// Types
//--------------------------------------------------------------------------------------------------

/// Merges local intent, discovered descriptors and the remote manifest into a [`DeploymentPlan`].
#[derive(Debug, Default, Clone, Copy)]
pub struct Reconciler;

//--------------------------------------------------------------------------------------------------
// Methods
//--------------------------------------------------------------------------------------------------

impl Reconciler {
    /// Reconciles `local` with `remote` and the descriptors in `registry`.
    ///
    /// ## Errors
    ///
    /// Returns [`MonodeployError::Precondition`] with every violation found if an active service
    /// depends on a missing or archived storage, or if a service that would be built carries
    /// validation errors.
    pub fn reconcile(
        local: &ManifestModel,
        remote: &RemoteManifest,
        registry: &DescriptorRegistry,
    ) -> MonodeployResult<DeploymentPlan> {
        let services = Self::effective_services(local, remote, registry);
        let storages = Self::effective_storages(local, remote, registry);

        let mut violations = Vec::new();
        for (name, entry) in &services {
            violations.extend(check_dependencies(name, entry, &storages));
        }

        // Services first, so storages see the final set of active services.
        let mut buildable = Vec::new();
        let mut pass_through = Vec::new();
        for (name, entry) in services {
            let descriptor = registry.service_id(&name);
            let action = match descriptor.and_then(|id| registry.service(id)) {
                Some(service) if entry.enabled && !entry.archived => {
                    violations.extend(check_descriptor(service));
                    PlanAction::Build
                }
                _ => PlanAction::PassThrough,
            };

            let plan_entry = PlanEntry {
                prior: remote.find_service(&name).cloned(),
                name,
                descriptor,
                entry,
                action,
            };

            match action {
                PlanAction::Build => buildable.push(plan_entry),
                PlanAction::PassThrough => pass_through.push(plan_entry),
            }
        }

        if !violations.is_empty() {
            tracing::error!(violations = violations.len(), "deployment preconditions not met");
            return Err(MonodeployError::Precondition(violations));
        }

        buildable.sort_by_key(|e| e.descriptor);
        let entries: Vec<_> = buildable.into_iter().chain(pass_through).collect();

        let storages = storages
            .into_iter()
            .map(|(name, mut entry)| {
                let used = entries.iter().any(|e| {
                    e.entry.enabled && !e.entry.archived && e.entry.dependencies.contains(&name)
                });
                entry.enabled = entry.enabled && used;
                PlannedStorage { name, entry }
            })
            .collect::<Vec<_>>();

        tracing::info!(
            services = entries.len(),
            buildable = entries.iter().filter(|e| e.is_buildable()).count(),
            storages = storages.len(),
            "reconciled deployment plan"
        );

        Ok(DeploymentPlan {
            entries,
            storages,
            comment: local.comment.clone(),
        })
    }

    fn effective_services(
        local: &ManifestModel,
        remote: &RemoteManifest,
        registry: &DescriptorRegistry,
    ) -> BTreeMap<String, ServiceEntry> {
        let names: BTreeSet<&str> = remote
            .services
            .iter()
            .map(|s| s.get_service_name().as_str())
            .chain(registry.all_services().iter().map(|s| s.get_name().as_str()))
            .chain(local.services.keys().map(String::as_str))
            .collect();

        names
            .into_iter()
            .map(|name| {
                let prior = remote.find_service(name);
                let entry = match (local.services.get(name), registry.get_service_by_name(name)) {
                    (Some(local), _) => local.clone(),
                    (None, Some(service)) => ServiceEntry {
                        enabled: true,
                        archived: prior.is_some_and(|p| *p.get_archived()),
                        template_id: prior.and_then(|p| p.get_template_id().clone()),
                        dependencies: service.get_dependencies().clone(),
                        comment: None,
                    },
                    // Known only to the platform: carried over, enabled.
                    (None, None) => ServiceEntry {
                        enabled: true,
                        archived: prior.is_some_and(|p| *p.get_archived()),
                        template_id: prior.and_then(|p| p.get_template_id().clone()),
                        dependencies: prior
                            .map(|p| p.get_dependencies().iter().map(|d| d.id.clone()).collect())
                            .unwrap_or_default(),
                        comment: prior.and_then(|p| p.get_comments().clone()),
                    },
                };
                (name.to_string(), entry)
            })
            .collect()
    }

    fn effective_storages(
        local: &ManifestModel,
        remote: &RemoteManifest,
        registry: &DescriptorRegistry,
    ) -> BTreeMap<String, StorageEntry> {
        let names: BTreeSet<&str> = remote
            .storages
            .iter()
            .map(|s| s.get_id().as_str())
            .chain(registry.all_storages().iter().map(|s| s.get_name().as_str()))
            .chain(local.storages.keys().map(String::as_str))
            .collect();

        names
            .into_iter()
            .filter_map(|name| {
                let prior = remote.find_storage(name);
                let entry = match (local.storages.get(name), registry.get_storage_by_name(name)) {
                    (Some(local), _) => local.clone(),
                    (None, Some(storage)) => StorageEntry {
                        enabled: true,
                        archived: prior.is_some_and(|p| *p.get_archived()),
                        storage_type: storage.get_storage_type().clone(),
                        template_id: prior.and_then(|p| p.get_template_id().clone()),
                    },
                    (None, None) => {
                        let prior = prior?;
                        StorageEntry {
                            enabled: true,
                            archived: *prior.get_archived(),
                            storage_type: prior.get_storage_type().clone(),
                            template_id: prior.get_template_id().clone(),
                        }
                    }
                };
                Some((name.to_string(), entry))
            })
            .collect()
    }
}
