use std::{collections::BTreeMap, path::PathBuf};

use getset::Getters;

use crate::MonodeployResult;

use super::{
    DescriptorKind, DescriptorSource, Discovery, HintKind, HintSeverity, HintSink,
    ServiceDescriptor, StorageDescriptor, ValidationHint,
};

//--------------------------------------------------------------------------------------------------
// Types
//--------------------------------------------------------------------------------------------------

/// A stable identifier of a service descriptor inside a [`DescriptorRegistry`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DescriptorId(usize);

/// Holds the deployable descriptors of a project.
///
/// The registry caches a discovery result after resolving name collisions. A descriptor whose name
/// collides with another descriptor of the same kind is removed from the deployable set together
/// with every other descriptor of that name.
///
/// The registry also owns the per-service [`ServiceBuilder`]s. They are created on first use and
/// addressed by [`DescriptorId`].
#[derive(Debug, Default)]
pub struct DescriptorRegistry {
    services: Vec<ServiceDescriptor>,
    storages: Vec<StorageDescriptor>,
    hints: Vec<ValidationHint>,
    builders: Vec<Option<ServiceBuilder>>,
}

/// Build settings of a service, computed once per registry.
#[derive(Debug, Clone, PartialEq, Eq, Getters)]
#[getset(get = "pub with_prefix")]
pub struct ServiceBuilder {
    /// The tag the image is built under.
    image_tag: String,

    /// The directory the image is built from.
    build_context: PathBuf,
}

//--------------------------------------------------------------------------------------------------
// Methods
//--------------------------------------------------------------------------------------------------

impl DescriptorRegistry {
    /// Runs discovery on `source` and caches the result.
    pub async fn discover(
        source: &dyn DescriptorSource,
        sink: &dyn HintSink,
    ) -> MonodeployResult<Self> {
        let discovery = source.discover().await?;
        Ok(Self::from_discovery(discovery, sink))
    }

    /// Builds a registry from a discovery result.
    ///
    /// Every hint, including the ones raised here for name collisions, is attached to its
    /// descriptor and reported to `sink`.
    pub fn from_discovery(discovery: Discovery, sink: &dyn HintSink) -> Self {
        let Discovery {
            services,
            storages,
            mut hints,
        } = discovery;

        let services = drop_collisions(services, DescriptorKind::Service, &mut hints, |s| {
            s.name.as_str()
        });
        let mut storages = drop_collisions(storages, DescriptorKind::Storage, &mut hints, |s| {
            s.name.as_str()
        });
        let mut services = services;

        for hint in &hints {
            match hint.get_subject_kind() {
                DescriptorKind::Service => services
                    .iter_mut()
                    .filter(|s| &s.name == hint.get_subject())
                    .for_each(|s| s.flag(*hint.get_severity())),
                DescriptorKind::Storage => storages
                    .iter_mut()
                    .filter(|s| &s.name == hint.get_subject())
                    .for_each(|s| s.flag(*hint.get_severity())),
            }
            sink.report(hint);
        }

        tracing::info!(
            services = services.len(),
            storages = storages.len(),
            hints = hints.len(),
            "descriptor registry ready"
        );

        let builders = vec![None; services.len()];
        Self {
            services,
            storages,
            hints,
            builders,
        }
    }

    /// Returns the service with the given name.
    pub fn get_service_by_name(&self, name: &str) -> Option<&ServiceDescriptor> {
        self.services.iter().find(|s| s.name == name)
    }

    /// Returns the storage with the given name.
    pub fn get_storage_by_name(&self, name: &str) -> Option<&StorageDescriptor> {
        self.storages.iter().find(|s| s.name == name)
    }

    /// Returns every deployable service, in discovery order.
    pub fn all_services(&self) -> &[ServiceDescriptor] {
        &self.services
    }

    /// Returns every deployable storage, in discovery order.
    pub fn all_storages(&self) -> &[StorageDescriptor] {
        &self.storages
    }

    /// Returns every hint collected during discovery.
    pub fn hints(&self) -> &[ValidationHint] {
        &self.hints
    }

    /// Returns `true` if any hint is an error.
    pub fn has_errors(&self) -> bool {
        self.hints.iter().any(ValidationHint::is_error)
    }

    /// Returns the id of the service with the given name.
    pub fn service_id(&self, name: &str) -> Option<DescriptorId> {
        self.services
            .iter()
            .position(|s| s.name == name)
            .map(DescriptorId)
    }

    /// Returns the descriptor with the given id.
    pub fn service(&self, id: DescriptorId) -> Option<&ServiceDescriptor> {
        self.services.get(id.0)
    }

    /// Returns the builder of a service, creating it on first access.
    ///
    /// Returns `None` if `id` does not belong to this registry.
    pub fn builder_mut(
        &mut self,
        id: DescriptorId,
        image_prefix: &str,
    ) -> Option<&mut ServiceBuilder> {
        let service = self.services.get(id.0)?;
        let slot = self.builders.get_mut(id.0)?;
        Some(slot.get_or_insert_with(|| ServiceBuilder::new(service, image_prefix)))
    }

    /// Returns the builder of a service if it was created.
    pub fn builder(&self, id: DescriptorId) -> Option<&ServiceBuilder> {
        self.builders.get(id.0)?.as_ref()
    }
}

impl ServiceBuilder {
    fn new(service: &ServiceDescriptor, image_prefix: &str) -> Self {
        Self {
            image_tag: image_tag(image_prefix, &service.name),
            build_context: service
                .build_context
                .clone()
                .unwrap_or_else(|| PathBuf::from(".")),
        }
    }
}

//--------------------------------------------------------------------------------------------------
// Functions
//--------------------------------------------------------------------------------------------------

/// Returns the local image tag of a service.
pub fn image_tag(image_prefix: &str, service: &str) -> String {
    format!("{image_prefix}/{service}:latest")
}

/// Returns the name of the local container a service runs in.
pub fn container_name(image_prefix: &str, service: &str) -> String {
    format!("{image_prefix}-{service}")
}

fn drop_collisions<T>(
    descriptors: Vec<T>,
    kind: DescriptorKind,
    hints: &mut Vec<ValidationHint>,
    name: impl Fn(&T) -> &str,
) -> Vec<T> {
    let mut counts = BTreeMap::<String, usize>::new();
    for descriptor in &descriptors {
        *counts.entry(name(descriptor).to_string()).or_default() += 1;
    }

    descriptors
        .into_iter()
        .filter(|descriptor| {
            let name = name(descriptor);
            let count = counts.get(name).copied().unwrap_or_default();
            if count > 1 {
                hints.push(ValidationHint::new(
                    HintKind::DuplicateName,
                    HintSeverity::Error,
                    kind,
                    name,
                    format!("name is declared {count} times; none of them will be deployed"),
                ));
                return false;
            }
            true
        })
        .collect()
}

//--------------------------------------------------------------------------------------------------
// Tests
//--------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use crate::descriptor::{CollectingHintSink, EndpointDescriptor, StaticDiscovery};

    use super::*;

    fn service(name: &str) -> ServiceDescriptor {
        ServiceDescriptor::builder()
            .name(name)
            .dependencies(BTreeSet::from([format!("{name}-db")]))
            .build()
    }

    #[tokio::test]
    async fn test_registry_drops_colliding_names() -> anyhow::Result<()> {
        let source = StaticDiscovery::new()
            .service(service("inventory"))
            .service(service("billing"))
            .service(service("inventory"))
            .storage(StorageDescriptor::builder().name("inventory-db").build());

        let sink = CollectingHintSink::default();
        let registry = DescriptorRegistry::discover(&source, &sink).await?;

        assert_eq!(registry.all_services().len(), 1);
        assert!(registry.get_service_by_name("inventory").is_none());
        assert!(registry.get_service_by_name("billing").is_some());
        assert!(registry.get_storage_by_name("inventory-db").is_some());

        let duplicates: Vec<_> = sink
            .hints()
            .into_iter()
            .filter(|h| *h.get_kind() == HintKind::DuplicateName)
            .collect();
        assert_eq!(duplicates.len(), 2);
        assert!(duplicates.iter().all(|h| h.get_subject() == "inventory"));
        assert!(registry.has_errors());

        Ok(())
    }

    #[test]
    fn test_registry_attaches_hint_flags() {
        let bad_endpoint = ServiceDescriptor::builder()
            .name("search")
            .endpoints(vec![EndpointDescriptor::builder().path("query").build()])
            .build();
        let discovery = Discovery {
            services: vec![bad_endpoint, service("billing")],
            storages: vec![],
            hints: vec![ValidationHint::new(
                HintKind::MissingDeclaration,
                HintSeverity::Error,
                DescriptorKind::Service,
                "billing",
                "service declares no build path",
            )],
        };

        let sink = CollectingHintSink::default();
        let registry = DescriptorRegistry::from_discovery(discovery, &sink);

        let billing = registry.get_service_by_name("billing").unwrap();
        assert!(*billing.get_has_validation_error());
        let search = registry.get_service_by_name("search").unwrap();
        assert!(!*search.get_has_validation_error());
        assert_eq!(sink.hints().len(), 1);
    }

    #[test]
    fn test_builder_arena_is_lazy_and_stable() {
        let discovery = Discovery {
            services: vec![service("inventory"), service("billing")],
            ..Default::default()
        };
        let mut registry = DescriptorRegistry::from_discovery(discovery, &CollectingHintSink::default());

        let id = registry.service_id("billing").unwrap();
        assert!(registry.builder(id).is_none());

        let builder = registry.builder_mut(id, "acme").unwrap();
        assert_eq!(builder.get_image_tag(), "acme/billing:latest");
        assert_eq!(builder.get_build_context(), &PathBuf::from("."));

        let builder = registry.builder(id).unwrap();
        assert_eq!(builder.get_image_tag(), "acme/billing:latest");
        assert_eq!(container_name("acme", "billing"), "acme-billing");
        assert_eq!(registry.service(id).unwrap().get_name(), "billing");
        assert!(registry.service_id("unknown").is_none());
    }
}
