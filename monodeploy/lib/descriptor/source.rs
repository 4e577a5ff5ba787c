use std::path::{Path, PathBuf};

use async_trait::async_trait;

use crate::{config::ProjectFile, MonodeployResult};

use super::{
    DescriptorKind, HintKind, HintSeverity, ServiceDescriptor, StorageDescriptor, ValidationHint,
};

//--------------------------------------------------------------------------------------------------
// Types
//--------------------------------------------------------------------------------------------------

/// The raw result of a discovery run, before the registry resolves collisions.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Discovery {
    /// The discovered services, in declaration order.
    pub services: Vec<ServiceDescriptor>,

    /// The discovered storages, in declaration order.
    pub storages: Vec<StorageDescriptor>,

    /// Problems found while discovering.
    pub hints: Vec<ValidationHint>,
}

/// Discovers the services and storages of a project.
#[async_trait]
pub trait DescriptorSource: Send + Sync {
    /// Discovers every declared service and storage.
    async fn discover(&self) -> MonodeployResult<Discovery>;
}

/// A descriptor source populated through explicit registration calls.
///
/// ## Examples
///
/// ```
/// use monodeploy::descriptor::{ServiceDescriptor, StaticDiscovery, StorageDescriptor};
///
/// let source = StaticDiscovery::new()
///     .service(ServiceDescriptor::builder().name("inventory").build())
///     .storage(StorageDescriptor::builder().name("inventory-db").build());
///
/// assert_eq!(source.len(), 2);
/// ```
#[derive(Debug, Default, Clone)]
pub struct StaticDiscovery {
    services: Vec<ServiceDescriptor>,
    storages: Vec<StorageDescriptor>,
}

/// A descriptor source backed by a project file.
#[derive(Debug, Clone)]
pub struct ProjectDiscovery {
    project_dir: PathBuf,
    project: ProjectFile,
}

//--------------------------------------------------------------------------------------------------
// Methods
//--------------------------------------------------------------------------------------------------

impl StaticDiscovery {
    /// Creates an empty source.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a service.
    pub fn service(mut self, service: ServiceDescriptor) -> Self {
        self.services.push(service);
        self
    }

    /// Registers a storage.
    pub fn storage(mut self, storage: StorageDescriptor) -> Self {
        self.storages.push(storage);
        self
    }

    /// Returns the number of registered descriptors.
    pub fn len(&self) -> usize {
        self.services.len() + self.storages.len()
    }

    /// Returns `true` if nothing was registered.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl ProjectDiscovery {
    /// Creates a source for the project in `project_dir`.
    pub fn new(project_dir: impl Into<PathBuf>, project: ProjectFile) -> Self {
        Self {
            project_dir: project_dir.into(),
            project,
        }
    }

    /// Returns the project directory.
    pub fn project_dir(&self) -> &Path {
        &self.project_dir
    }
}

//--------------------------------------------------------------------------------------------------
// Trait Implementations
//--------------------------------------------------------------------------------------------------

#[async_trait]
impl DescriptorSource for StaticDiscovery {
    async fn discover(&self) -> MonodeployResult<Discovery> {
        let hints = self.services.iter().flat_map(endpoint_hints).collect();
        Ok(Discovery {
            services: self.services.clone(),
            storages: self.storages.clone(),
            hints,
        })
    }
}

#[async_trait]
impl DescriptorSource for ProjectDiscovery {
    async fn discover(&self) -> MonodeployResult<Discovery> {
        let mut discovery = Discovery::default();

        for declaration in self.project.get_services() {
            let service = ServiceDescriptor {
                name: declaration.get_name().clone(),
                dependencies: declaration.get_depends_on().iter().cloned().collect(),
                endpoints: declaration.get_endpoints().clone(),
                federated_identity_namespaces: declaration
                    .get_federated_identity_namespaces()
                    .clone(),
                build_context: declaration
                    .get_path()
                    .as_ref()
                    .map(|path| self.project_dir.join(path)),
                has_validation_error: false,
                has_validation_warning: false,
            };

            if service.build_context.is_none() {
                discovery.hints.push(ValidationHint::new(
                    HintKind::MissingDeclaration,
                    HintSeverity::Error,
                    DescriptorKind::Service,
                    &service.name,
                    "service declares no build path",
                ));
            }

            discovery.hints.extend(endpoint_hints(&service));
            discovery.services.push(service);
        }

        for declaration in self.project.get_storages() {
            discovery.storages.push(StorageDescriptor {
                name: declaration.get_name().clone(),
                storage_type: declaration.get_storage_type().clone(),
                has_validation_error: false,
            });
        }

        tracing::debug!(
            services = discovery.services.len(),
            storages = discovery.storages.len(),
            hints = discovery.hints.len(),
            "discovered project descriptors"
        );

        Ok(discovery)
    }
}

//--------------------------------------------------------------------------------------------------
// Functions
//--------------------------------------------------------------------------------------------------

fn endpoint_hints(service: &ServiceDescriptor) -> Vec<ValidationHint> {
    service
        .endpoints
        .iter()
        .filter_map(|endpoint| endpoint.unsupported_reason())
        .map(|reason| {
            ValidationHint::new(
                HintKind::UnsupportedEndpointSignature,
                HintSeverity::Warning,
                DescriptorKind::Service,
                &service.name,
                reason,
            )
        })
        .collect()
}

//--------------------------------------------------------------------------------------------------
// Tests
//--------------------------------------------------------------------------------------------------
