use std::{
    collections::BTreeMap,
    fmt::{self, Display},
};

use serde::{Deserialize, Serialize};

use crate::{
    descriptor::ServiceDescriptor,
    manifest::{ServiceEntry, StorageEntry},
};

//--------------------------------------------------------------------------------------------------
// Types
//--------------------------------------------------------------------------------------------------

/// A reason a plan cannot be deployed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PreconditionViolation {
    /// An active service depends on a storage that is not part of the plan.
    MissingDependency {
        /// The dependent service.
        service: String,

        /// The missing storage.
        storage: String,
    },

    /// An active service depends on an archived storage.
    ArchivedDependency {
        /// The dependent service.
        service: String,

        /// The archived storage.
        storage: String,
    },

    /// A service that would be built carries an error-level validation hint.
    InvalidDescriptor {
        /// The service.
        service: String,
    },
}

//--------------------------------------------------------------------------------------------------
// Functions
//--------------------------------------------------------------------------------------------------

/// Checks that every dependency of an active service resolves to a storage that is not archived.
///
/// Inactive services (disabled or archived) are not checked.
pub fn check_dependencies(
    service: &str,
    entry: &ServiceEntry,
    storages: &BTreeMap<String, StorageEntry>,
) -> Vec<PreconditionViolation> {
    if !entry.enabled || entry.archived {
        return Vec::new();
    }

    entry
        .dependencies
        .iter()
        .filter_map(|storage| match storages.get(storage) {
            None => Some(PreconditionViolation::MissingDependency {
                service: service.to_string(),
                storage: storage.clone(),
            }),
            Some(s) if s.archived => Some(PreconditionViolation::ArchivedDependency {
                service: service.to_string(),
                storage: storage.clone(),
            }),
            Some(_) => None,
        })
        .collect()
}

/// Checks that a service about to be built carries no error-level validation hint.
pub fn check_descriptor(descriptor: &ServiceDescriptor) -> Option<PreconditionViolation> {
    descriptor
        .get_has_validation_error()
        .then(|| PreconditionViolation::InvalidDescriptor {
            service: descriptor.get_name().clone(),
        })
}

//--------------------------------------------------------------------------------------------------
// Trait Implementations
//--------------------------------------------------------------------------------------------------

impl Display for PreconditionViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingDependency { service, storage } => write!(
                f,
                "service '{service}' depends on storage '{storage}' which is not declared"
            ),
            Self::ArchivedDependency { service, storage } => write!(
                f,
                "service '{service}' depends on archived storage '{storage}'"
            ),
            Self::InvalidDescriptor { service } => {
                write!(f, "service '{service}' has validation errors")
            }
        }
    }
}

//--------------------------------------------------------------------------------------------------
// Tests
//--------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use super::*;

    fn storages(archived: bool) -> BTreeMap<String, StorageEntry> {
        BTreeMap::from([(
            "inventory-db".to_string(),
            StorageEntry::builder()
                .storage_type("mongov1")
                .archived(archived)
                .build(),
        )])
    }

    fn entry(deps: &[&str]) -> ServiceEntry {
        ServiceEntry::builder()
            .dependencies(deps.iter().map(|d| d.to_string()).collect::<BTreeSet<_>>())
            .build()
    }

    #[test]
    fn test_check_dependencies() {
        let service = entry(&["inventory-db"]);
        assert!(check_dependencies("inventory", &service, &storages(false)).is_empty());

        assert_eq!(
            check_dependencies("inventory", &service, &storages(true)),
            vec![PreconditionViolation::ArchivedDependency {
                service: "inventory".to_string(),
                storage: "inventory-db".to_string(),
            }]
        );

        let service = entry(&["inventory-db", "cache"]);
        assert_eq!(
            check_dependencies("inventory", &service, &storages(false)),
            vec![PreconditionViolation::MissingDependency {
                service: "inventory".to_string(),
                storage: "cache".to_string(),
            }]
        );
    }

    #[test]
    fn test_archived_service_may_depend_on_archived_storage() {
        let mut service = entry(&["inventory-db"]);
        service.archived = true;
        assert!(check_dependencies("inventory", &service, &storages(true)).is_empty());

        let mut service = entry(&["inventory-db"]);
        service.enabled = false;
        assert!(check_dependencies("inventory", &service, &storages(true)).is_empty());
    }

    #[test]
    fn test_violation_display() {
        let violation = PreconditionViolation::ArchivedDependency {
            service: "inventory".to_string(),
            storage: "inventory-db".to_string(),
        };
        assert_eq!(
            violation.to_string(),
            "service 'inventory' depends on archived storage 'inventory-db'"
        );
    }
}
