use std::{collections::BTreeSet, path::PathBuf};

use getset::Getters;
use serde::{Deserialize, Serialize};
use typed_builder::TypedBuilder;

use super::HintSeverity;

//--------------------------------------------------------------------------------------------------
// Constants
//--------------------------------------------------------------------------------------------------

/// Parameter types an endpoint may declare.
pub const SUPPORTED_PARAMETER_TYPES: &[&str] = &[
    "string", "bool", "int", "long", "float", "double", "json", "bytes",
];

//--------------------------------------------------------------------------------------------------
// Types
//--------------------------------------------------------------------------------------------------

/// Static metadata of a declared backend service.
///
/// There is exactly one descriptor per declared service. Apart from the validation flags, which
/// the registry sets while it ingests hints, a descriptor does not change after discovery.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TypedBuilder, Getters)]
#[getset(get = "pub with_prefix")]
pub struct ServiceDescriptor {
    /// The unique name of the service.
    #[builder(setter(into))]
    pub(super) name: String,

    /// The names of the storages the service depends on.
    #[serde(default)]
    #[builder(default, setter(into))]
    pub(super) dependencies: BTreeSet<String>,

    /// The callable methods the service exposes.
    #[serde(default)]
    #[builder(default)]
    pub(super) endpoints: Vec<EndpointDescriptor>,

    /// The federated identity namespaces the service implements.
    #[serde(default)]
    #[builder(default)]
    pub(super) federated_identity_namespaces: Vec<String>,

    /// The directory the service image is built from.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    #[builder(default, setter(strip_option, into))]
    pub(super) build_context: Option<PathBuf>,

    /// Whether an error-level validation hint is attached to this descriptor.
    #[serde(default)]
    #[builder(default)]
    pub(super) has_validation_error: bool,

    /// Whether a warning-level validation hint is attached to this descriptor.
    #[serde(default)]
    #[builder(default)]
    pub(super) has_validation_warning: bool,
}

/// A callable method of a service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TypedBuilder, Getters)]
#[getset(get = "pub with_prefix")]
pub struct EndpointDescriptor {
    /// The route of the method, e.g. `/items/get`.
    #[builder(setter(into))]
    pub(super) path: String,

    /// The scopes a caller needs to invoke the method.
    #[serde(default)]
    #[builder(default)]
    pub(super) required_scopes: Vec<String>,

    /// The parameters the method takes.
    #[serde(default)]
    #[builder(default)]
    pub(super) parameters: Vec<ParameterDescriptor>,
}

/// A parameter of an endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TypedBuilder, Getters)]
#[getset(get = "pub with_prefix")]
pub struct ParameterDescriptor {
    /// The name of the parameter.
    #[builder(setter(into))]
    pub(super) name: String,

    /// The declared type of the parameter.
    #[serde(rename = "type")]
    #[builder(setter(into))]
    pub(super) type_name: String,
}

//--------------------------------------------------------------------------------------------------
// Methods
//--------------------------------------------------------------------------------------------------

impl ServiceDescriptor {
    /// Returns `true` if the service depends on the given storage.
    pub fn depends_on(&self, storage: &str) -> bool {
        self.dependencies.contains(storage)
    }

    pub(crate) fn flag(&mut self, severity: HintSeverity) {
        match severity {
            HintSeverity::Error => self.has_validation_error = true,
            HintSeverity::Warning => self.has_validation_warning = true,
        }
    }
}

impl EndpointDescriptor {
    /// Returns a description of why the endpoint signature cannot be exposed, if it cannot.
    pub fn unsupported_reason(&self) -> Option<String> {
        if !self.path.starts_with('/') {
            return Some(format!("endpoint path '{}' must start with '/'", self.path));
        }

        self.parameters
            .iter()
            .find(|p| !SUPPORTED_PARAMETER_TYPES.contains(&p.type_name.as_str()))
            .map(|p| {
                format!(
                    "parameter '{}' of endpoint '{}' has unsupported type '{}'",
                    p.name, self.path, p.type_name
                )
            })
    }
}

//--------------------------------------------------------------------------------------------------
// Tests
//--------------------------------------------------------------------------------------------------
