use getset::Getters;
use serde::{Deserialize, Serialize};
use typed_builder::TypedBuilder;

use super::HintSeverity;

//--------------------------------------------------------------------------------------------------
// Constants
//--------------------------------------------------------------------------------------------------

/// The storage engine kind assumed when a declaration names none.
pub const DEFAULT_STORAGE_TYPE: &str = "mongov1";

//--------------------------------------------------------------------------------------------------
// Types
//--------------------------------------------------------------------------------------------------

/// Static metadata of a declared storage unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TypedBuilder, Getters)]
#[getset(get = "pub with_prefix")]
pub struct StorageDescriptor {
    /// The unique name of the storage.
    #[builder(setter(into))]
    pub(super) name: String,

    /// The storage engine kind.
    #[serde(rename = "type", default = "StorageDescriptor::default_storage_type")]
    #[builder(default = DEFAULT_STORAGE_TYPE.to_string(), setter(into))]
    pub(super) storage_type: String,

    /// Whether an error-level validation hint is attached to this descriptor.
    #[serde(default)]
    #[builder(default)]
    pub(super) has_validation_error: bool,
}

//--------------------------------------------------------------------------------------------------
// Methods
//--------------------------------------------------------------------------------------------------

impl StorageDescriptor {
    fn default_storage_type() -> String {
        DEFAULT_STORAGE_TYPE.to_string()
    }

    pub(crate) fn flag(&mut self, severity: HintSeverity) {
        if severity == HintSeverity::Error {
            self.has_validation_error = true;
        }
    }
}
