use std::path::{Component, Path};

use crate::{MonodeployError, MonodeployResult};

//--------------------------------------------------------------------------------------------------
// Constants
//--------------------------------------------------------------------------------------------------

/// The default name of the project file.
pub const MONODEPLOY_CONFIG_FILENAME: &str = "monodeploy.yaml";

//--------------------------------------------------------------------------------------------------
// Functions
//--------------------------------------------------------------------------------------------------

/// Checks that a project file name is a single plain path segment.
pub fn validate_file_name(name: &str) -> MonodeployResult<()> {
    let mut components = Path::new(name).components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(_)), None) => Ok(()),
        _ => Err(MonodeployError::custom(anyhow::anyhow!(
            "project file name must be a single path segment: {name}"
        ))),
    }
}

//--------------------------------------------------------------------------------------------------
// Tests
//--------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_file_name() {
        assert!(validate_file_name("monodeploy.yaml").is_ok());
        assert!(validate_file_name("deploy/monodeploy.yaml").is_err());
        assert!(validate_file_name("../monodeploy.yaml").is_err());
        assert!(validate_file_name("").is_err());
    }
}
