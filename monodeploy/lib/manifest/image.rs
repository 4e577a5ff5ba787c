use std::str::FromStr;

use getset::Getters;
use serde::{Deserialize, Serialize};

use crate::{config::CpuArch, MonodeployError, MonodeployResult};

//--------------------------------------------------------------------------------------------------
// Types
//--------------------------------------------------------------------------------------------------

/// Identity and target of a built image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Getters)]
#[getset(get = "pub with_prefix")]
#[serde(rename_all = "camelCase")]
pub struct ImageDetails {
    /// The content identity of the image.
    image_id: String,

    /// The platform string reported by the engine, e.g. `linux/amd64`.
    platform: String,

    /// The CPU architecture part of the platform.
    cpu_arch: String,
}

//--------------------------------------------------------------------------------------------------
// Methods
//--------------------------------------------------------------------------------------------------

impl ImageDetails {
    /// Creates image details from an image id and a platform string.
    ///
    /// The architecture is the last `/`-separated segment of the platform.
    pub fn new(image_id: impl Into<String>, platform: impl Into<String>) -> Self {
        let platform = platform.into();
        let cpu_arch = platform
            .rsplit('/')
            .next()
            .unwrap_or_default()
            .to_string();

        Self {
            image_id: image_id.into(),
            platform,
            cpu_arch,
        }
    }

    /// Checks the reported architecture against the supported set.
    pub fn supported_arch(&self, service: &str) -> MonodeployResult<CpuArch> {
        CpuArch::from_str(&self.cpu_arch).map_err(|_| MonodeployError::UnsupportedArchitecture {
            service: service.to_string(),
            arch: self.cpu_arch.clone(),
        })
    }
}

//--------------------------------------------------------------------------------------------------
// Tests
//--------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_image_details_arch() {
        let image = ImageDetails::new("sha256:1", "linux/arm64");
        assert_eq!(image.get_cpu_arch(), "arm64");
        assert_eq!(image.supported_arch("inventory").unwrap(), CpuArch::Arm64);

        let image = ImageDetails::new("sha256:2", "linux/s390x");
        let err = image.supported_arch("inventory").unwrap_err();
        assert!(matches!(
            err,
            MonodeployError::UnsupportedArchitecture { ref arch, .. } if arch == "s390x"
        ));
    }
}
