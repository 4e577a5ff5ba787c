use std::{fmt, str::FromStr};

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::MonodeployError;

//--------------------------------------------------------------------------------------------------
// Types
//--------------------------------------------------------------------------------------------------

/// A CPU architecture a service image can be built for.
///
/// The variants of this enum are the complete set of architectures the platform accepts. An image
/// reporting anything else is rejected after the build.
///
/// ## Examples
///
/// ```
/// use monodeploy::config::CpuArch;
///
/// assert_eq!("x86_64".parse::<CpuArch>().unwrap(), CpuArch::Amd64);
/// assert_eq!("linux/arm64".parse::<CpuArch>().unwrap(), CpuArch::Arm64);
/// assert_eq!(CpuArch::Amd64.platform(), "linux/amd64");
/// assert!("riscv64".parse::<CpuArch>().is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum CpuArch {
    /// 64-bit x86.
    Amd64,

    /// 64-bit ARM.
    Arm64,
}

//--------------------------------------------------------------------------------------------------
// Methods
//--------------------------------------------------------------------------------------------------

impl CpuArch {
    /// All supported architectures.
    pub const ALL: [CpuArch; 2] = [CpuArch::Amd64, CpuArch::Arm64];

    /// Returns the canonical architecture name.
    pub fn as_str(&self) -> &'static str {
        match self {
            CpuArch::Amd64 => "amd64",
            CpuArch::Arm64 => "arm64",
        }
    }

    /// Returns the container platform string for this architecture, e.g. `linux/amd64`.
    pub fn platform(&self) -> String {
        format!("linux/{}", self.as_str())
    }
}

//--------------------------------------------------------------------------------------------------
// Trait Implementations
//--------------------------------------------------------------------------------------------------

impl FromStr for CpuArch {
    type Err = MonodeployError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let arch = s.trim();
        let arch = arch.strip_prefix("linux/").unwrap_or(arch);
        match arch.to_ascii_lowercase().as_str() {
            "amd64" | "x86_64" | "x64" => Ok(CpuArch::Amd64),
            "arm64" | "aarch64" => Ok(CpuArch::Arm64),
            _ => Err(MonodeployError::InvalidCpuArch(s.to_string())),
        }
    }
}

impl fmt::Display for CpuArch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl Serialize for CpuArch {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for CpuArch {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

//--------------------------------------------------------------------------------------------------
// Tests
//--------------------------------------------------------------------------------------------------
