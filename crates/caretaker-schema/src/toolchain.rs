//! Project toolchains and deployment stages.

use crate::SchemaError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Dependency-management system a project is scaffolded with.
///
/// Chosen once at scaffold time and immutable afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Toolchain {
    /// Python `venv` with one environment per stage.
    #[default]
    Venv,
    /// Conda environment descriptors per stage.
    Conda,
    /// Poetry with an in-project virtual environment.
    Poetry,
    /// Node.js with per-stage `.env` files.
    Node,
}

impl Toolchain {
    /// Every supported toolchain, in menu order.
    pub const ALL: [Self; 4] = [Self::Venv, Self::Conda, Self::Poetry, Self::Node];

    /// Lowercase name as typed on the command line.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Venv => "venv",
            Self::Conda => "conda",
            Self::Poetry => "poetry",
            Self::Node => "node",
        }
    }

    /// Executable the toolchain needs on `PATH`.
    pub fn required_tool(self) -> &'static str {
        match self {
            Self::Venv => "python3",
            Self::Conda => "conda",
            Self::Poetry => "poetry",
            Self::Node => "npm",
        }
    }
}

impl fmt::Display for Toolchain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Toolchain {
    type Err = SchemaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "venv" | "python" | "pip" => Ok(Self::Venv),
            "conda" | "miniconda" | "mamba" => Ok(Self::Conda),
            "poetry" => Ok(Self::Poetry),
            "node" | "npm" | "nodejs" => Ok(Self::Node),
            _ => Err(SchemaError::UnknownToolchain(s.to_string())),
        }
    }
}

/// Deployment stage with its own environment descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    /// Local development.
    #[default]
    Dev,
    /// Test runs and CI.
    Test,
    /// Production.
    Prod,
}

impl Stage {
    /// All stages in promotion order.
    pub const ALL: [Self; 3] = [Self::Dev, Self::Test, Self::Prod];

    /// Short name used in file names (`requirements/dev.txt`).
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Dev => "dev",
            Self::Test => "test",
            Self::Prod => "prod",
        }
    }

    /// Long name used by Node tooling (`NODE_ENV`).
    pub fn node_env(self) -> &'static str {
        match self {
            Self::Dev => "development",
            Self::Test => "test",
            Self::Prod => "production",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Stage {
    type Err = SchemaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "dev" | "development" => Ok(Self::Dev),
            "test" | "testing" => Ok(Self::Test),
            "prod" | "production" => Ok(Self::Prod),
            _ => Err(SchemaError::UnknownStage(s.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_toolchain_parse_aliases() {
        assert_eq!("venv".parse::<Toolchain>().unwrap(), Toolchain::Venv);
        assert_eq!("Conda".parse::<Toolchain>().unwrap(), Toolchain::Conda);
        assert_eq!(" poetry ".parse::<Toolchain>().unwrap(), Toolchain::Poetry);
        assert_eq!("nodejs".parse::<Toolchain>().unwrap(), Toolchain::Node);
        assert!("cargo".parse::<Toolchain>().is_err());
    }

    #[test]
    fn test_stage_names() {
        assert_eq!(Stage::Prod.node_env(), "production");
        assert_eq!("development".parse::<Stage>().unwrap(), Stage::Dev);
        assert_eq!(Stage::ALL.len(), 3);
    }
}
