//! Well-known filesystem locations.
//!
//! Everything is resolved once into a [`Locations`] value at startup; no
//! engine reads the environment on its own.

use crate::error::{CoreError, Result};
use caretaker_schema::SETTINGS_FILE_NAME;
use std::path::{Path, PathBuf};

/// Fixed root of the shared-state tree.
pub const DEFAULT_SHARED_ROOT: &str = "/Users/Shared/caretaker";

/// Fixed install target for application bundles.
pub const DEFAULT_APPLICATIONS_DIR: &str = "/Applications";

/// Where the command-line shim is symlinked.
pub const DEFAULT_CLI_BIN_DIR: &str = "/usr/local/bin";

/// Subdirectories of the shared root, in creation order.
pub const SHARED_SUBDIRS: [&str; 5] = ["config", "logs", "projects", "cache", "backups"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Locations {
    /// Root of the shared-state tree (`config/`, `logs/`, ...).
    pub shared_root: PathBuf,
    /// Directory the application bundle is copied into.
    pub applications_dir: PathBuf,
    /// Home directory of the invoking user.
    pub home: PathBuf,
    /// System temp root swept for residues.
    pub temp_root: PathBuf,
    /// Directory holding the command-line shim.
    pub cli_bin_dir: PathBuf,
}

impl Locations {
    /// Resolve from the environment.
    ///
    /// `CARETAKER_SHARED_ROOT`, `CARETAKER_APPLICATIONS_DIR`, `CARETAKER_HOME`,
    /// `CARETAKER_TEMP_ROOT` and `CARETAKER_CLI_BIN_DIR` override the defaults.
    pub fn from_env() -> Result<Self> {
        let var = |name: &str| std::env::var_os(name).map(PathBuf::from);

        let home = var("CARETAKER_HOME")
            .or_else(dirs::home_dir)
            .ok_or_else(|| {
                CoreError::Validation(
                    "Could not determine home directory. Set CARETAKER_HOME to override."
                        .to_string(),
                )
            })?;

        Ok(Self {
            shared_root: var("CARETAKER_SHARED_ROOT")
                .unwrap_or_else(|| PathBuf::from(DEFAULT_SHARED_ROOT)),
            applications_dir: var("CARETAKER_APPLICATIONS_DIR")
                .unwrap_or_else(|| PathBuf::from(DEFAULT_APPLICATIONS_DIR)),
            home,
            temp_root: var("CARETAKER_TEMP_ROOT").unwrap_or_else(|| PathBuf::from("/private/tmp")),
            cli_bin_dir: var("CARETAKER_CLI_BIN_DIR")
                .unwrap_or_else(|| PathBuf::from(DEFAULT_CLI_BIN_DIR)),
        })
    }

    /// Every location under one base directory. Used for sandboxed runs.
    pub fn rooted_at(base: &Path) -> Self {
        Self {
            shared_root: base.join("Shared/caretaker"),
            applications_dir: base.join("Applications"),
            home: base.join("home"),
            temp_root: base.join("tmp"),
            cli_bin_dir: base.join("bin"),
        }
    }

    pub fn config_dir(&self) -> PathBuf {
        self.shared_root.join("config")
    }

    pub fn logs_dir(&self) -> PathBuf {
        self.shared_root.join("logs")
    }

    pub fn projects_dir(&self) -> PathBuf {
        self.shared_root.join("projects")
    }

    pub fn backups_dir(&self) -> PathBuf {
        self.shared_root.join("backups")
    }

    /// Optimization artifacts: `config/defaults`
    pub fn defaults_dir(&self) -> PathBuf {
        self.config_dir().join("defaults")
    }

    /// The shared settings document: `config/argv.json`
    pub fn settings_path(&self) -> PathBuf {
        self.config_dir().join(SETTINGS_FILE_NAME)
    }

    /// Optional TOML configuration: `config/caretaker.toml`
    pub fn config_file(&self) -> PathBuf {
        self.config_dir().join("caretaker.toml")
    }

    /// `~/Library`
    pub fn library(&self) -> PathBuf {
        self.home.join("Library")
    }

    pub fn desktop_dir(&self) -> PathBuf {
        self.home.join("Desktop")
    }

    /// Generate a timestamped log path for one run
    pub fn run_log_path(&self) -> PathBuf {
        let timestamp = chrono::Local::now().format("%Y%m%d-%H%M%S");
        self.logs_dir().join(format!("caretaker-{timestamp}.log"))
    }
}

/// Lexically remove `.` and `..` components without touching the filesystem.
pub fn normalize(path: &Path) -> PathBuf {
    use std::path::Component;

    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}
