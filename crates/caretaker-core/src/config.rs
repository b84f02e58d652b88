//! Optional TOML configuration (`config/caretaker.toml`).
//!
//! Every field has a default, so a missing file is the same as an empty one.

use crate::error::{CoreError, Result};
use crate::paths::Locations;
use caretaker_schema::Toolchain;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub app: AppConfig,
    pub install: InstallConfig,
    pub retry: RetryConfig,
    pub privilege: PrivilegeConfig,
    pub project: ProjectConfig,
}

/// Identity of the managed application.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Bundle name without `.app`.
    pub name: String,
    /// `CFBundleIdentifier`, also the preference-store domain.
    pub bundle_id: String,
    /// Pattern matched against process command lines (`pgrep -f`). Points at
    /// the bundle's executable directory so arguments that merely mention
    /// the app name do not match.
    pub process_pattern: String,
    /// Name of the command-line shim.
    pub cli_name: String,
    /// Directory under `$HOME` holding the app's private `argv.json`.
    pub private_dir: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            name: "Cursor".to_string(),
            bundle_id: "com.todesktop.230313mzl4w4u92".to_string(),
            process_pattern: "Cursor.app/Contents/MacOS/".to_string(),
            cli_name: "cursor".to_string(),
            private_dir: ".cursor".to_string(),
        }
    }
}

impl AppConfig {
    /// `<Name>.app`
    pub fn bundle_file_name(&self) -> String {
        format!("{}.app", self.name)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InstallConfig {
    /// Disk image to install from; defaults to `~/Downloads/<Name>.dmg`.
    pub dmg_path: Option<PathBuf>,
    /// Images at or below this size are treated as corrupted downloads.
    pub min_image_bytes: u64,
    /// Skip the default project scaffold after install.
    pub skip_default_project: bool,
}

impl Default for InstallConfig {
    fn default() -> Self {
        Self {
            dmg_path: None,
            min_image_bytes: 10 * 1024 * 1024,
            skip_default_project: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    pub attempts: u32,
    pub backoff_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            attempts: 3,
            backoff_ms: 2000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PrivilegeConfig {
    /// Keep the sudo timestamp fresh during long privileged operations.
    pub heartbeat: bool,
    pub heartbeat_secs: u64,
}

impl Default for PrivilegeConfig {
    fn default() -> Self {
        Self {
            heartbeat: true,
            heartbeat_secs: 60,
        }
    }
}

impl PrivilegeConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.heartbeat_secs.max(1))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectConfig {
    /// Name of the project scaffolded after a clean install.
    pub default_name: String,
    pub default_toolchain: Toolchain,
    /// Where the user believes projects live; corrected if it drifted.
    pub projects_dir: Option<PathBuf>,
}

impl Default for ProjectConfig {
    fn default() -> Self {
        Self {
            default_name: "starter".to_string(),
            default_toolchain: Toolchain::Venv,
            projects_dir: None,
        }
    }
}

impl Config {
    /// Load from `path`; a missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self> {
        let text = match std::fs::read_to_string(path) {
            Ok(t) => t,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(e) => return Err(e.into()),
        };
        toml::from_str(&text).map_err(|e| CoreError::Config {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }

    /// Load from the well-known location under the shared root.
    pub fn load_from(locations: &Locations) -> Result<Self> {
        Self::load(&locations.config_file())
    }

    /// Disk image path, falling back to `~/Downloads/<Name>.dmg`.
    pub fn dmg_path(&self, locations: &Locations) -> PathBuf {
        self.install.dmg_path.clone().unwrap_or_else(|| {
            locations
                .home
                .join("Downloads")
                .join(format!("{}.dmg", self.app.name))
        })
    }

    /// The application's private settings file (`~/.cursor/argv.json`).
    pub fn private_settings_path(&self, locations: &Locations) -> PathBuf {
        locations
            .home
            .join(&self.app.private_dir)
            .join(caretaker_schema::SETTINGS_FILE_NAME)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_missing_file_is_default() {
        let tmp = tempdir().unwrap();
        let cfg = Config::load(&tmp.path().join("nope.toml")).unwrap();
        assert_eq!(cfg, Config::default());
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let tmp = tempdir().unwrap();
        let path = tmp.path().join("caretaker.toml");
        std::fs::write(
            &path,
            "[app]\nname = \"Editor\"\n\n[retry]\nattempts = 5\n\n[project]\ndefault_toolchain = \"node\"\n",
        )
        .unwrap();

        let cfg = Config::load(&path).unwrap();
        assert_eq!(cfg.app.name, "Editor");
        assert_eq!(cfg.app.cli_name, "cursor");
        assert_eq!(cfg.retry.attempts, 5);
        assert_eq!(cfg.retry.backoff_ms, 2000);
        assert_eq!(cfg.project.default_toolchain, Toolchain::Node);
    }

    #[test]
    fn test_invalid_file_reports_path() {
        let tmp = tempdir().unwrap();
        let path = tmp.path().join("caretaker.toml");
        std::fs::write(&path, "[app\nname=").unwrap();
        let err = Config::load(&path).unwrap_err();
        assert!(err.to_string().contains("caretaker.toml"));
    }

    #[test]
    fn test_default_dmg_path() {
        let loc = Locations::rooted_at(Path::new("/sb"));
        let cfg = Config::default();
        assert_eq!(
            cfg.dmg_path(&loc),
            PathBuf::from("/sb/home/Downloads/Cursor.dmg")
        );
    }
}
