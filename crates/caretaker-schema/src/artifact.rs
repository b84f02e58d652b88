//! Artifact categories removed during uninstall.

use serde::{Deserialize, Serialize};
use std::fmt;

/// One class of on-disk or preference-store data belonging to the managed
/// application.
///
/// Categories are removed in [`ArtifactCategory::ALL`] order, each one
/// independently of the others.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactCategory {
    /// The `.app` bundle in the applications directory.
    ApplicationBundle,
    /// `~/Library/Application Support/<App>`.
    SupportData,
    /// `~/Library/Caches` entries.
    Caches,
    /// The preferences plist and its preference-store domain.
    Preferences,
    /// `~/Library/Saved Application State` entry.
    SavedState,
    /// `~/Library/Logs/<App>`.
    Logs,
    /// `WebKit` and HTTP storage directories (local storage, `IndexedDB`).
    WebStorage,
    /// Command-line shim symlinked into a `bin` directory.
    CommandLineSymlink,
}

impl ArtifactCategory {
    /// Fixed removal order.
    pub const ALL: [Self; 8] = [
        Self::ApplicationBundle,
        Self::SupportData,
        Self::Caches,
        Self::Preferences,
        Self::SavedState,
        Self::Logs,
        Self::WebStorage,
        Self::CommandLineSymlink,
    ];

    /// Human-readable label.
    pub fn label(self) -> &'static str {
        match self {
            Self::ApplicationBundle => "application bundle",
            Self::SupportData => "support data",
            Self::Caches => "caches",
            Self::Preferences => "preferences",
            Self::SavedState => "saved UI state",
            Self::Logs => "logs",
            Self::WebStorage => "web storage",
            Self::CommandLineSymlink => "command-line symlink",
        }
    }
}

impl fmt::Display for ArtifactCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}
