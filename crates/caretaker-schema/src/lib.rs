//! Data model shared by the caretaker engines and the CLI.
//!
//! Everything here is plain data: no process spawning and no filesystem
//! access beyond parsing text handed in by the caller.

pub mod artifact;
pub mod error;
pub mod hardware;
pub mod settings;
pub mod toolchain;

// Re-exports
pub use artifact::ArtifactCategory;
pub use error::SchemaError;
pub use hardware::{HardwareProfile, OptimizationTier, Vendor};
pub use settings::SettingsDocument;
pub use toolchain::{Stage, Toolchain};

/// File name of the shared settings document inside `config/`.
pub const SETTINGS_FILE_NAME: &str = "argv.json";
