//! Error types raised while parsing schema values.

use thiserror::Error;

/// Errors raised while parsing schema values from text.
#[derive(Error, Debug)]
pub enum SchemaError {
    /// The settings document is not valid JSON.
    #[error("Settings document is not valid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),

    /// The settings document parsed, but its top level is not an object.
    #[error("Settings document must be a JSON object, found {0}")]
    NotAnObject(&'static str),

    /// A toolchain name did not match any supported toolchain.
    #[error("Unknown toolchain '{0}' (expected one of: venv, conda, poetry, node)")]
    UnknownToolchain(String),

    /// A stage name did not match any supported stage.
    #[error("Unknown stage '{0}' (expected one of: dev, test, prod)")]
    UnknownStage(String),
}
