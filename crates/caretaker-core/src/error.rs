//! Domain-specific errors for lifecycle operations

use caretaker_schema::SchemaError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid settings: {0}")]
    Schema(#[from] SchemaError),

    #[error("Invalid configuration in {path}: {message}")]
    Config { path: PathBuf, message: String },

    #[error("`{program}` failed: {message}")]
    Command { program: String, message: String },

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Operation cancelled: {0}")]
    Cancelled(String),

    #[error("{context}: {message}")]
    Context {
        context: &'static str,
        message: String,
    },

    #[error("{0}")]
    Other(String),
}

impl CoreError {
    /// Create an error with context for better debugging.
    pub fn context(ctx: &'static str, msg: impl std::fmt::Display) -> Self {
        Self::Context {
            context: ctx,
            message: msg.to_string(),
        }
    }

    /// Failure of an external tool, with its stderr or exit status as the message.
    pub fn command(program: impl Into<String>, msg: impl std::fmt::Display) -> Self {
        Self::Command {
            program: program.into(),
            message: msg.to_string(),
        }
    }
}

impl From<anyhow::Error> for CoreError {
    fn from(err: anyhow::Error) -> Self {
        Self::Other(err.to_string())
    }
}

pub type Result<T, E = CoreError> = std::result::Result<T, E>;
