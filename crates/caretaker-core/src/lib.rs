pub mod app;
pub mod config;
pub mod context;
pub mod diagnostics;
pub mod error;
pub mod exec;
pub mod heartbeat;
pub mod hwprof;
pub mod identity;
pub mod install;
pub mod io;
pub mod location;
pub mod optimize;
pub mod outcome;
pub mod paths;
pub mod prompt;
pub mod retry;
pub mod scaffold;
pub mod shared_state;
pub mod shortcut;
pub mod uninstall;

pub mod reporter;

pub use context::Context;
pub use error::{CoreError, Result};
pub use outcome::{Outcome, Severity, Warning};
pub use paths::Locations;
pub use reporter::{NullReporter, Reporter};

/// Version string stamped into logs.
pub const CORE_VERSION: &str = concat!("caretaker-core/", env!("CARGO_PKG_VERSION"));
