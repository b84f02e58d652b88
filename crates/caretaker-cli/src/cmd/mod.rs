//! One handler per subcommand.
//!
//! Handlers print through the session's [`Output`](crate::ui::Output) and
//! return an [`Exit`](crate::Exit); an `Err` is reserved for failures that
//! stop the command before it could do anything useful.

pub mod completions;
pub mod install;
pub mod optimize;
pub mod project;
pub mod repair;
pub mod selftest;
pub mod shortcut;
pub mod status;
pub mod uninstall;

use crate::session::Session;
use caretaker_core::{Reporter, Warning};

/// Print collected warnings under a short heading, nothing if there are none.
pub(crate) fn report_warnings(session: &Session, warnings: &[Warning]) {
    if warnings.is_empty() {
        return;
    }
    session
        .output
        .info(&format!("Finished with {} warning(s):", warnings.len()));
    session.output.warnings(warnings);
}
