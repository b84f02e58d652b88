//! Desktop shortcut

use crate::Exit;
use crate::session::Session;
use anyhow::Result;
use caretaker_core::Reporter;
use caretaker_core::shortcut;

pub fn shortcut(session: &Session) -> Result<Exit> {
    let outcome = shortcut::create_desktop_shortcut(&session.ctx)?;
    super::report_warnings(session, &outcome.warnings);
    if let Some(link) = outcome.value {
        session
            .output
            .success(&format!("Shortcut created at {}", link.display()));
    }
    Ok(Exit::Success)
}
