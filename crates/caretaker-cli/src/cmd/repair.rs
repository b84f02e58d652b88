//! Shared configuration repair

use crate::Exit;
use crate::session::Session;
use anyhow::{Context as _, Result};
use caretaker_core::{Reporter, shared_state};

pub fn repair(session: &Session) -> Result<Exit> {
    let ctx = &session.ctx;
    session.output.section("Repair shared configuration");

    let outcome = shared_state::ensure_shared_state(ctx).context("Failed to set up shared state")?;
    let repaired = shared_state::repair_settings_document(&ctx.locations)
        .context("Failed to repair the settings document")?;

    if repaired {
        session.output.warning(&format!(
            "{} was invalid; a backup was written to {}",
            ctx.locations.settings_path().display(),
            ctx.locations.backups_dir().display()
        ));
    } else {
        session.output.info("Settings document is valid.");
    }
    super::report_warnings(session, &outcome.warnings);
    session.output.success(&format!(
        "Shared state is ready at {}",
        ctx.locations.shared_root.display()
    ));
    Ok(Exit::Success)
}
