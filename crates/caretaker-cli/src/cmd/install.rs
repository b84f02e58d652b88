//! Clean install from the disk image

use crate::Exit;
use crate::session::Session;
use anyhow::Result;
use caretaker_core::Reporter;
use caretaker_core::install::{self, InstallOptions, InstallOutcome};
use std::path::PathBuf;

pub fn install(session: &Session, dmg: Option<PathBuf>, scaffold_project: bool) -> Result<Exit> {
    let ctx = &session.ctx;
    let output = &session.output;
    let dmg = dmg.unwrap_or_else(|| ctx.config.dmg_path(&ctx.locations));

    let opts = InstallOptions {
        scaffold_default_project: scaffold_project,
    };

    let outcome = install::install(ctx, &dmg, opts);
    tracing::info!(trace = ?outcome.trace(), "install finished");

    match outcome {
        InstallOutcome::Done(summary) => {
            output.success(&format!(
                "Installed {} {}",
                ctx.config.app.name,
                summary.application.version_label()
            ));
            output.field("Location", &summary.application.bundle_path.display().to_string());
            output.field("Hardware", &summary.profile.to_string());
            output.field("Tier", &summary.profile.tier().to_string());
            if let Some(status) = &summary.status {
                super::optimize::print_status(session, status);
            }
            super::report_warnings(session, &summary.warnings);
            Ok(Exit::Success)
        }
        InstallOutcome::Aborted { at, reason, .. } => {
            output.fatal(
                &format!("Install aborted while {}: {reason}", at.label().to_lowercase()),
                &reason.hint(),
            );
            Ok(Exit::Aborted)
        }
    }
}
