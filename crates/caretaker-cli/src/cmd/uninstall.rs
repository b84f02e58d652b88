//! Full removal with a residue sweep

use crate::Exit;
use crate::session::Session;
use crate::ui::table;
use anyhow::Result;
use caretaker_core::Reporter;
use caretaker_core::uninstall::{self, UninstallOptions, UninstallStatus};

pub fn uninstall(session: &Session, opts: UninstallOptions, strict_residue: bool) -> Result<Exit> {
    let ctx = &session.ctx;
    let output = &session.output;

    let mut question = format!(
        "Remove {} and all of its data from this machine?",
        ctx.config.app.name
    );
    if opts.purge_shared {
        question.push_str(" Shared configuration and projects will be deleted too.");
    }
    if !ctx.prompt.confirm(&question) {
        output.info("Uninstall cancelled, nothing was removed.");
        return Ok(Exit::Aborted);
    }

    let report = uninstall::uninstall(ctx, opts);
    println!("{}", table::uninstall(&report));

    if !report.databases_cleaned.is_empty() {
        output.info(&format!(
            "Cleaned {} database director{}",
            report.databases_cleaned.len(),
            if report.databases_cleaned.len() == 1 { "y" } else { "ies" }
        ));
    }
    if report.shared_purged {
        output.info(&format!(
            "Removed shared state at {}",
            ctx.locations.shared_root.display()
        ));
    }
    super::report_warnings(session, &report.warnings);

    if report.residues.is_empty() {
        output.success("No residues found.");
    } else {
        output.warning(&format!(
            "{} residue(s) remain (listed above)",
            report.residues.len()
        ));
    }

    match report.status() {
        UninstallStatus::Success => output.success("Uninstall complete."),
        UninstallStatus::PartialSuccess => {
            output.warning("Uninstall finished, but some artifacts could not be removed.");
        }
    }

    if strict_residue && !report.residues.is_empty() {
        return Ok(Exit::Residue);
    }
    Ok(Exit::Success)
}
