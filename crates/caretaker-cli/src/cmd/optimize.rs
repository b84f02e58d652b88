//! Hardware-tiered optimization

use crate::Exit;
use crate::session::Session;
use anyhow::{Context as _, Result};
use caretaker_core::optimize::{self, StatusReport};
use caretaker_core::{Reporter, hwprof, shared_state};

pub fn optimize(session: &Session) -> Result<Exit> {
    let ctx = &session.ctx;
    let profile = hwprof::detect_profile(ctx.runner.as_ref());
    session.output.field("Hardware", &profile.to_string());
    session.output.field("Tier", &profile.tier().to_string());

    let outcome = optimize::optimize(ctx, &profile).context("Optimization failed")?;
    print_status(session, &outcome.value);
    super::report_warnings(session, &outcome.warnings);
    session.output.success("Optimizations applied.");
    Ok(Exit::Success)
}

pub fn reset(session: &Session) -> Result<Exit> {
    let outcome = optimize::reset(&session.ctx).context("Failed to reset optimizations")?;
    super::report_warnings(session, &outcome.warnings);
    session.output.success("Optimizations removed.");
    Ok(Exit::Success)
}

pub fn status(session: &Session) -> Result<Exit> {
    let doc = shared_state::load_settings(&session.ctx.locations)
        .context("Failed to read the settings document (try `caretaker repair`)")?;
    print_status(session, &optimize::report_status(&doc));
    Ok(Exit::Success)
}

pub(crate) fn print_status(session: &Session, status: &StatusReport) {
    for line in status.to_string().lines() {
        if let Some((label, value)) = line.split_once(": ") {
            session.output.field(label, value);
        }
    }
}
