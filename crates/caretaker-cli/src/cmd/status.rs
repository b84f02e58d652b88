//! Installation and optimization status

use crate::Exit;
use crate::session::Session;
use anyhow::Result;
use caretaker_core::{Reporter, app, hwprof, optimize, shared_state};

/// Print shared root, installed version, hardware profile and active
/// optimizations. Never fails; missing pieces are reported as such.
pub fn status(session: &Session) -> Result<Exit> {
    let ctx = &session.ctx;
    let output = &session.output;
    output.section(&format!("{} status", ctx.config.app.name));

    output.field("caretaker", crate::VERSION);
    output.field("Shared root", &ctx.locations.shared_root.display().to_string());
    output.field("Tool location", &session.location.dir().display().to_string());

    let application = app::inspect(ctx);
    if application.is_present() {
        output.field(
            "Installed",
            &format!(
                "{} ({})",
                application.version_label(),
                application.bundle_path.display()
            ),
        );
    } else {
        output.field("Installed", "no");
    }

    let profile = hwprof::detect_profile(ctx.runner.as_ref());
    output.field("Hardware", &profile.to_string());
    output.field("Tier", &profile.tier().to_string());

    let updated = std::fs::metadata(ctx.locations.settings_path())
        .and_then(|m| m.modified())
        .map_or_else(
            |_| "never".to_string(),
            |t| {
                chrono::DateTime::<chrono::Local>::from(t)
                    .format("%Y-%m-%d %H:%M")
                    .to_string()
            },
        );
    output.field("Settings updated", &updated);

    match shared_state::load_settings(&ctx.locations) {
        Ok(doc) => super::optimize::print_status(session, &optimize::report_status(&doc)),
        Err(e) => output.warning(&format!("Settings document unreadable: {e}")),
    }
    Ok(Exit::Success)
}
