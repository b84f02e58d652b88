//! Project environment scaffolding

use crate::Exit;
use crate::session::Session;
use anyhow::Result;
use caretaker_core::scaffold;
use caretaker_core::{CoreError, Reporter};
use caretaker_schema::Toolchain;

pub fn project(session: &Session, name: Option<String>, toolchain: Option<Toolchain>) -> Result<Exit> {
    let ctx = &session.ctx;
    let name = name.unwrap_or_else(|| ctx.config.project.default_name.clone());
    let toolchain = toolchain.unwrap_or(ctx.config.project.default_toolchain);

    match scaffold::setup_project(ctx, &name, toolchain) {
        Ok(outcome) => {
            let project = &outcome.value;
            session.output.field("Project", &project.name);
            session.output.field("Location", &project.root.display().to_string());
            session.output.field("Toolchain", project.toolchain.as_str());
            super::report_warnings(session, &outcome.warnings);
            session.output.success("Project ready.");
            Ok(Exit::Success)
        }
        Err(CoreError::Cancelled(msg)) => {
            session.output.info(&format!("Cancelled: {msg}"));
            Ok(Exit::Aborted)
        }
        Err(e) => Err(e.into()),
    }
}
