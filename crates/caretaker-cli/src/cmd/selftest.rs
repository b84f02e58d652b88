//! Self-tests

use crate::Exit;
use crate::session::Session;
use crate::ui::table;
use anyhow::Result;
use caretaker_core::Reporter;
use caretaker_core::diagnostics;

pub fn self_test(session: &Session) -> Result<Exit> {
    session.output.section("Self-tests");
    let report = diagnostics::run_self_tests(&session.ctx, &session.location);
    println!("{}", table::self_tests(&report));

    if report.passed() {
        session.output.success("All required checks passed.");
        Ok(Exit::Success)
    } else {
        session.output.error("One or more required checks failed.");
        Ok(Exit::Aborted)
    }
}
