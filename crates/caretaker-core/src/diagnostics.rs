//! Self-tests for the menu's "run self-tests" entry.

use crate::context::Context;
use crate::error::CoreError;
use crate::hwprof;
use crate::location::ToolLocation;
use crate::optimize;
use crate::paths::SHARED_SUBDIRS;
use crate::shared_state::{self, DIR_MODE};
use caretaker_schema::Toolchain;
use std::os::unix::fs::PermissionsExt;

/// External tools the engines call, and whether their absence fails the run.
/// Each toolchain's own tool is checked too, as optional.
const SYSTEM_TOOLS: [(&str, bool); 5] = [
    ("hdiutil", true),
    ("defaults", true),
    ("pgrep", true),
    ("git", false),
    ("mdfind", false),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckStatus {
    Pass,
    Warn,
    Fail,
}

#[derive(Debug, Clone)]
pub struct Check {
    pub name: String,
    pub status: CheckStatus,
    pub detail: String,
}

impl Check {
    fn new(name: impl Into<String>, status: CheckStatus, detail: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            status,
            detail: detail.into(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct SelfTestReport {
    pub checks: Vec<Check>,
}

impl SelfTestReport {
    /// No check failed. Warnings do not count.
    pub fn passed(&self) -> bool {
        self.checks.iter().all(|c| c.status != CheckStatus::Fail)
    }
}

pub fn run_self_tests(ctx: &Context, location: &ToolLocation) -> SelfTestReport {
    let mut checks = Vec::new();

    let dir = location.dir();
    checks.push(if dir.is_absolute() && dir.is_dir() {
        Check::new("tool location", CheckStatus::Pass, dir.display().to_string())
    } else {
        Check::new("tool location", CheckStatus::Fail, format!("{} is not a directory", dir.display()))
    });

    checks.push(check_shared_tree(ctx));

    match shared_state::load_settings(&ctx.locations) {
        Ok(doc) => {
            checks.push(Check::new(
                "settings document",
                CheckStatus::Pass,
                format!("{} key(s)", doc.len()),
            ));
            checks.push(Check::new(
                "optimization status",
                CheckStatus::Pass,
                optimize::report_status(&doc).to_string().replace('\n', ", "),
            ));
        }
        Err(CoreError::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => checks.push(Check::new(
            "settings document",
            CheckStatus::Warn,
            "missing, created on first optimize",
        )),
        Err(e) => checks.push(Check::new(
            "settings document",
            CheckStatus::Fail,
            format!("{e} (run repair)"),
        )),
    }

    let profile = hwprof::detect_profile(ctx.runner.as_ref());
    checks.push(Check::new(
        "hardware profile",
        CheckStatus::Pass,
        format!("{profile} -> {}", profile.tier().as_str()),
    ));

    for (tool, required) in SYSTEM_TOOLS {
        checks.push(check_tool(ctx, tool, required));
    }
    for toolchain in Toolchain::ALL {
        checks.push(check_tool(ctx, toolchain.required_tool(), false));
    }

    SelfTestReport { checks }
}

fn check_shared_tree(ctx: &Context) -> Check {
    let root = &ctx.locations.shared_root;
    let mut problems = Vec::new();
    for sub in SHARED_SUBDIRS {
        let path = root.join(sub);
        match std::fs::metadata(&path) {
            Ok(meta) if meta.permissions().mode() & 0o777 != DIR_MODE => {
                problems.push(format!("{sub} has mode {:o}", meta.permissions().mode() & 0o777));
            }
            Ok(_) => {}
            Err(_) => problems.push(format!("{sub} missing")),
        }
    }
    if problems.is_empty() {
        Check::new("shared state", CheckStatus::Pass, root.display().to_string())
    } else {
        Check::new(
            "shared state",
            CheckStatus::Fail,
            format!("{} (run repair)", problems.join(", ")),
        )
    }
}

fn check_tool(ctx: &Context, tool: &str, required: bool) -> Check {
    let name = format!("tool: {tool}");
    if ctx.mock {
        return Check::new(name, CheckStatus::Pass, "mocked");
    }
    match which::which(tool) {
        Ok(path) => Check::new(name, CheckStatus::Pass, path.display().to_string()),
        Err(_) if required => Check::new(name, CheckStatus::Fail, "not found in PATH"),
        Err(_) => Check::new(name, CheckStatus::Warn, "not found in PATH"),
    }
}
