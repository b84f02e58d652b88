//! Disk-image install state machine.
//!
//! ```text
//! Idle -> Verifying -> ClosingRunningInstances -> Mounting -> Copying
//!      -> Unmounting -> Optimizing -> ScaffoldingDefaultProject -> Done
//! ```
//!
//! `Verifying`, `Mounting` and `Copying` may end in `Aborted`. Once the
//! image is attached it is detached on every path out of the machine. Steps
//! after the copy only degrade the result to warnings.

use crate::app::{self, InstalledApplication};
use crate::context::Context;
use crate::hwprof;
use crate::io::{dmg, fsops};
use crate::optimize::{self, StatusReport};
use crate::outcome::{Outcome, Warning};
use crate::scaffold;
use caretaker_schema::HardwareProfile;
use std::fmt;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstallState {
    Idle,
    Verifying,
    ClosingRunningInstances,
    Mounting,
    Copying,
    Unmounting,
    Optimizing,
    ScaffoldingDefaultProject,
    Done,
    Aborted,
}

impl InstallState {
    pub fn label(self) -> &'static str {
        match self {
            Self::Idle => "Idle",
            Self::Verifying => "Verifying",
            Self::ClosingRunningInstances => "Closing running instances",
            Self::Mounting => "Mounting",
            Self::Copying => "Copying",
            Self::Unmounting => "Unmounting",
            Self::Optimizing => "Optimizing",
            Self::ScaffoldingDefaultProject => "Scaffolding default project",
            Self::Done => "Done",
            Self::Aborted => "Aborted",
        }
    }

    /// States allowed to transition into `Aborted`.
    pub fn can_abort(self) -> bool {
        matches!(self, Self::Verifying | Self::Mounting | Self::Copying)
    }
}

impl fmt::Display for InstallState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Why an install stopped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AbortReason {
    ImageMissing(PathBuf),
    ImageCorrupted { path: PathBuf, detail: String },
    MountFailed(String),
    CopyFailed(String),
}

impl AbortReason {
    /// What the user should fix before retrying.
    pub fn hint(&self) -> String {
        match self {
            Self::ImageMissing(path) => format!(
                "Download the installer to {} or pass --dmg <path>",
                path.display()
            ),
            Self::ImageCorrupted { .. } => {
                "Delete the image and download it again".to_string()
            }
            Self::MountFailed(_) => {
                "Check that no other copy of the image is mounted (hdiutil info)".to_string()
            }
            Self::CopyFailed(_) => {
                "Check free space and write access to the Applications directory".to_string()
            }
        }
    }
}

impl fmt::Display for AbortReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ImageMissing(path) => write!(f, "disk image not found at {}", path.display()),
            Self::ImageCorrupted { path, detail } => {
                write!(f, "disk image at {} is corrupted: {detail}", path.display())
            }
            Self::MountFailed(detail) => write!(f, "could not mount disk image: {detail}"),
            Self::CopyFailed(detail) => write!(f, "could not copy application bundle: {detail}"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct InstallSummary {
    pub application: InstalledApplication,
    pub profile: HardwareProfile,
    /// `None` if optimization failed outright.
    pub status: Option<StatusReport>,
    pub warnings: Vec<Warning>,
    pub trace: Vec<InstallState>,
}

#[derive(Debug, Clone)]
pub enum InstallOutcome {
    Done(InstallSummary),
    Aborted {
        at: InstallState,
        reason: AbortReason,
        trace: Vec<InstallState>,
    },
}

impl InstallOutcome {
    pub fn is_done(&self) -> bool {
        matches!(self, Self::Done(_))
    }

    pub fn trace(&self) -> &[InstallState] {
        match self {
            Self::Done(s) => &s.trace,
            Self::Aborted { trace, .. } => trace,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InstallOptions {
    pub scaffold_default_project: bool,
}

impl Default for InstallOptions {
    fn default() -> Self {
        Self {
            scaffold_default_project: true,
        }
    }
}

struct Machine<'c> {
    ctx: &'c Context,
    state: InstallState,
    trace: Vec<InstallState>,
    report: Outcome<()>,
}

impl<'c> Machine<'c> {
    fn new(ctx: &'c Context) -> Self {
        Self {
            ctx,
            state: InstallState::Idle,
            trace: vec![InstallState::Idle],
            report: Outcome::clean(()),
        }
    }

    fn enter(&mut self, next: InstallState, detail: &str) {
        tracing::info!(from = %self.state, to = %next, "install transition");
        self.ctx.reporter.step(next.label(), detail);
        self.state = next;
        self.trace.push(next);
    }

    fn abort(mut self, reason: AbortReason) -> InstallOutcome {
        debug_assert!(self.state.can_abort(), "abort from {}", self.state);
        let at = self.state;
        tracing::error!(state = %at, %reason, "install aborted");
        self.state = InstallState::Aborted;
        self.trace.push(InstallState::Aborted);
        InstallOutcome::Aborted {
            at,
            reason,
            trace: self.trace,
        }
    }
}

/// Install the application from `dmg_path`.
pub fn install(ctx: &Context, dmg_path: &Path, opts: InstallOptions) -> InstallOutcome {
    let mut m = Machine::new(ctx);
    ctx.reporter.section("Clean install");

    m.enter(InstallState::Verifying, &dmg_path.display().to_string());
    if !dmg_path.exists() {
        return m.abort(AbortReason::ImageMissing(dmg_path.to_path_buf()));
    }
    if let Err(e) = dmg::verify(ctx.runner.as_ref(), dmg_path, ctx.config.install.min_image_bytes) {
        return m.abort(AbortReason::ImageCorrupted {
            path: dmg_path.to_path_buf(),
            detail: format!("{e:#}"),
        });
    }

    m.enter(InstallState::ClosingRunningInstances, &ctx.config.app.process_pattern);
    let closed = app::terminate_running(ctx);
    m.report.absorb(closed);

    m.enter(InstallState::Mounting, "");
    let mut mount = match dmg::attach(ctx.runner.as_ref(), dmg_path) {
        Ok(mount) => mount,
        Err(e) => return m.abort(AbortReason::MountFailed(format!("{e:#}"))),
    };

    let target = app::default_bundle_path(ctx);
    m.enter(InstallState::Copying, &target.display().to_string());
    if let Err(e) = copy_application(ctx, mount.path(), &target) {
        if let Err(detach_err) = mount.detach() {
            tracing::warn!(error = %detach_err, "detach after failed copy also failed");
        }
        return m.abort(AbortReason::CopyFailed(format!("{e:#}")));
    }

    m.enter(InstallState::Unmounting, &mount.path().display().to_string());
    match mount.detach() {
        Ok(false) => {}
        Ok(true) => m.report.warn("unmount", "volume was busy, detached with -force"),
        Err(e) => m.report.warn("unmount", format!("{e:#}")),
    }
    drop(mount);

    if let Err(e) = strip_quarantine(ctx, &target) {
        m.report.warn("quarantine", e);
    }

    m.enter(InstallState::Optimizing, "");
    let profile = hwprof::detect_profile(ctx.runner.as_ref());
    let status = match optimize::optimize(ctx, &profile) {
        Ok(out) => Some(m.report.absorb(out)),
        Err(e) => {
            m.report.warn("optimize", e);
            None
        }
    };

    m.enter(InstallState::ScaffoldingDefaultProject, &ctx.config.project.default_name);
    if opts.scaffold_default_project && !ctx.config.install.skip_default_project {
        scaffold_default_project(ctx, &mut m.report);
    } else {
        tracing::info!("default project skipped");
    }

    m.enter(InstallState::Done, "");
    let application = app::inspect(ctx);
    let (_, warnings) = m.report.into_parts();
    InstallOutcome::Done(InstallSummary {
        application,
        profile,
        status,
        warnings,
        trace: m.trace,
    })
}

/// Copy the bundle found in the mounted volume and hand it to the invoking user.
fn copy_application(ctx: &Context, mount: &Path, target: &Path) -> anyhow::Result<()> {
    let source = find_bundle(mount, &ctx.config.app.bundle_file_name())
        .ok_or_else(|| anyhow::anyhow!("No .app found in {}", mount.display()))?;

    std::fs::create_dir_all(&ctx.locations.applications_dir)?;
    fsops::copy_bundle(&source, target)?;

    let id = ctx.identity;
    for entry in walkdir::WalkDir::new(target) {
        let entry = entry?;
        std::os::unix::fs::lchown(entry.path(), Some(id.uid), Some(id.gid))?;
    }
    Ok(())
}

/// The `.app` inside a mounted volume, preferring the expected bundle name.
fn find_bundle(mount: &Path, expected: &str) -> Option<PathBuf> {
    let candidates: Vec<PathBuf> = walkdir::WalkDir::new(mount)
        .min_depth(1)
        .max_depth(3)
        .into_iter()
        .flatten()
        .filter(|e| !e.file_name().to_string_lossy().starts_with('.'))
        .filter(|e| e.file_type().is_dir() && e.path().extension().is_some_and(|x| x == "app"))
        .map(walkdir::DirEntry::into_path)
        .collect();

    candidates
        .iter()
        .find(|p| p.file_name().is_some_and(|n| n == expected))
        .or_else(|| candidates.first())
        .cloned()
}

fn strip_quarantine(ctx: &Context, target: &Path) -> crate::error::Result<()> {
    let inv = crate::exec::Invocation::new("xattr")
        .args(["-dr", "com.apple.quarantine"])
        .path_arg(target);
    ctx.runner.run_checked(&inv).map(|_| ())
}

fn scaffold_default_project(ctx: &Context, report: &mut Outcome<()>) {
    let name = &ctx.config.project.default_name;
    if ctx.locations.projects_dir().join(name).exists() {
        tracing::info!(project = %name, "default project already exists");
        return;
    }
    match scaffold::setup_project(ctx, name, ctx.config.project.default_toolchain) {
        Ok(out) => {
            let _project = report.absorb(out);
        }
        Err(e) => report.warn("default project", e),
    }
}
