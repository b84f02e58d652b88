//! Uninstall and residue verification.
//!
//! Removal walks [`ArtifactCategory::ALL`] in order and attempts every
//! category no matter what happened to the previous ones. Success means
//! every attempt ran; residues found by the read-only sweep afterwards are
//! reported, never treated as failures.

use crate::context::Context;
use crate::exec::Invocation;
use crate::heartbeat::PrivilegeHeartbeat;
use crate::io::fsops;
use crate::outcome::{Outcome, Warning};
use caretaker_schema::ArtifactCategory;
use regex::{Regex, RegexBuilder};
use std::fmt;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// Storage-engine directories removed by [`clean_databases`].
pub const DATABASE_DIRS: [&str; 4] = ["databases", "IndexedDB", "Local Storage", "Session Storage"];

/// Never descended into by the deep sweep.
const DEEP_SKIP: [&str; 6] = ["/System", "/dev", "/proc", "/Volumes", "/private/var/vm", "/cores"];

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UninstallOptions {
    /// Also sweep the filesystem root for residues.
    pub deep: bool,
    /// Delete the shared-state tree as well.
    pub purge_shared: bool,
}

/// What happened to one artifact category.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Removal {
    Removed(Vec<PathBuf>),
    NotPresent,
    Failed(String),
}

/// Something the verification sweep found.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Residue {
    Path(PathBuf),
    /// Keys still present in the preference store under this domain.
    Preference(String),
}

impl fmt::Display for Residue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Path(p) => write!(f, "{}", p.display()),
            Self::Preference(domain) => write!(f, "preference domain {domain}"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UninstallStatus {
    Success,
    PartialSuccess,
}

#[derive(Debug, Clone, Default)]
pub struct UninstallReport {
    /// One entry per category, in removal order.
    pub categories: Vec<(ArtifactCategory, Removal)>,
    pub databases_cleaned: Vec<PathBuf>,
    pub residues: Vec<Residue>,
    pub shared_purged: bool,
    pub warnings: Vec<Warning>,
}

impl UninstallReport {
    pub fn removed(&self) -> impl Iterator<Item = ArtifactCategory> + '_ {
        self.categories
            .iter()
            .filter(|(_, r)| matches!(r, Removal::Removed(_)))
            .map(|(c, _)| *c)
    }

    pub fn failed(&self) -> impl Iterator<Item = (ArtifactCategory, &str)> + '_ {
        self.categories.iter().filter_map(|(c, r)| match r {
            Removal::Failed(msg) => Some((*c, msg.as_str())),
            _ => None,
        })
    }

    pub fn status(&self) -> UninstallStatus {
        if self.failed().next().is_none() {
            UninstallStatus::Success
        } else {
            UninstallStatus::PartialSuccess
        }
    }
}

/// Paths belonging to one category.
pub fn artifact_paths(ctx: &Context, category: ArtifactCategory) -> Vec<PathBuf> {
    let app = &ctx.config.app;
    let lib = ctx.locations.library();
    match category {
        ArtifactCategory::ApplicationBundle => vec![crate::app::default_bundle_path(ctx)],
        ArtifactCategory::SupportData => vec![
            lib.join("Application Support").join(&app.name),
            ctx.locations.home.join(&app.private_dir),
        ],
        ArtifactCategory::Caches => vec![
            lib.join("Caches").join(&app.bundle_id),
            lib.join("Caches").join(&app.name),
            lib.join("Caches").join(format!("{}.ShipIt", app.bundle_id)),
        ],
        ArtifactCategory::Preferences => {
            vec![lib.join("Preferences").join(format!("{}.plist", app.bundle_id))]
        }
        ArtifactCategory::SavedState => vec![
            lib.join("Saved Application State")
                .join(format!("{}.savedState", app.bundle_id)),
        ],
        ArtifactCategory::Logs => vec![lib.join("Logs").join(&app.name)],
        ArtifactCategory::WebStorage => vec![
            lib.join("WebKit").join(&app.bundle_id),
            lib.join("HTTPStorages").join(&app.bundle_id),
        ],
        ArtifactCategory::CommandLineSymlink => vec![ctx.locations.cli_bin_dir.join(&app.cli_name)],
    }
}

/// Remove one path, escalating through `sudo rm -rf` on permission errors.
///
/// Returns `Ok(false)` if there was nothing to remove.
fn remove_one(ctx: &Context, path: &Path) -> Result<bool, String> {
    match std::fs::symlink_metadata(path) {
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(false),
        Err(e) => return Err(format!("{}: {e}", path.display())),
        Ok(_) => {}
    }

    match fsops::remove_path(path) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == ErrorKind::PermissionDenied => {
            tracing::info!(path = %path.display(), "permission denied, retrying with sudo");
            crate::heartbeat::ensure_credential(ctx, &format!("remove {}", path.display()))
                .map_err(|e| format!("{}: {e}", path.display()))?;
            let inv = Invocation::new("rm")
                .arg("-rf")
                .path_arg(path)
                .elevated(ctx.identity.is_root());
            ctx.runner
                .run_checked(&inv)
                .map(|_| true)
                .map_err(|e| format!("{}: {e}", path.display()))
        }
        Err(e) => Err(format!("{}: {e}", path.display())),
    }
}

fn remove_category(ctx: &Context, category: ArtifactCategory) -> Removal {
    let mut removed = Vec::new();
    let mut errors = Vec::new();

    for path in artifact_paths(ctx, category) {
        match remove_one(ctx, &path) {
            Ok(true) => removed.push(path),
            Ok(false) => {}
            Err(e) => errors.push(e),
        }
    }

    if category == ArtifactCategory::Preferences {
        let inv = Invocation::new("defaults").args(["delete", ctx.config.app.bundle_id.as_str()]);
        // Exit 1: domain does not exist
        if let Err(e) = ctx.runner.run(&inv) {
            errors.push(format!("defaults: {e}"));
        }
    }

    if !errors.is_empty() {
        Removal::Failed(errors.join("; "))
    } else if removed.is_empty() {
        Removal::NotPresent
    } else {
        Removal::Removed(removed)
    }
}

/// Remove every artifact category, then sweep for residues.
pub fn uninstall(ctx: &Context, opts: UninstallOptions) -> UninstallReport {
    let _heartbeat = PrivilegeHeartbeat::for_context(ctx);
    let mut report = UninstallReport::default();
    ctx.reporter.section("Uninstall");

    let terminated = crate::app::terminate_running(ctx);
    report.warnings.extend(terminated.warnings);

    let cleaned = clean_databases(ctx);
    report.warnings.extend(cleaned.warnings);
    report.databases_cleaned = cleaned.value;

    for category in ArtifactCategory::ALL {
        ctx.reporter.step("Removing", category.label());
        let result = remove_category(ctx, category);
        match &result {
            Removal::Removed(paths) => {
                tracing::info!(%category, count = paths.len(), "removed");
            }
            Removal::NotPresent => tracing::debug!(%category, "not present"),
            Removal::Failed(msg) => {
                tracing::warn!(%category, error = %msg, "removal failed, continuing");
                report
                    .warnings
                    .push(Warning::new(category.label(), msg));
            }
        }
        report.categories.push((category, result));
    }

    if opts.purge_shared {
        match remove_one(ctx, &ctx.locations.shared_root) {
            Ok(purged) => report.shared_purged = purged,
            Err(e) => report.warnings.push(Warning::new("purge shared state", e)),
        }
    }

    let verified = verify_complete_removal(ctx, opts.deep);
    report.residues = verified.value;
    report.warnings.extend(verified.warnings);
    report
}

/// Remove storage-engine subdirectories under the support-data path.
pub fn clean_databases(ctx: &Context) -> Outcome<Vec<PathBuf>> {
    let support = ctx
        .locations
        .library()
        .join("Application Support")
        .join(&ctx.config.app.name);
    let mut outcome = Outcome::clean(Vec::new());
    if !support.is_dir() {
        return outcome;
    }

    let mut targets = Vec::new();
    let mut walker = walkdir::WalkDir::new(&support).min_depth(1).into_iter();
    while let Some(entry) = walker.next() {
        let Ok(entry) = entry else { continue };
        if entry.file_type().is_dir() && is_database_dir(entry.path()) {
            targets.push(entry.into_path());
            walker.skip_current_dir();
        }
    }

    for dir in targets {
        match fsops::remove_path(&dir) {
            Ok(()) => outcome.value.push(dir),
            Err(e) => outcome.warn("clean databases", format!("{}: {e}", dir.display())),
        }
    }
    outcome
}

fn is_database_dir(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|n| DATABASE_DIRS.contains(&n))
}

/// Case-insensitive matcher for the app's file names and bundle identifier.
fn residue_pattern(ctx: &Context) -> Option<Regex> {
    let app = &ctx.config.app;
    let pattern = format!(
        "{}|{}",
        regex::escape(&app.name),
        regex::escape(&app.bundle_id)
    );
    RegexBuilder::new(&pattern)
        .case_insensitive(true)
        .build()
        .ok()
}

/// Read-only sweep for leftovers. Residues come back as warnings.
pub fn verify_complete_removal(ctx: &Context, deep: bool) -> Outcome<Vec<Residue>> {
    let mut outcome = Outcome::clean(Vec::new());
    let Some(pattern) = residue_pattern(ctx) else {
        outcome.warn("verify", "application name is not searchable");
        return outcome;
    };

    let loc = &ctx.locations;
    let mut roots = vec![
        loc.applications_dir.clone(),
        loc.library(),
        loc.temp_root.clone(),
    ];
    if deep {
        roots.push(PathBuf::from("/"));
    }

    let mut found: Vec<PathBuf> = Vec::new();
    for root in &roots {
        let mut walker = walkdir::WalkDir::new(root).min_depth(1).into_iter();
        while let Some(entry) = walker.next() {
            // Unreadable entries are skipped
            let Ok(entry) = entry else { continue };
            let path = entry.path();

            if entry.file_type().is_dir() && skip_dir(path, &loc.shared_root) {
                walker.skip_current_dir();
                continue;
            }
            if pattern.is_match(&entry.file_name().to_string_lossy()) {
                if !found.iter().any(|f| path.starts_with(f)) {
                    found.push(path.to_path_buf());
                }
                if entry.file_type().is_dir() {
                    walker.skip_current_dir();
                }
            }
        }
    }

    let mut residues: Vec<Residue> = found.into_iter().map(Residue::Path).collect();

    let bundle_id = &ctx.config.app.bundle_id;
    let prefs = ctx
        .runner
        .run(&Invocation::new("defaults").args(["read", bundle_id.as_str()]));
    if prefs.is_ok_and(|o| o.success() && !o.stdout.trim().is_empty()) {
        residues.push(Residue::Preference(bundle_id.clone()));
    }

    for residue in &residues {
        outcome.warn("residue", residue);
    }
    outcome.value = residues;
    outcome
}

fn skip_dir(path: &Path, shared_root: &Path) -> bool {
    path.starts_with(shared_root) || DEEP_SKIP.iter().any(|s| path == Path::new(s))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::exec::MockRunner;
    use crate::paths::Locations;
    use std::fs;
    use std::sync::Arc;
    use tempfile::tempdir;

    fn ctx(locations: Locations) -> (Context, Arc<MockRunner>) {
        let mock = Arc::new(MockRunner::new());
        let ctx = Context::new(locations, Config::default(), mock.clone()).with_mock(true);
        (ctx, mock)
    }

    fn populate(ctx: &Context) {
        for category in ArtifactCategory::ALL {
            let path = artifact_paths(ctx, category).remove(0);
            if category == ArtifactCategory::CommandLineSymlink {
                fs::create_dir_all(path.parent().unwrap()).unwrap();
                std::os::unix::fs::symlink("/nonexistent/cursor", &path).unwrap();
            } else if category == ArtifactCategory::Preferences {
                fs::create_dir_all(path.parent().unwrap()).unwrap();
                fs::write(&path, "plist").unwrap();
            } else {
                fs::create_dir_all(path.join("inner")).unwrap();
            }
        }
    }

    #[test]
    fn test_removes_every_category() {
        let tmp = tempdir().unwrap();
        let (ctx, mock) = ctx(Locations::rooted_at(tmp.path()));
        populate(&ctx);

        let report = uninstall(&ctx, UninstallOptions::default());
        assert_eq!(report.status(), UninstallStatus::Success);
        assert_eq!(report.removed().count(), 8);
        assert!(report.residues.is_empty(), "{:?}", report.residues);
        assert!(mock.was_called("defaults", &["delete", ctx.config.app.bundle_id.as_str()]));
    }

    #[test]
    fn test_failure_does_not_stop_later_categories() {
        let tmp = tempdir().unwrap();
        let mut loc = Locations::rooted_at(tmp.path());
        // A file where the applications directory should be makes the
        // bundle path unreachable.
        loc.applications_dir = tmp.path().join("apps-file");
        fs::write(&loc.applications_dir, "not a dir").unwrap();
        let (ctx, _) = ctx(loc);
        populate_except_bundle(&ctx);

        let report = uninstall(&ctx, UninstallOptions::default());
        assert_eq!(report.status(), UninstallStatus::PartialSuccess);
        let failed: Vec<_> = report.failed().map(|(c, _)| c).collect();
        assert_eq!(failed, vec![ArtifactCategory::ApplicationBundle]);

        let order: Vec<_> = report.categories.iter().map(|(c, _)| *c).collect();
        assert_eq!(order, ArtifactCategory::ALL);
        assert_eq!(report.removed().count(), 7);
    }

    fn populate_except_bundle(ctx: &Context) {
        for category in &ArtifactCategory::ALL[1..] {
            let path = artifact_paths(ctx, *category).remove(0);
            fs::create_dir_all(&path).unwrap();
        }
    }

    #[test]
    fn test_clean_databases_nested() {
        let tmp = tempdir().unwrap();
        let (ctx, _) = ctx(Locations::rooted_at(tmp.path()));
        let support = ctx.locations.library().join("Application Support/Cursor");
        fs::create_dir_all(support.join("IndexedDB/x")).unwrap();
        fs::create_dir_all(support.join("Partitions/p1/Local Storage/leveldb")).unwrap();
        fs::create_dir_all(support.join("User/settings")).unwrap();

        let out = clean_databases(&ctx);
        assert!(out.is_clean());
        assert_eq!(out.value.len(), 2);
        assert!(!support.join("IndexedDB").exists());
        assert!(!support.join("Partitions/p1/Local Storage").exists());
        assert!(support.join("User/settings").exists());
    }

    #[test]
    fn test_verify_reports_residues_without_touching_them() {
        let tmp = tempdir().unwrap();
        let (ctx, mock) = ctx(Locations::rooted_at(tmp.path()));
        let leftover = ctx.locations.temp_root.join("cursor-update-1234");
        fs::create_dir_all(leftover.join("nested-cursor-file")).unwrap();
        let unrelated = ctx.locations.library().join("Caches/com.other.app");
        fs::create_dir_all(&unrelated).unwrap();
        mock.stdout("defaults", &["read"], "{\n    WebGPUEnabled = 1;\n}\n");

        let out = verify_complete_removal(&ctx, false);
        assert_eq!(
            out.value,
            vec![
                Residue::Path(leftover.clone()),
                Residue::Preference(ctx.config.app.bundle_id.clone()),
            ]
        );
        assert_eq!(out.warnings.len(), 2);
        assert!(leftover.exists());
    }

    #[test]
    fn test_purge_shared_only_on_request() {
        let tmp = tempdir().unwrap();
        let (ctx, _) = ctx(Locations::rooted_at(tmp.path()));
        fs::create_dir_all(ctx.locations.config_dir()).unwrap();

        let report = uninstall(&ctx, UninstallOptions::default());
        assert!(!report.shared_purged);
        assert!(ctx.locations.shared_root.exists());

        let report = uninstall(
            &ctx,
            UninstallOptions {
                purge_shared: true,
                ..UninstallOptions::default()
            },
        );
        assert!(report.shared_purged);
        assert!(!ctx.locations.shared_root.exists());
    }
}
