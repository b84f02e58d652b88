//! The managed application as it exists on disk.

use crate::context::Context;
use crate::exec::{CommandRunner, Invocation};
use crate::outcome::Outcome;
use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

static SHORT_VERSION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"<key>(CFBundleShortVersionString|CFBundleVersion)</key>\s*<string>([^<]+)</string>")
        .unwrap_or_else(|e| unreachable!("static regex: {e}"))
});

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstalledApplication {
    pub bundle_path: PathBuf,
    pub version: Option<String>,
}

impl InstalledApplication {
    pub fn is_present(&self) -> bool {
        self.bundle_path.join("Contents").is_dir()
    }

    /// Version for display, `unknown` when unreadable.
    pub fn version_label(&self) -> &str {
        self.version.as_deref().unwrap_or("unknown")
    }
}

/// Default bundle path: `<applications>/<Name>.app`.
pub fn default_bundle_path(ctx: &Context) -> PathBuf {
    ctx.locations
        .applications_dir
        .join(ctx.config.app.bundle_file_name())
}

/// Find the bundle: the fixed path first, then Spotlight by bundle identifier.
pub fn locate(ctx: &Context) -> Option<PathBuf> {
    let default = default_bundle_path(ctx);
    if default.is_dir() {
        return Some(default);
    }

    let query = format!("kMDItemCFBundleIdentifier == '{}'", ctx.config.app.bundle_id);
    let out = ctx
        .runner
        .run(&Invocation::new("mdfind").arg(query))
        .ok()
        .filter(|o| o.success())?;

    out.stdout
        .lines()
        .map(str::trim)
        .filter(|l| l.ends_with(".app"))
        .map(PathBuf::from)
        .find(|p| p.is_dir())
}

/// Inspect the installed application, present or not.
pub fn inspect(ctx: &Context) -> InstalledApplication {
    let bundle_path = locate(ctx).unwrap_or_else(|| default_bundle_path(ctx));
    let version = if bundle_path.is_dir() {
        read_version(ctx.runner.as_ref(), &bundle_path)
    } else {
        None
    };
    InstalledApplication {
        bundle_path,
        version,
    }
}

/// `CFBundleShortVersionString` of a bundle.
///
/// Asks `plutil` first (handles binary plists) and falls back to scanning the
/// XML text of `Info.plist`.
pub fn read_version(runner: &dyn CommandRunner, bundle: &Path) -> Option<String> {
    let plist = bundle.join("Contents/Info.plist");
    let inv = Invocation::new("plutil")
        .args(["-extract", "CFBundleShortVersionString", "raw", "-o", "-"])
        .path_arg(&plist);

    if let Ok(out) = runner.run(&inv) {
        let v = out.stdout.trim();
        if out.success() && !v.is_empty() {
            return Some(v.to_string());
        }
    }

    let text = std::fs::read_to_string(&plist).ok()?;
    let found: Vec<(String, String)> = SHORT_VERSION
        .captures_iter(&text)
        .map(|c| (c[1].to_string(), c[2].trim().to_string()))
        .filter(|(_, v)| !v.is_empty())
        .collect();
    // Marketing version wins over the build number
    found
        .iter()
        .find(|(k, _)| k == "CFBundleShortVersionString")
        .or_else(|| found.first())
        .map(|(_, v)| v.clone())
}

/// Terminate running instances. Never blocks progress.
///
/// Matches command lines with `pgrep -f`, then signals the matching pids
/// with `kill`. This process and its parent are never signalled, even when
/// their own arguments match. Returns whether anything was running.
pub fn terminate_running(ctx: &Context) -> Outcome<bool> {
    let pattern = &ctx.config.app.process_pattern;
    let listed = ctx
        .runner
        .run(&Invocation::new("pgrep").args(["-f", pattern.as_str()]));
    let stdout = match listed {
        Ok(out) if out.success() => out.stdout,
        _ => return Outcome::clean(false),
    };

    let spared = [std::process::id(), std::os::unix::process::parent_id()];
    let pids = running_pids(&stdout, &spared);
    if pids.is_empty() {
        return Outcome::clean(false);
    }

    tracing::info!(pattern, ?pids, "terminating running instances");
    let kill = Invocation::new("kill")
        .arg("-TERM")
        .args(pids.iter().map(ToString::to_string));
    match ctx.runner.run(&kill) {
        // 1 means a process exited before the signal arrived
        Ok(out) if out.success() || out.status == Some(1) => Outcome::clean(true),
        Ok(out) => Outcome::degraded(
            true,
            crate::outcome::Warning::new("terminate", out.failure_summary()),
        ),
        Err(e) => Outcome::degraded(true, crate::outcome::Warning::new("terminate", e)),
    }
}

/// Pids listed by `pgrep`, minus `spared`.
fn running_pids(pgrep_stdout: &str, spared: &[u32]) -> Vec<u32> {
    pgrep_stdout
        .lines()
        .filter_map(|l| l.trim().parse::<u32>().ok())
        .filter(|pid| !spared.contains(pid))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::exec::MockRunner;
    use crate::paths::Locations;
    use std::sync::Arc;
    use tempfile::tempdir;

    const INFO_PLIST: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<plist version="1.0">
<dict>
	<key>CFBundleIdentifier</key>
	<string>com.todesktop.230313mzl4w4u92</string>
	<key>CFBundleVersion</key>
	<string>2410</string>
	<key>CFBundleShortVersionString</key>
	<string>0.42.3</string>
</dict>
</plist>
"#;

    fn setup(base: &Path) -> (Context, Arc<MockRunner>) {
        let mock = Arc::new(MockRunner::new());
        let ctx = Context::new(Locations::rooted_at(base), Config::default(), mock.clone());
        (ctx, mock)
    }

    #[test]
    fn test_version_from_plist_text() {
        let tmp = tempdir().unwrap();
        let (ctx, _) = setup(tmp.path());
        let bundle = default_bundle_path(&ctx);
        std::fs::create_dir_all(bundle.join("Contents")).unwrap();
        std::fs::write(bundle.join("Contents/Info.plist"), INFO_PLIST).unwrap();

        let app = inspect(&ctx);
        assert!(app.is_present());
        assert_eq!(app.version.as_deref(), Some("0.42.3"));
    }

    #[test]
    fn test_version_prefers_plutil() {
        let mock = MockRunner::new();
        mock.stdout("plutil", &["-extract"], "1.2.0\n");
        assert_eq!(
            read_version(&mock, Path::new("/nowhere/App.app")).as_deref(),
            Some("1.2.0")
        );
    }

    #[test]
    fn test_absent_application() {
        let tmp = tempdir().unwrap();
        let (ctx, _) = setup(tmp.path());
        let app = inspect(&ctx);
        assert!(!app.is_present());
        assert_eq!(app.version_label(), "unknown");
    }

    #[test]
    fn test_locate_via_spotlight() {
        let tmp = tempdir().unwrap();
        let (ctx, mock) = setup(tmp.path());
        let elsewhere = tmp.path().join("home/Applications/Cursor.app");
        std::fs::create_dir_all(&elsewhere).unwrap();
        mock.stdout("mdfind", &[], &format!("{}\n", elsewhere.display()));

        assert_eq!(locate(&ctx), Some(elsewhere));
    }

    #[test]
    fn test_terminate_only_when_running() {
        let tmp = tempdir().unwrap();
        let (ctx, mock) = setup(tmp.path());
        mock.fail("pgrep", &[], 1, "");
        assert!(!terminate_running(&ctx).value);
        assert!(!mock.was_called("kill", &[]));

        mock.stdout("pgrep", &[], "4242\n");
        let out = terminate_running(&ctx);
        assert!(out.value && out.is_clean());
        assert!(mock.was_called("pgrep", &["-f", "Cursor.app/Contents/MacOS/"]));
        assert!(mock.was_called("kill", &["-TERM", "4242"]));
    }

    #[test]
    fn test_terminate_never_signals_itself() {
        let tmp = tempdir().unwrap();
        let (ctx, mock) = setup(tmp.path());
        let me = std::process::id();
        let parent = std::os::unix::process::parent_id();
        mock.stdout("pgrep", &[], &format!("{me}\n{parent}\n"));

        let out = terminate_running(&ctx);
        assert!(!out.value);
        assert!(!mock.was_called("kill", &[]));

        mock.stdout("pgrep", &[], &format!("{me}\n5150\n"));
        assert!(terminate_running(&ctx).value);
        let kills = mock.calls_to("kill");
        assert_eq!(kills.len(), 1);
        assert_eq!(kills[0].args, vec!["-TERM", "5150"]);
    }

    #[test]
    fn test_running_pids_skips_noise() {
        assert_eq!(running_pids("12\n\n 34 \nabc\n", &[34]), vec![12]);
    }
}
