//! Drives the built binary against a sandboxed filesystem in mock mode.

use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use tempfile::TempDir;

const INFO_PLIST: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<plist version="1.0">
<dict>
	<key>CFBundleShortVersionString</key>
	<string>1.7.0</string>
</dict>
</plist>
"#;

/// Sandbox with every well-known location redirected into a temp dir
struct TestContext {
    _temp_dir: TempDir,
    base: PathBuf,
}

impl TestContext {
    fn new() -> Self {
        let temp_dir = TempDir::new().expect("failed to create temp dir");
        let base = temp_dir.path().canonicalize().expect("canonical temp dir");
        for dir in ["home/Library", "Applications", "tmp", "bin"] {
            std::fs::create_dir_all(base.join(dir)).expect("failed to create sandbox dir");
        }

        // Small images and fast retries
        let config_dir = base.join("Shared/caretaker/config");
        std::fs::create_dir_all(&config_dir).unwrap();
        std::fs::write(
            config_dir.join("caretaker.toml"),
            "[install]\nmin_image_bytes = 1024\n\n[retry]\nbackoff_ms = 1\n",
        )
        .unwrap();

        Self {
            _temp_dir: temp_dir,
            base,
        }
    }

    fn path(&self, rel: &str) -> PathBuf {
        self.base.join(rel)
    }

    fn caretaker(&self) -> Command {
        let mut cmd = Command::new(env!("CARGO_BIN_EXE_caretaker"));
        cmd.env("CARETAKER_SHARED_ROOT", self.path("Shared/caretaker"))
            .env("CARETAKER_APPLICATIONS_DIR", self.path("Applications"))
            .env("CARETAKER_HOME", self.path("home"))
            .env("CARETAKER_TEMP_ROOT", self.path("tmp"))
            .env("CARETAKER_CLI_BIN_DIR", self.path("bin"))
            .env("CARETAKER_NONINTERACTIVE", "1")
            .env("CARETAKER_MOCK_EXTERNAL", "1")
            .env_remove("CARETAKER_ASSUME_YES")
            .env_remove("CARETAKER_DMG")
            .env_remove("RUST_LOG");
        cmd
    }

    fn run(&self, args: &[&str]) -> Output {
        self.caretaker().args(args).output().expect("failed to run caretaker")
    }

    /// A disk image plus the volume `hdiutil attach` will report for it.
    fn stage_image(&self) -> (PathBuf, PathBuf) {
        let volume = self.path("Volumes/Cursor");
        let contents = volume.join("Cursor.app/Contents");
        std::fs::create_dir_all(contents.join("MacOS")).unwrap();
        std::fs::write(contents.join("Info.plist"), INFO_PLIST).unwrap();
        std::fs::write(contents.join("MacOS/Cursor"), "#!/bin/sh\n").unwrap();

        let dmg = self.path("home/Downloads/Cursor.dmg");
        std::fs::create_dir_all(dmg.parent().unwrap()).unwrap();
        std::fs::write(&dmg, vec![0u8; 8192]).unwrap();
        (dmg, volume)
    }
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

fn exists(path: &Path) -> bool {
    std::fs::symlink_metadata(path).is_ok()
}

#[test]
fn test_help_command() {
    let ctx = TestContext::new();
    let output = ctx.run(&["--help"]);
    assert!(output.status.success());
    assert!(stdout(&output).contains("Usage:"));
}

#[test]
fn test_no_command_in_noninteractive_mode_does_not_block() {
    let ctx = TestContext::new();
    let output = ctx.run(&[]);
    assert!(output.status.success());
    assert!(stdout(&output).contains("nothing to do"));
}

#[test]
fn test_startup_prepares_shared_state() {
    let ctx = TestContext::new();
    assert!(ctx.run(&["status"]).status.success());
    for sub in ["config", "logs", "projects", "cache", "backups"] {
        assert!(ctx.path("Shared/caretaker").join(sub).is_dir(), "{sub} missing");
    }
    assert!(ctx.path("Shared/caretaker/config/argv.json").is_file());

    let logs: Vec<_> = std::fs::read_dir(ctx.path("Shared/caretaker/logs"))
        .unwrap()
        .flatten()
        .collect();
    assert!(!logs.is_empty(), "run log was not written");
}

#[test]
fn test_install_missing_image_exits_non_zero() {
    let ctx = TestContext::new();
    let output = ctx.run(&["install", "--dmg", "/nonexistent/Cursor.dmg"]);
    assert_eq!(output.status.code(), Some(1));
    assert!(stdout(&output).contains("not found"));
    assert!(!exists(&ctx.path("Applications/Cursor.app")));
}

#[test]
fn test_install_then_uninstall() {
    let ctx = TestContext::new();
    let (dmg, volume) = ctx.stage_image();

    let output = ctx
        .caretaker()
        .env("CARETAKER_MOCK_VOLUME", &volume)
        .args(["install", "--no-project", "--dmg"])
        .arg(&dmg)
        .output()
        .unwrap();
    assert!(output.status.success(), "{}", stdout(&output));
    assert!(stdout(&output).contains("1.7.0"));
    assert!(ctx.path("Applications/Cursor.app/Contents/Info.plist").is_file());

    let status = ctx.run(&["optimize", "--status"]);
    assert!(status.status.success());
    assert!(stdout(&status).contains("Hardware acceleration"));

    // Declined without --yes
    let declined = ctx.run(&["uninstall"]);
    assert_eq!(declined.status.code(), Some(1));
    assert!(exists(&ctx.path("Applications/Cursor.app")));

    let removed = ctx.run(&["uninstall", "--yes"]);
    assert_eq!(removed.status.code(), Some(0), "{}", stdout(&removed));
    assert!(!exists(&ctx.path("Applications/Cursor.app")));
    assert!(ctx.path("Shared/caretaker/config").is_dir());
}

#[test]
fn test_residues_only_fail_when_strict() {
    let ctx = TestContext::new();
    let leftover = ctx.path("home/Library/Containers/cursor-helper");
    std::fs::create_dir_all(&leftover).unwrap();

    let lenient = ctx.run(&["uninstall", "--yes"]);
    assert_eq!(lenient.status.code(), Some(0));
    assert_eq!(stdout(&lenient).matches("cursor-helper").count(), 1);
    assert!(stdout(&lenient).contains("1 residue(s) remain"));

    let strict = ctx.run(&["uninstall", "--yes", "--strict-residue"]);
    assert_eq!(strict.status.code(), Some(2));
}

#[test]
fn test_purge_shared_removes_tree() {
    let ctx = TestContext::new();
    let output = ctx.run(&["uninstall", "--yes", "--purge-shared"]);
    assert!(output.status.success());
    assert!(!ctx.path("Shared/caretaker/config").exists());
}

#[test]
fn test_repair_backs_up_invalid_settings() {
    let ctx = TestContext::new();
    assert!(ctx.run(&["repair"]).status.success());

    let settings = ctx.path("Shared/caretaker/config/argv.json");
    std::fs::write(&settings, "{ not json").unwrap();

    // Startup only ensures the file exists; repair replaces the bad document.
    let output = ctx.run(&["repair"]);
    assert!(output.status.success());
    assert_eq!(std::fs::read_to_string(&settings).unwrap().trim(), "{}");
    let backups = std::fs::read_dir(ctx.path("Shared/caretaker/backups")).unwrap().count();
    assert_eq!(backups, 1);
}

#[test]
fn test_project_sanitized_name_needs_confirmation() {
    let ctx = TestContext::new();

    let declined = ctx.run(&["project", "test project!@#", "--toolchain", "venv"]);
    assert_eq!(declined.status.code(), Some(1));
    assert!(!ctx.path("Shared/caretaker/projects/testproject").exists());

    let accepted = ctx.run(&["--yes", "project", "test project!@#", "--toolchain", "venv"]);
    assert!(accepted.status.success(), "{}", stdout(&accepted));
    let root = ctx.path("Shared/caretaker/projects/testproject");
    assert!(root.join("src").is_dir());
    assert!(root.join(".caretaker-project.json").is_file());
}

#[test]
fn test_project_toolchain_cannot_change() {
    let ctx = TestContext::new();
    assert!(ctx.run(&["project", "api", "-t", "node"]).status.success());
    let output = ctx.run(&["project", "api", "-t", "poetry"]);
    assert_eq!(output.status.code(), Some(1));
}

#[test]
fn test_self_test_passes_in_sandbox() {
    let ctx = TestContext::new();
    let output = ctx.run(&["self-test"]);
    assert!(output.status.success(), "{}", stdout(&output));
    assert!(stdout(&output).contains("shared state"));
}

#[test]
fn test_shortcut_without_install_warns() {
    let ctx = TestContext::new();
    let output = ctx.run(&["shortcut"]);
    assert!(output.status.success());
    assert!(stdout(&output).contains("not installed"));
    assert!(!exists(&ctx.path("home/Desktop/Cursor.app")));
}

#[test]
fn test_completions() {
    let ctx = TestContext::new();
    let output = ctx.run(&["completions", "bash"]);
    assert!(output.status.success());
    assert!(stdout(&output).contains("caretaker"));
}
