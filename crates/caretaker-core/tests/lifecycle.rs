//! End-to-end lifecycle against a sandboxed filesystem and scripted tools.

use caretaker_core::exec::MockRunner;
use caretaker_core::install::{self, InstallOptions, InstallOutcome, InstallState};
use caretaker_core::uninstall::{self, UninstallOptions, UninstallStatus};
use caretaker_core::{Context, Locations, hwprof, optimize, shared_state};
use caretaker_core::config::Config;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;

const INFO_PLIST: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<plist version="1.0">
<dict>
	<key>CFBundleName</key>
	<string>Cursor</string>
	<key>CFBundleShortVersionString</key>
	<string>0.42.3</string>
</dict>
</plist>
"#;

struct Sandbox {
    _tmp: TempDir,
    base: PathBuf,
    ctx: Context,
    mock: Arc<MockRunner>,
    dmg: PathBuf,
}

impl Sandbox {
    fn new() -> Self {
        let tmp = TempDir::new().unwrap();
        let base = tmp.path().canonicalize().unwrap();

        let volume = base.join("Volumes/Cursor Installer");
        let bundle = volume.join("Cursor.app/Contents");
        std::fs::create_dir_all(bundle.join("MacOS")).unwrap();
        std::fs::write(bundle.join("Info.plist"), INFO_PLIST).unwrap();
        std::fs::write(bundle.join("MacOS/Cursor"), "#!/bin/sh\n").unwrap();
        std::os::unix::fs::symlink("/Applications", volume.join("Applications")).unwrap();

        let dmg = base.join("Downloads/Cursor.dmg");
        std::fs::create_dir_all(dmg.parent().unwrap()).unwrap();
        std::fs::write(&dmg, vec![7u8; 4096]).unwrap();

        let mock = Arc::new(MockRunner::new());
        mock.stdout(
            "hdiutil",
            &["attach"],
            &format!(
                "/dev/disk5\tGUID_partition_scheme\t\n/dev/disk5s1\tApple_HFS\t{}\n",
                volume.display()
            ),
        );
        mock.stdout("sysctl", &["-n", "machdep.cpu.brand_string"], "Apple M3 Pro\n");
        mock.stdout("uname", &["-m"], "arm64\n");

        let mut config = Config::default();
        config.install.min_image_bytes = 1024;
        config.retry.backoff_ms = 1;

        let ctx = Context::new(Locations::rooted_at(&base), config, mock.clone()).with_mock(true);
        Self {
            _tmp: tmp,
            base,
            ctx,
            mock,
            dmg,
        }
    }

    fn bundle(&self) -> PathBuf {
        self.ctx.locations.applications_dir.join("Cursor.app")
    }
}

fn assert_mutation_free(dir: &Path) {
    assert!(!dir.exists() || std::fs::read_dir(dir).unwrap().next().is_none());
}

#[test]
fn test_install_optimize_uninstall() {
    let sb = Sandbox::new();

    // Install
    let outcome = install::install(&sb.ctx, &sb.dmg, InstallOptions::default());
    let InstallOutcome::Done(summary) = outcome else {
        panic!("install aborted: {outcome:?}");
    };
    assert_eq!(
        summary.trace,
        vec![
            InstallState::Idle,
            InstallState::Verifying,
            InstallState::ClosingRunningInstances,
            InstallState::Mounting,
            InstallState::Copying,
            InstallState::Unmounting,
            InstallState::Optimizing,
            InstallState::ScaffoldingDefaultProject,
            InstallState::Done,
        ]
    );
    assert!(summary.application.is_present());
    let version = summary.application.version.clone().unwrap();
    assert!(!version.is_empty());
    assert_eq!(version, "0.42.3");
    assert!(sb.bundle().join("Contents/MacOS/Cursor").exists());
    assert!(sb.mock.was_called("hdiutil", &["detach"]));
    assert!(sb.mock.was_called("xattr", &["-dr", "com.apple.quarantine"]));
    assert!(sb.ctx.locations.projects_dir().join("starter/.caretaker-project.json").exists());

    // Optimize
    let profile = hwprof::detect_profile(sb.mock.as_ref());
    assert_eq!(profile.generation(), Some(3));
    let optimized = optimize::optimize(&sb.ctx, &profile).unwrap();
    assert!(optimized.is_clean(), "{:?}", optimized.warnings);
    let doc = shared_state::load_settings(&sb.ctx.locations).unwrap();
    let status = optimize::report_status(&doc);
    assert!(status.hardware_acceleration);
    assert!(status.to_string().contains("Hardware acceleration: enabled"));

    // Uninstall
    let report = uninstall::uninstall(&sb.ctx, UninstallOptions::default());
    assert_eq!(report.status(), UninstallStatus::Success);
    assert!(!sb.bundle().exists());
    assert!(sb.ctx.locations.shared_root.exists(), "shared state survives uninstall");

    let residues = uninstall::verify_complete_removal(&sb.ctx, false);
    assert_eq!(residues.value.len(), residues.warnings.len());
}

#[test]
fn test_missing_image_leaves_applications_untouched() {
    let sb = Sandbox::new();
    std::fs::remove_file(&sb.dmg).unwrap();

    let outcome = install::install(&sb.ctx, &sb.dmg, InstallOptions::default());
    match outcome {
        InstallOutcome::Aborted { at, reason, .. } => {
            assert_eq!(at, InstallState::Verifying);
            assert_eq!(
                reason.to_string(),
                format!("disk image not found at {}", sb.dmg.display())
            );
        }
        InstallOutcome::Done(_) => panic!("install should abort"),
    }
    assert_mutation_free(&sb.ctx.locations.applications_dir);
    assert!(!sb.ctx.locations.shared_root.exists());
    assert!(!sb.mock.was_called("hdiutil", &[]));
}

#[test]
fn test_reinstall_over_existing_copy() {
    let sb = Sandbox::new();
    let first = install::install(&sb.ctx, &sb.dmg, InstallOptions::default());
    assert!(first.is_done());
    std::fs::write(sb.bundle().join("stale-file"), "old").unwrap();

    let second = install::install(
        &sb.ctx,
        &sb.dmg,
        InstallOptions {
            scaffold_default_project: false,
        },
    );
    let InstallOutcome::Done(summary) = second else {
        panic!("reinstall aborted");
    };
    assert!(summary.warnings.is_empty(), "{:?}", summary.warnings);
    assert!(!sb.bundle().join("stale-file").exists());
    assert!(sb.base.join("Volumes/Cursor Installer/Cursor.app").exists());
}

#[test]
fn test_busy_volume_only_warns() {
    let sb = Sandbox::new();
    sb.mock.respond_once(
        "hdiutil",
        &["detach"],
        caretaker_core::exec::CommandOutput::failed(16, "Resource busy"),
    );

    let InstallOutcome::Done(summary) =
        install::install(&sb.ctx, &sb.dmg, InstallOptions::default())
    else {
        panic!("a busy volume must not abort the install");
    };
    assert!(summary.warnings.iter().any(|w| w.step == "unmount"));
}
