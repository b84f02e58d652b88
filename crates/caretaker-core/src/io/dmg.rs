//! DMG handling via hdiutil

use crate::exec::{CommandRunner, Invocation};
use anyhow::{Context, Result, bail};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Delay between forced detach attempts.
const DETACH_RETRY_DELAY: Duration = Duration::from_millis(500);

/// Check that an image exists, is big enough, and passes `hdiutil verify`.
///
/// Returns the problem as a plain message; the caller decides whether it
/// means "missing" or "corrupted".
pub fn verify(runner: &dyn CommandRunner, dmg_path: &Path, min_bytes: u64) -> Result<()> {
    let meta = std::fs::metadata(dmg_path)
        .with_context(|| format!("Cannot stat {}", dmg_path.display()))?;

    if !meta.is_file() {
        bail!("{} is not a regular file", dmg_path.display());
    }
    if meta.len() <= min_bytes {
        bail!(
            "image is only {} bytes (expected more than {min_bytes}), download is likely truncated",
            meta.len()
        );
    }

    let out = runner
        .run(&Invocation::new("hdiutil").arg("verify").path_arg(dmg_path))
        .context("Failed to execute hdiutil")?;
    if !out.success() {
        bail!("hdiutil verify failed: {}", out.failure_summary());
    }
    Ok(())
}

/// A mounted DMG. Dropping it detaches the volume if that has not happened yet.
#[derive(Debug)]
pub struct Mount<'r> {
    path: PathBuf,
    runner: &'r dyn CommandRunner,
    attached: bool,
}

impl Mount<'_> {
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Detach the volume.
    ///
    /// Tries a plain detach first and falls back to `-force`. Returns
    /// whether the forced retry was needed; errors only if both failed.
    /// Either way the volume is not detached again on drop.
    pub fn detach(&mut self) -> Result<bool> {
        if !self.attached {
            return Ok(false);
        }
        self.attached = false;
        detach(self.runner, &self.path)
    }
}

impl Drop for Mount<'_> {
    fn drop(&mut self) {
        if self.attached {
            if let Err(e) = detach(self.runner, &self.path) {
                tracing::warn!(mount = %self.path.display(), error = %e, "failed to detach on cleanup");
            }
        }
    }
}

/// Attach a DMG file without opening a Finder window and return its mount point
pub fn attach<'r>(runner: &'r dyn CommandRunner, dmg_path: &Path) -> Result<Mount<'r>> {
    let out = runner
        .run(
            &Invocation::new("hdiutil")
                .args(["attach", "-nobrowse", "-readonly"])
                .path_arg(dmg_path),
        )
        .context("Failed to execute hdiutil")?;

    if !out.success() {
        bail!("hdiutil attach failed: {}", out.failure_summary());
    }

    let path = parse_mount_point(&out.stdout)
        .context("Could not find mount point in hdiutil output")?;
    tracing::info!(mount = %path.display(), "image attached");

    Ok(Mount {
        path,
        runner,
        attached: true,
    })
}

/// Mount point from `hdiutil attach` output.
///
/// Format: `/dev/diskXsY <TAB> <TYPE> <TAB> <MOUNTPOINT>`; only the line for
/// the mounted partition has a third column.
fn parse_mount_point(stdout: &str) -> Option<PathBuf> {
    stdout.lines().find_map(|line| {
        let last = line.rsplit('\t').next()?.trim();
        (line.starts_with("/dev/") && last.starts_with('/') && !last.starts_with("/dev/"))
            .then(|| PathBuf::from(last))
    })
}

/// Detach a volume, retrying once with `-force` (busy resource).
///
/// Returns `true` if the forced retry was needed.
pub fn detach(runner: &dyn CommandRunner, mount_point: &Path) -> Result<bool> {
    let plain = Invocation::new("hdiutil").arg("detach").path_arg(mount_point);
    if runner.run(&plain).is_ok_and(|o| o.success()) {
        return Ok(false);
    }

    tracing::warn!(mount = %mount_point.display(), "detach failed, retrying with -force");
    std::thread::sleep(DETACH_RETRY_DELAY);

    let forced = plain.arg("-force");
    match runner.run(&forced) {
        Ok(o) if o.success() => Ok(true),
        Ok(o) => bail!(
            "Failed to detach {}: {}",
            mount_point.display(),
            o.failure_summary()
        ),
        Err(e) => bail!("Failed to detach {}: {e}", mount_point.display()),
    }
}
