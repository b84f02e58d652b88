//! Filesystem moves used by install and uninstall.

use anyhow::{Context, Result};
use std::path::Path;

/// Copy a directory tree (an `.app` bundle) to `dest`, replacing whatever was there.
///
/// Symlinks inside the bundle (frameworks' `Versions/Current`) are kept as links.
pub fn copy_bundle(src: &Path, dest: &Path) -> Result<()> {
    if dest.exists() || dest.is_symlink() {
        remove_path(dest).with_context(|| format!("Failed to replace {}", dest.display()))?;
    }
    std::fs::create_dir_all(dest)?;

    for entry in walkdir::WalkDir::new(src).min_depth(1) {
        let entry = entry?;
        let rel = entry.path().strip_prefix(src)?;
        let target = dest.join(rel);
        let ft = entry.file_type();

        if ft.is_symlink() {
            let link = std::fs::read_link(entry.path())?;
            std::os::unix::fs::symlink(link, &target)?;
        } else if ft.is_dir() {
            std::fs::create_dir_all(&target)?;
        } else {
            std::fs::copy(entry.path(), &target)
                .with_context(|| format!("Failed to copy {}", entry.path().display()))?;
        }
    }
    Ok(())
}

/// Remove a file, symlink, or directory tree. Missing paths are not an error.
pub fn remove_path(path: &Path) -> std::io::Result<()> {
    let meta = match std::fs::symlink_metadata(path) {
        Ok(m) => m,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(()),
        Err(e) => return Err(e),
    };
    if meta.is_dir() {
        std::fs::remove_dir_all(path)
    } else {
        std::fs::remove_file(path)
    }
}

/// Copy a single file to `dest`, creating parent directories.
pub fn backup_file(src: &Path, dest: &Path) -> Result<()> {
    if let Some(parent) = dest.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let opts = fs_extra::file::CopyOptions::new().overwrite(true);
    fs_extra::file::copy(src, dest, &opts)
        .with_context(|| format!("Failed to back up {}", src.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_copy_bundle_keeps_links_and_replaces_old() {
        let tmp = tempdir().unwrap();
        let src = tmp.path().join("Mount/App.app");
        std::fs::create_dir_all(src.join("Contents/MacOS")).unwrap();
        std::fs::write(src.join("Contents/MacOS/App"), "bin").unwrap();
        std::os::unix::fs::symlink("MacOS/App", src.join("Contents/Current")).unwrap();

        let dest = tmp.path().join("Applications/App.app");
        std::fs::create_dir_all(&dest).unwrap();
        std::fs::write(dest.join("stale"), "old").unwrap();

        copy_bundle(&src, &dest).unwrap();
        assert!(dest.join("Contents/MacOS/App").exists());
        assert!(dest.join("Contents/Current").is_symlink());
        assert!(!dest.join("stale").exists());
    }

    #[test]
    fn test_remove_path_variants() {
        let tmp = tempdir().unwrap();
        let dir = tmp.path().join("d");
        std::fs::create_dir_all(dir.join("nested")).unwrap();
        let file = tmp.path().join("f");
        std::fs::write(&file, "x").unwrap();

        remove_path(&dir).unwrap();
        remove_path(&file).unwrap();
        remove_path(&tmp.path().join("missing")).unwrap();
        assert!(!dir.exists() && !file.exists());
    }
}
