//! Resolution of the running tool's real install directory.

use crate::paths::normalize;
use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// Absolute directory holding the real executable, independent of how it
/// was invoked. Derived once per run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolLocation {
    dir: PathBuf,
}

impl ToolLocation {
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Resolve the location of the current process from `argv[0]`.
    pub fn current() -> Self {
        let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("/"));
        let invoked = std::env::args_os()
            .next()
            .map(PathBuf::from)
            .or_else(|| std::env::current_exe().ok())
            .unwrap_or_else(|| cwd.clone());
        resolve_self_location(&invoked, &cwd)
    }
}

/// Follow `invoked` through any chain of symlinks to the real containing
/// directory.
///
/// Relative links resolve against the directory of the link itself. The walk
/// stops when the current path is no longer a symlink, when a link points back
/// to a path already visited, or when `readlink` fails; in the last two cases
/// the most recently resolved directory is returned.
pub fn resolve_self_location(invoked: &Path, cwd: &Path) -> ToolLocation {
    let start = if invoked.components().count() == 1 && !invoked.is_absolute() {
        // Bare command name: it came from PATH, not from cwd.
        which::which(invoked).unwrap_or_else(|_| cwd.join(invoked))
    } else if invoked.is_absolute() {
        invoked.to_path_buf()
    } else {
        cwd.join(invoked)
    };

    let mut current = normalize(&start);
    let mut last_dir = parent_dir(&current);
    let mut visited = HashSet::new();
    visited.insert(current.clone());

    loop {
        let is_link = std::fs::symlink_metadata(&current)
            .map(|m| m.file_type().is_symlink())
            .unwrap_or(false);
        if !is_link {
            break;
        }

        let target = match std::fs::read_link(&current) {
            Ok(t) => t,
            Err(e) => {
                tracing::warn!(path = %current.display(), error = %e, "readlink failed, using last resolved directory");
                break;
            }
        };

        let next = if target.is_absolute() {
            normalize(&target)
        } else {
            normalize(&parent_dir(&current).join(target))
        };

        if !visited.insert(next.clone()) {
            tracing::warn!(path = %next.display(), "symlink cycle detected");
            break;
        }
        last_dir = parent_dir(&next);
        current = next;
    }

    // Canonicalize the directory so symlinked parent directories collapse
    // to the same answer.
    let dir = last_dir.canonicalize().unwrap_or(last_dir);
    ToolLocation { dir }
}

fn parent_dir(path: &Path) -> PathBuf {
    path.parent()
        .map_or_else(|| PathBuf::from("/"), Path::to_path_buf)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::os::unix::fs::symlink;
    use tempfile::tempdir;

    fn install_tool(base: &Path) -> PathBuf {
        let bin = base.join("opt/caretaker/bin");
        std::fs::create_dir_all(&bin).unwrap();
        let tool = bin.join("caretaker");
        std::fs::write(&tool, "#!/bin/sh\n").unwrap();
        tool
    }

    #[test]
    fn test_direct_symlinked_and_chained_agree() {
        let tmp = tempdir().unwrap();
        let base = tmp.path();
        let tool = install_tool(base);
        let expected = tool.parent().unwrap().canonicalize().unwrap();

        let links = base.join("links");
        std::fs::create_dir_all(&links).unwrap();
        symlink(&tool, links.join("first")).unwrap();
        symlink("first", links.join("second")).unwrap();
        symlink("../links/second", links.join("third")).unwrap();

        for invoked in [
            tool.clone(),
            links.join("first"),
            links.join("second"),
            links.join("third"),
        ] {
            let loc = resolve_self_location(&invoked, Path::new("/"));
            assert_eq!(loc.dir(), expected, "invoked via {}", invoked.display());
        }
    }

    #[test]
    fn test_relative_invocation_independent_of_cwd() {
        let tmp = tempdir().unwrap();
        let base = tmp.path();
        let tool = install_tool(base);
        let expected = tool.parent().unwrap().canonicalize().unwrap();

        let from_base = resolve_self_location(Path::new("opt/caretaker/bin/caretaker"), base);
        let from_bin = resolve_self_location(Path::new("./caretaker"), tool.parent().unwrap());
        assert_eq!(from_base.dir(), expected);
        assert_eq!(from_bin.dir(), expected);
    }

    #[test]
    fn test_symlinked_directory_collapses() {
        let tmp = tempdir().unwrap();
        let base = tmp.path();
        let tool = install_tool(base);
        let expected = tool.parent().unwrap().canonicalize().unwrap();

        symlink(tool.parent().unwrap(), base.join("alias-bin")).unwrap();
        let loc = resolve_self_location(&base.join("alias-bin/caretaker"), Path::new("/"));
        assert_eq!(loc.dir(), expected);
    }

    #[test]
    fn test_cycle_terminates() {
        let tmp = tempdir().unwrap();
        let base = tmp.path().canonicalize().unwrap();
        symlink(base.join("b"), base.join("a")).unwrap();
        symlink(base.join("a"), base.join("b")).unwrap();

        let loc = resolve_self_location(&base.join("a"), Path::new("/"));
        assert_eq!(loc.dir(), base);
    }

    #[test]
    fn test_dangling_link_falls_back_to_last_directory() {
        let tmp = tempdir().unwrap();
        let base = tmp.path().canonicalize().unwrap();
        let real_dir = base.join("real");
        std::fs::create_dir_all(&real_dir).unwrap();
        symlink(real_dir.join("missing-tool"), base.join("tool")).unwrap();

        let loc = resolve_self_location(&base.join("tool"), Path::new("/"));
        assert_eq!(loc.dir(), real_dir);
    }
}
