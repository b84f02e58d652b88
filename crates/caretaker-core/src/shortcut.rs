//! Desktop shortcut to the installed application.

use crate::app;
use crate::context::Context;
use crate::error::Result;
use crate::outcome::Outcome;
use std::path::PathBuf;

/// Symlink `~/Desktop/<Name>.app` to the installed bundle.
///
/// Returns `None` with a warning if the application is not installed, or if
/// something other than a symlink already occupies the shortcut path.
pub fn create_desktop_shortcut(ctx: &Context) -> Result<Outcome<Option<PathBuf>>> {
    let Some(bundle) = app::locate(ctx) else {
        let mut out = Outcome::clean(None);
        out.warn(
            "shortcut",
            format!("{} is not installed, run a clean install first", ctx.config.app.name),
        );
        return Ok(out);
    };

    let desktop = ctx.locations.desktop_dir();
    std::fs::create_dir_all(&desktop)?;
    let link = desktop.join(ctx.config.app.bundle_file_name());

    match std::fs::read_link(&link) {
        Ok(target) if target == bundle => return Ok(Outcome::clean(Some(link))),
        Ok(_) => std::fs::remove_file(&link)?,
        Err(_) if link.exists() => {
            let mut out = Outcome::clean(None);
            out.warn(
                "shortcut",
                format!("{} exists and is not a shortcut, leaving it alone", link.display()),
            );
            return Ok(out);
        }
        Err(_) => {}
    }

    std::os::unix::fs::symlink(&bundle, &link)?;
    tracing::info!(link = %link.display(), target = %bundle.display(), "desktop shortcut created");
    Ok(Outcome::clean(Some(link)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::exec::MockRunner;
    use crate::paths::Locations;
    use std::sync::Arc;
    use tempfile::tempdir;

    #[test]
    fn test_shortcut_lifecycle() {
        let tmp = tempdir().unwrap();
        let ctx = Context::new(
            Locations::rooted_at(tmp.path()),
            Config::default(),
            Arc::new(MockRunner::new()),
        );

        let missing = create_desktop_shortcut(&ctx).unwrap();
        assert_eq!(missing.value, None);
        assert!(!missing.is_clean());

        let bundle = app::default_bundle_path(&ctx);
        std::fs::create_dir_all(bundle.join("Contents")).unwrap();

        let made = create_desktop_shortcut(&ctx).unwrap();
        let link = made.value.unwrap();
        assert_eq!(std::fs::read_link(&link).unwrap(), bundle);

        // Idempotent
        let again = create_desktop_shortcut(&ctx).unwrap();
        assert_eq!(again.value, Some(link));
    }
}
