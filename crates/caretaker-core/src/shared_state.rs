//! Shared-state tree and the settings document.
//!
//! Layout under the shared root:
//!
//! ```text
//! config/argv.json      settings document (664)
//! config/defaults/      optimization artifacts
//! logs/ projects/ cache/ backups/
//! ```
//!
//! Every directory is group-writable (775) and group-owned by the invoking
//! user's primary group. Nothing here deletes the tree; only uninstall with
//! an explicit purge does.

use crate::context::Context;
use crate::error::{CoreError, Result};
use crate::exec::Invocation;
use crate::heartbeat::PrivilegeHeartbeat;
use crate::io::fsops;
use crate::outcome::Outcome;
use crate::paths::{Locations, SHARED_SUBDIRS};
use caretaker_schema::SettingsDocument;
use std::fs;
use std::io::ErrorKind;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

pub const DIR_MODE: u32 = 0o775;
pub const SETTINGS_MODE: u32 = 0o664;

/// Create or repair the shared tree. Safe to call any number of times.
///
/// If the root exists but the current user cannot write to it, ownership and
/// mode are fixed through `sudo` (with the privilege heartbeat running)
/// instead of failing. Ownership problems that remain afterwards are
/// reported as warnings.
pub fn ensure_shared_state(ctx: &Context) -> Result<Outcome<()>> {
    let loc = &ctx.locations;
    let mut outcome = Outcome::clean(());

    if !is_writable(&loc.shared_root) {
        tracing::info!(root = %loc.shared_root.display(), "shared root not writable, escalating");
        ctx.reporter
            .info("Shared directory needs repair, administrator rights required");
        escalate(ctx)?;
    }

    for dir in std::iter::once(loc.shared_root.clone())
        .chain(SHARED_SUBDIRS.iter().map(|s| loc.shared_root.join(s)))
        .chain(std::iter::once(loc.defaults_dir()))
    {
        fs::create_dir_all(&dir).map_err(|e| {
            CoreError::context(
                "Failed to create shared directory",
                format!("{}: {e}", dir.display()),
            )
        })?;
        fs::set_permissions(&dir, fs::Permissions::from_mode(DIR_MODE))?;
        if let Err(e) = std::os::unix::fs::chown(&dir, None, Some(ctx.identity.gid)) {
            outcome.warn("shared-state", format!("cannot set group of {}: {e}", dir.display()));
        }
    }

    let created = ensure_settings_document(loc)?;
    if created {
        tracing::info!(path = %loc.settings_path().display(), "created empty settings document");
    }
    fs::set_permissions(loc.settings_path(), fs::Permissions::from_mode(SETTINGS_MODE))?;
    if let Err(e) = std::os::unix::fs::chown(loc.settings_path(), None, Some(ctx.identity.gid)) {
        outcome.warn("shared-state", format!("cannot set group of settings document: {e}"));
    }

    Ok(outcome)
}

/// Fix ownership and mode of the whole tree through `sudo`.
fn escalate(ctx: &Context) -> Result<()> {
    let _heartbeat = PrivilegeHeartbeat::acquire(ctx, "repair the shared directory")?;
    let root = &ctx.locations.shared_root;
    let as_root = ctx.identity.is_root();

    let steps = [
        Invocation::new("mkdir").arg("-p").path_arg(root),
        Invocation::new("chown")
            .args(["-R".to_string(), ctx.identity.owner_spec()])
            .path_arg(root),
        Invocation::new("chmod").args(["-R", "775"]).path_arg(root),
    ];
    for step in steps {
        ctx.runner.run_checked(&step.elevated(as_root))?;
    }
    Ok(())
}

/// Whether the current user can create entries in `dir`.
///
/// A missing directory counts as writable if its nearest existing ancestor is.
fn is_writable(dir: &Path) -> bool {
    let mut probe_dir = dir;
    while !probe_dir.exists() {
        match probe_dir.parent() {
            Some(p) => probe_dir = p,
            None => return false,
        }
    }
    let probe = probe_dir.join(format!(".caretaker-probe-{}", std::process::id()));
    match fs::File::create(&probe) {
        Ok(_) => {
            let _ = fs::remove_file(&probe);
            true
        }
        Err(_) => false,
    }
}

/// Create an empty-map settings document if none exists.
///
/// Returns `true` if the file was created. An existing file is never touched.
pub fn ensure_settings_document(loc: &Locations) -> Result<bool> {
    let path = loc.settings_path();
    if path.exists() {
        return Ok(false);
    }
    write_settings(loc, &SettingsDocument::new())?;
    Ok(true)
}

/// Reset an unparseable settings document.
///
/// A document that fails to parse is copied to
/// `backups/argv.json.<timestamp>.bak` and replaced with `{}`. A valid
/// document is left byte-for-byte as it was. Returns whether a repair
/// happened.
pub fn repair_settings_document(loc: &Locations) -> Result<bool> {
    let path = loc.settings_path();
    let text = match fs::read_to_string(&path) {
        Ok(t) => t,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            ensure_settings_document(loc)?;
            return Ok(false);
        }
        // Not UTF-8 is as broken as bad JSON
        Err(e) if e.kind() == ErrorKind::InvalidData => String::new(),
        Err(e) => return Err(e.into()),
    };

    match SettingsDocument::parse(&text) {
        Ok(_) => Ok(false),
        Err(e) => {
            tracing::debug!(error = %e, "settings document failed to parse");
            let backup = backup_path(loc);
            fsops::backup_file(&path, &backup)?;
            tracing::warn!(backup = %backup.display(), "settings document was invalid, reset to empty");
            write_settings(loc, &SettingsDocument::new())?;
            Ok(true)
        }
    }
}

fn backup_path(loc: &Locations) -> PathBuf {
    let stamp = chrono::Local::now().format("%Y%m%d-%H%M%S%.3f");
    loc.backups_dir().join(format!(
        "{}.{stamp}.bak",
        caretaker_schema::SETTINGS_FILE_NAME
    ))
}

/// Read and parse the settings document.
pub fn load_settings(loc: &Locations) -> Result<SettingsDocument> {
    let text = fs::read_to_string(loc.settings_path())?;
    Ok(SettingsDocument::parse(&text)?)
}

/// Persist a settings document with mode 664.
///
/// Written to a sibling temp file and renamed into place, so a reader never
/// sees a half-written document.
pub fn write_settings(loc: &Locations, doc: &SettingsDocument) -> Result<()> {
    let path = loc.settings_path();
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, doc.to_pretty_string())?;
    fs::set_permissions(&tmp, fs::Permissions::from_mode(SETTINGS_MODE))?;
    fs::rename(&tmp, &path)?;
    Ok(())
}
