//! Tiered performance optimization.
//!
//! The engine owns a fixed set of settings-document keys. Applying a tier
//! rewrites exactly those keys and leaves every other key where it was.
//! Apple Silicon tiers also get an activation script that writes the same
//! flags into the OS preference store; the advanced block is only ever
//! emitted on top of the base block.

use crate::context::Context;
use crate::error::Result;
use crate::exec::Invocation;
use crate::outcome::Outcome;
use crate::shared_state;
use caretaker_schema::{HardwareProfile, OptimizationTier, SettingsDocument};
use serde_json::{Value, json};
use std::fmt;
use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

pub const KEY_HARDWARE_ACCELERATION: &str = "enable-hardware-acceleration";
pub const KEY_GPU_RASTERIZATION: &str = "enable-gpu-rasterization";
pub const KEY_WEBGPU: &str = "enable-webgpu";
pub const KEY_ANGLE_BACKEND: &str = "use-angle";
pub const KEY_IGNORE_GPU_BLOCKLIST: &str = "ignore-gpu-blocklist";
pub const KEY_ZERO_COPY: &str = "enable-zero-copy";
pub const KEY_DYNAMIC_POWER: &str = "enable-dynamic-power-management";
pub const KEY_GPU_HEAP_MB: &str = "gpu-heap-size-mb";
pub const KEY_NEURAL_ENGINE: &str = "enable-neural-engine";

/// Every settings key the optimizer may write or remove.
pub const OWNED_KEYS: [&str; 9] = [
    KEY_HARDWARE_ACCELERATION,
    KEY_GPU_RASTERIZATION,
    KEY_WEBGPU,
    KEY_ANGLE_BACKEND,
    KEY_IGNORE_GPU_BLOCKLIST,
    KEY_ZERO_COPY,
    KEY_DYNAMIC_POWER,
    KEY_GPU_HEAP_MB,
    KEY_NEURAL_ENGINE,
];

pub const ACTIVATION_SCRIPT: &str = "activate-optimizations.sh";
pub const PRELOAD_SCRIPT: &str = "preload-optimizations.sh";
pub const STANDARD_SCRIPT: &str = "standard-optimizations.sh";

/// Preference-store entries written by the activation script, as
/// `(key, defaults type flag, value)`.
const BASE_PREFS: [(&str, &str, &str); 4] = [
    ("EnableHardwareAcceleration", "-bool", "true"),
    ("UseMetalRenderer", "-bool", "true"),
    ("EnableWebGPU", "-bool", "true"),
    ("GPURasterization", "-bool", "true"),
];

const ADVANCED_PREFS: [(&str, &str, &str); 3] = [
    ("DynamicPowerManagement", "-bool", "true"),
    ("GPUResourceHeapMB", "-int", "4096"),
    ("NeuralEngineAcceleration", "-bool", "true"),
];

const STANDARD_PREFS: [(&str, &str, &str); 2] = [
    ("EnableHardwareAcceleration", "-bool", "true"),
    ("GPURasterization", "-bool", "false"),
];

fn pref_table(tier: OptimizationTier) -> Vec<(&'static str, &'static str, &'static str)> {
    match tier {
        OptimizationTier::Standard => STANDARD_PREFS.to_vec(),
        OptimizationTier::AppleSiliconBase => BASE_PREFS.to_vec(),
        OptimizationTier::AppleSiliconAdvanced => {
            BASE_PREFS.iter().chain(&ADVANCED_PREFS).copied().collect()
        }
    }
}

/// Every preference-store key any tier may have written.
fn all_pref_keys() -> Vec<&'static str> {
    let mut keys: Vec<&str> = BASE_PREFS
        .iter()
        .chain(&ADVANCED_PREFS)
        .chain(&STANDARD_PREFS)
        .map(|(k, _, _)| *k)
        .collect();
    keys.sort_unstable();
    keys.dedup();
    keys
}

/// Settings-document keys for a tier. Advanced is Base plus extras.
pub fn tier_settings(tier: OptimizationTier) -> Vec<(&'static str, Value)> {
    let mut settings = match tier {
        OptimizationTier::Standard => {
            return vec![
                (KEY_HARDWARE_ACCELERATION, json!(true)),
                (KEY_GPU_RASTERIZATION, json!(false)),
                (KEY_WEBGPU, json!(false)),
                (KEY_ANGLE_BACKEND, json!("default")),
            ];
        }
        OptimizationTier::AppleSiliconBase | OptimizationTier::AppleSiliconAdvanced => vec![
            (KEY_HARDWARE_ACCELERATION, json!(true)),
            (KEY_GPU_RASTERIZATION, json!(true)),
            (KEY_WEBGPU, json!(true)),
            (KEY_ANGLE_BACKEND, json!("metal")),
            (KEY_IGNORE_GPU_BLOCKLIST, json!(true)),
            (KEY_ZERO_COPY, json!(true)),
        ],
    };
    if tier.is_advanced() {
        settings.extend([
            (KEY_DYNAMIC_POWER, json!(true)),
            (KEY_GPU_HEAP_MB, json!(4096)),
            (KEY_NEURAL_ENGINE, json!(true)),
        ]);
    }
    settings
}

/// Merge the tier for `profile` into `doc`.
///
/// Owned keys already present are updated in place, owned keys the tier does
/// not use are removed, and keys the optimizer does not own are untouched.
pub fn apply_profile(profile: &HardwareProfile, mut doc: SettingsDocument) -> SettingsDocument {
    let settings = tier_settings(profile.tier());
    for key in OWNED_KEYS {
        if !settings.iter().any(|(k, _)| *k == key) {
            doc.remove(key);
        }
    }
    for (key, value) in settings {
        doc.insert(key, value);
    }
    doc
}

/// Remove every optimizer-owned key from `doc`.
pub fn reset_profile(mut doc: SettingsDocument) -> SettingsDocument {
    for key in OWNED_KEYS {
        doc.remove(key);
    }
    doc
}

/// Activation script for Apple Silicon tiers.
///
/// Always carries the base block; the advanced block only for generation 3+.
pub fn activation_script(bundle_id: &str, profile: &HardwareProfile) -> String {
    let mut out = String::from("#!/bin/bash\n# Apple Silicon optimizations\nset -e\n\n");
    out.push_str(&format!("# Base ({profile})\n"));
    push_prefs(&mut out, bundle_id, &BASE_PREFS);

    if profile.tier().is_advanced() {
        out.push_str("\n# Advanced (M3 and newer)\n");
        push_prefs(&mut out, bundle_id, &ADVANCED_PREFS);
    }
    out
}

/// Launcher that applies the activation script, then opens the app.
pub fn preload_script(app_name: &str, defaults_dir: &Path) -> String {
    format!(
        "#!/bin/bash\n\
         # Re-apply optimizations and launch {app_name}\n\
         source \"{dir}/{ACTIVATION_SCRIPT}\"\n\
         export METAL_DEVICE_WRAPPER_TYPE=1\n\
         open -a \"{app_name}\" --args --use-angle=metal --enable-gpu-rasterization\n",
        dir = defaults_dir.display(),
    )
}

/// Conservative defaults for non-Apple-Silicon machines.
pub fn standard_script(bundle_id: &str) -> String {
    let mut out = String::from(
        "#!/bin/bash\n# Standard optimizations: keep hardware acceleration, no GPU rasterization\nset -e\n\n",
    );
    push_prefs(&mut out, bundle_id, &STANDARD_PREFS);
    out
}

fn push_prefs(out: &mut String, bundle_id: &str, prefs: &[(&str, &str, &str)]) {
    for (key, kind, value) in prefs {
        out.push_str(&format!("defaults write {bundle_id} {key} {kind} {value}\n"));
    }
}

/// Read-back of the active optimization keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusReport {
    pub hardware_acceleration: bool,
    pub webgpu: bool,
    pub metal: bool,
    pub advanced: bool,
}

/// Summarize what `doc` currently enables. Informational only.
pub fn report_status(doc: &SettingsDocument) -> StatusReport {
    StatusReport {
        hardware_acceleration: doc.get_bool(KEY_HARDWARE_ACCELERATION).unwrap_or(false),
        webgpu: doc.get_bool(KEY_WEBGPU).unwrap_or(false),
        metal: doc.get_str(KEY_ANGLE_BACKEND) == Some("metal"),
        advanced: doc.get_bool(KEY_DYNAMIC_POWER).unwrap_or(false),
    }
}

impl fmt::Display for StatusReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = |on: bool| if on { "enabled" } else { "disabled" };
        writeln!(f, "Hardware acceleration: {}", state(self.hardware_acceleration))?;
        writeln!(f, "WebGPU: {}", state(self.webgpu))?;
        write!(f, "Metal: {}", state(self.metal))?;
        if self.advanced {
            write!(f, "\nAdvanced tier: enabled")?;
        }
        Ok(())
    }
}

fn write_script(path: &Path, content: &str) -> std::io::Result<()> {
    fs::write(path, content)?;
    fs::set_permissions(path, fs::Permissions::from_mode(0o775))
}

/// Write the tier's artifacts into `config/defaults`, removing the other tier's.
fn write_artifacts(ctx: &Context, profile: &HardwareProfile) -> std::io::Result<Vec<PathBuf>> {
    let dir = ctx.locations.defaults_dir();
    fs::create_dir_all(&dir)?;
    let bundle_id = &ctx.config.app.bundle_id;

    let wanted: Vec<(&str, String)> = if profile.tier().is_apple_silicon() {
        vec![
            (ACTIVATION_SCRIPT, activation_script(bundle_id, profile)),
            (PRELOAD_SCRIPT, preload_script(&ctx.config.app.name, &dir)),
        ]
    } else {
        vec![(STANDARD_SCRIPT, standard_script(bundle_id))]
    };

    for name in [ACTIVATION_SCRIPT, PRELOAD_SCRIPT, STANDARD_SCRIPT] {
        if !wanted.iter().any(|(n, _)| *n == name) {
            crate::io::fsops::remove_path(&dir.join(name))?;
        }
    }

    let mut written = Vec::new();
    for (name, content) in wanted {
        let path = dir.join(name);
        write_script(&path, &content)?;
        written.push(path);
    }
    Ok(written)
}

/// Point the application's private settings file at the shared document.
///
/// A regular file already there is moved to `<path>.bak` first. Returns
/// `false` if the link was already correct.
pub fn link_private_settings(ctx: &Context) -> Result<bool> {
    let private = ctx.config.private_settings_path(&ctx.locations);
    let shared = ctx.locations.settings_path();

    if let Ok(target) = fs::read_link(&private) {
        if target == shared {
            return Ok(false);
        }
        fs::remove_file(&private)?;
    } else if private.exists() {
        let backup = private.with_extension("json.bak");
        fs::rename(&private, &backup)?;
        tracing::info!(backup = %backup.display(), "moved private settings aside");
    }

    if let Some(parent) = private.parent() {
        fs::create_dir_all(parent)?;
    }
    std::os::unix::fs::symlink(&shared, &private)?;
    Ok(true)
}

/// Apply the tier for `profile` end to end.
///
/// Persisting the settings document is the only fatal step; artifacts,
/// preference-store writes and the private link degrade to warnings.
pub fn optimize(ctx: &Context, profile: &HardwareProfile) -> Result<Outcome<StatusReport>> {
    let mut outcome = Outcome::clean(());
    outcome.absorb(shared_state::ensure_shared_state(ctx)?);
    if shared_state::repair_settings_document(&ctx.locations)? {
        outcome.warn("optimize", "settings document was invalid and has been reset");
    }

    let tier = profile.tier();
    tracing::info!(tier = tier.as_str(), "applying optimization tier");
    ctx.reporter.step("Optimizing", tier.as_str());

    let doc = apply_profile(profile, shared_state::load_settings(&ctx.locations)?);
    shared_state::write_settings(&ctx.locations, &doc)?;

    match write_artifacts(ctx, profile) {
        Ok(paths) => {
            for p in paths {
                tracing::debug!(artifact = %p.display(), "wrote optimization artifact");
            }
        }
        Err(e) => outcome.warn("optimize", format!("could not write artifacts: {e}")),
    }

    let bundle_id = &ctx.config.app.bundle_id;
    for (key, kind, value) in pref_table(tier) {
        let inv = Invocation::new("defaults").args(["write", bundle_id.as_str(), key, kind, value]);
        if let Err(e) = ctx.runner.run_checked(&inv) {
            outcome.warn("optimize", format!("preference {key} not written: {e}"));
        }
    }

    if let Err(e) = link_private_settings(ctx) {
        outcome.warn("optimize", format!("could not link private settings: {e}"));
    }

    Ok(outcome.map(|()| report_status(&doc)))
}

/// Undo [`optimize`]: drop owned keys, preference entries, and artifacts.
pub fn reset(ctx: &Context) -> Result<Outcome<()>> {
    let mut outcome = Outcome::clean(());
    let loc = &ctx.locations;
    if shared_state::repair_settings_document(loc)? {
        outcome.warn("optimize reset", "settings document was invalid and has been reset");
    }

    let doc = reset_profile(shared_state::load_settings(loc)?);
    shared_state::write_settings(loc, &doc)?;

    for key in all_pref_keys() {
        let inv = Invocation::new("defaults").args(["delete", ctx.config.app.bundle_id.as_str(), key]);
        // Exit 1 just means the key was never written
        match ctx.runner.run(&inv) {
            Ok(out) if !out.success() => tracing::debug!(key, "preference not present"),
            Err(e) => outcome.warn("optimize reset", format!("defaults unavailable: {e}")),
            Ok(_) => {}
        }
    }

    let dir = loc.defaults_dir();
    for name in [ACTIVATION_SCRIPT, PRELOAD_SCRIPT, STANDARD_SCRIPT] {
        if let Err(e) = crate::io::fsops::remove_path(&dir.join(name)) {
            outcome.warn("optimize reset", format!("could not remove {name}: {e}"));
        }
    }
    Ok(outcome)
}
