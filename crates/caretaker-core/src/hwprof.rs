//! Hardware profile detection.
//!
//! The CPU brand string is the primary signal. Its format has changed across
//! macOS releases (and Rosetta reports an Intel string), so an `arm64`
//! machine with an inconclusive brand falls back to the chip name reported
//! by `system_profiler`.

use crate::exec::{CommandRunner, Invocation};
use caretaker_schema::HardwareProfile;
use regex::Regex;
use std::sync::LazyLock;

static APPLE_CHIP: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"Apple M(\d+)?").unwrap_or_else(|e| unreachable!("static regex: {e}"))
});

static CHIP_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^\s*(?:Chip|Processor Name):\s*(.+)$")
        .unwrap_or_else(|e| unreachable!("static regex: {e}"))
});

/// Classify from raw signals.
///
/// `hw_description` is consulted only when the brand string is inconclusive
/// and `arch` is `arm64`.
pub fn classify(brand: &str, arch: &str, hw_description: Option<&str>) -> HardwareProfile {
    if let Some(profile) = from_chip_name(brand) {
        return profile;
    }
    if arch.trim() == "arm64" {
        if let Some(profile) = hw_description.and_then(chip_name).and_then(from_chip_name) {
            return profile;
        }
    }
    HardwareProfile::Other
}

fn from_chip_name(name: &str) -> Option<HardwareProfile> {
    let caps = APPLE_CHIP.captures(name)?;
    let generation = caps.get(1).and_then(|m| m.as_str().parse().ok());
    Some(HardwareProfile::AppleSilicon { generation })
}

fn chip_name(description: &str) -> Option<&str> {
    CHIP_LINE
        .captures(description)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().trim())
}

fn read(runner: &dyn CommandRunner, inv: &Invocation) -> Option<String> {
    match runner.run(inv) {
        Ok(out) if out.success() => Some(out.stdout.trim().to_string()),
        Ok(out) => {
            tracing::debug!(command = %inv, reason = %out.failure_summary(), "probe failed");
            None
        }
        Err(e) => {
            tracing::debug!(command = %inv, error = %e, "probe failed");
            None
        }
    }
}

/// Detect the profile of the current machine. Never fails; inconclusive
/// signals yield [`HardwareProfile::Other`].
pub fn detect_profile(runner: &dyn CommandRunner) -> HardwareProfile {
    let brand = read(
        runner,
        &Invocation::new("sysctl").args(["-n", "machdep.cpu.brand_string"]),
    )
    .unwrap_or_default();
    let arch = read(runner, &Invocation::new("uname").arg("-m")).unwrap_or_default();

    let description = if from_chip_name(&brand).is_none() && arch == "arm64" {
        read(
            runner,
            &Invocation::new("system_profiler").arg("SPHardwareDataType"),
        )
    } else {
        None
    };

    let profile = classify(&brand, &arch, description.as_deref());
    tracing::info!(%brand, %arch, profile = %profile, "hardware detected");
    profile
}
