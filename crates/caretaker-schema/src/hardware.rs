//! Hardware profile and the optimization tier it selects.
//!
//! Detection lives in `caretaker-core`; this module only holds the closed set
//! of outcomes so every consumer matches on variants instead of comparing
//! brand strings.

use serde::{Deserialize, Serialize};
use std::fmt;

/// CPU vendor family as far as optimization is concerned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Vendor {
    /// Apple-designed ARM SoC (M-series).
    AppleSilicon,
    /// Anything else, including Intel Macs and undetectable hardware.
    Other,
}

/// Result of hardware detection for the current machine.
///
/// Computed fresh on every run and never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(tag = "vendor", rename_all = "snake_case")]
pub enum HardwareProfile {
    /// Apple Silicon, with the chip generation when it could be read
    /// (`M3 Pro` yields `Some(3)`).
    AppleSilicon {
        /// Chip generation number, absent if the chip name had no digits.
        generation: Option<u32>,
    },
    /// Non-Apple-Silicon or inconclusive detection.
    #[default]
    Other,
}

impl HardwareProfile {
    /// Vendor family of this profile.
    pub fn vendor(&self) -> Vendor {
        match self {
            Self::AppleSilicon { .. } => Vendor::AppleSilicon,
            Self::Other => Vendor::Other,
        }
    }

    /// Chip generation, only ever present for Apple Silicon.
    pub fn generation(&self) -> Option<u32> {
        match self {
            Self::AppleSilicon { generation } => *generation,
            Self::Other => None,
        }
    }

    /// The optimization tier this hardware qualifies for.
    ///
    /// # Example
    ///
    /// ```
    /// use caretaker_schema::{HardwareProfile, OptimizationTier};
    ///
    /// let m3 = HardwareProfile::AppleSilicon { generation: Some(3) };
    /// assert_eq!(m3.tier(), OptimizationTier::AppleSiliconAdvanced);
    /// assert_eq!(HardwareProfile::Other.tier(), OptimizationTier::Standard);
    /// ```
    pub fn tier(&self) -> OptimizationTier {
        match self {
            Self::AppleSilicon { generation: Some(g) }
                if *g >= OptimizationTier::ADVANCED_MIN_GENERATION =>
            {
                OptimizationTier::AppleSiliconAdvanced
            }
            Self::AppleSilicon { .. } => OptimizationTier::AppleSiliconBase,
            Self::Other => OptimizationTier::Standard,
        }
    }
}

impl fmt::Display for HardwareProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AppleSilicon {
                generation: Some(g),
            } => write!(f, "Apple Silicon (M{g})"),
            Self::AppleSilicon { generation: None } => write!(f, "Apple Silicon (unknown generation)"),
            Self::Other => write!(f, "Other (non-Apple-Silicon)"),
        }
    }
}

/// Named bundle of settings keys gated by hardware profile.
///
/// `AppleSiliconAdvanced` is strictly additive over `AppleSiliconBase`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OptimizationTier {
    /// Conservative defaults for non-Apple-Silicon machines.
    Standard,
    /// GPU/Metal enablement for every Apple Silicon generation.
    AppleSiliconBase,
    /// Base plus power management, larger GPU heap, and ML acceleration.
    AppleSiliconAdvanced,
}

impl OptimizationTier {
    /// Lowest Apple Silicon generation that qualifies for the advanced tier.
    pub const ADVANCED_MIN_GENERATION: u32 = 3;

    /// Whether this tier targets Apple Silicon at all.
    pub fn is_apple_silicon(self) -> bool {
        !matches!(self, Self::Standard)
    }

    /// Whether the advanced block applies.
    pub fn is_advanced(self) -> bool {
        matches!(self, Self::AppleSiliconAdvanced)
    }

    /// Stable identifier used in logs and artifacts.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Standard => "standard",
            Self::AppleSiliconBase => "apple-silicon-base",
            Self::AppleSiliconAdvanced => "apple-silicon-advanced",
        }
    }
}

impl fmt::Display for OptimizationTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tier_selection() {
        let cases = [
            (HardwareProfile::Other, OptimizationTier::Standard),
            (
                HardwareProfile::AppleSilicon { generation: None },
                OptimizationTier::AppleSiliconBase,
            ),
            (
                HardwareProfile::AppleSilicon {
                    generation: Some(1),
                },
                OptimizationTier::AppleSiliconBase,
            ),
            (
                HardwareProfile::AppleSilicon {
                    generation: Some(2),
                },
                OptimizationTier::AppleSiliconBase,
            ),
            (
                HardwareProfile::AppleSilicon {
                    generation: Some(3),
                },
                OptimizationTier::AppleSiliconAdvanced,
            ),
            (
                HardwareProfile::AppleSilicon {
                    generation: Some(4),
                },
                OptimizationTier::AppleSiliconAdvanced,
            ),
        ];
        for (profile, expected) in cases {
            assert_eq!(profile.tier(), expected, "profile {profile:?}");
        }
    }

    #[test]
    fn test_other_has_no_generation() {
        assert_eq!(HardwareProfile::Other.generation(), None);
        assert_eq!(HardwareProfile::Other.vendor(), Vendor::Other);
    }

    #[test]
    fn test_profile_serializes_tagged() {
        let json = serde_json::to_string(&HardwareProfile::AppleSilicon {
            generation: Some(2),
        })
        .unwrap();
        assert_eq!(json, r#"{"vendor":"apple_silicon","generation":2}"#);
    }
}
