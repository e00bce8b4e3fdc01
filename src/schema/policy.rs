//! Degrade-or-fail switches for schema imperfections

use serde::{Deserialize, Serialize};

/// What to do when the engine meets an imperfection it can work around
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Fallback {
    /// Substitute the documented fallback and log a warning
    #[default]
    Degrade,
    /// Surface the imperfection as an error
    Fail,
}

/// Policy applied by the walker and synthesizer.
///
/// The defaults reproduce the historical tool behavior:
/// cycles become empty objects, unknown types become strings and
/// unusable patterns fall back to unconstrained strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FallbackPolicy {
    #[serde(default = "default_max_depth")]
    pub max_depth: usize,
    #[serde(default)]
    pub on_cycle: Fallback,
    #[serde(default)]
    pub on_unknown_type: Fallback,
    #[serde(default)]
    pub on_invalid_pattern: Fallback,
}

fn default_max_depth() -> usize {
    32
}

impl Default for FallbackPolicy {
    fn default() -> Self {
        Self {
            max_depth: default_max_depth(),
            on_cycle: Fallback::Degrade,
            on_unknown_type: Fallback::Degrade,
            on_invalid_pattern: Fallback::Degrade,
        }
    }
}

impl FallbackPolicy {
    /// Fail on every imperfection instead of degrading
    pub fn strict() -> Self {
        Self {
            on_cycle: Fallback::Fail,
            on_unknown_type: Fallback::Fail,
            on_invalid_pattern: Fallback::Fail,
            ..Self::default()
        }
    }
}
