//! Configuration types for the measurement engine.
//!
//! These are the runtime configuration structs used by `ScaleSession`.
//! They are separate from the TOML-deserialized config in `miscale_config`.

use crate::frame::FirmwareProfile;

/// Which byte layout decodes a device's frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProfileSelection {
    /// Probe on the first in-range frame and lock the winner for the connection.
    #[default]
    Auto,
    /// Use one layout unconditionally.
    Fixed(FirmwareProfile),
}

/// Frame decoder configuration.
#[derive(Debug, Clone)]
pub struct DecoderCfg {
    pub profile: ProfileSelection,
    /// Lower bound of a plausible body weight (inclusive).
    pub min_weight_kg: f32,
    /// Upper bound of a plausible body weight (inclusive).
    pub max_weight_kg: f32,
}

impl Default for DecoderCfg {
    fn default() -> Self {
        Self {
            profile: ProfileSelection::Auto,
            min_weight_kg: 5.0,
            max_weight_kg: 300.0,
        }
    }
}

/// Acceptance parameters of the stabilization window.
#[derive(Debug, Clone)]
pub struct StabilizationCfg {
    /// Readings older than this, relative to the newest one, are pruned.
    pub horizon_ms: u64,
    /// Minimum number of readings that must agree.
    pub min_readings: usize,
    /// Minimum time the agreeing readings must cover.
    pub min_span_ms: u64,
    /// Spread (max - min) must stay strictly below this.
    pub tolerance_kg: f32,
    /// A reading from another characteristic closer than this to the last one is a duplicate.
    pub dedup_window_ms: u64,
}

impl Default for StabilizationCfg {
    fn default() -> Self {
        Self {
            horizon_ms: 3_000,
            min_readings: 3,
            min_span_ms: 1_500,
            tolerance_kg: 0.1,
            dedup_window_ms: 200,
        }
    }
}

/// Session lifetime configuration.
#[derive(Debug, Clone)]
pub struct SessionCfg {
    /// Hard cap on one weighing session.
    pub timeout_ms: u64,
    /// On timeout, hand back the most recent reading as a single-sample result.
    pub fallback_on_timeout: bool,
    /// Per-read wait used by runners before re-checking the deadline.
    pub poll_ms: u64,
}

impl Default for SessionCfg {
    fn default() -> Self {
        Self {
            timeout_ms: 15_000,
            fallback_on_timeout: true,
            poll_ms: 100,
        }
    }
}

/// Body-composition heuristic parameters.
#[derive(Debug, Clone)]
pub struct EstimatorCfg {
    /// Muscle-mass coefficient of the basal metabolism estimate, 15..=25.
    pub bmr_muscle_coeff: f32,
    /// Weight deltas smaller than this count as a steady trend.
    pub trend_threshold_kg: f32,
}

impl Default for EstimatorCfg {
    fn default() -> Self {
        Self {
            bmr_muscle_coeff: 15.0,
            trend_threshold_kg: 0.1,
        }
    }
}
