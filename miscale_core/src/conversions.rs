//! `From` implementations bridging `miscale_config` types to `miscale_core` types.

use crate::config::{DecoderCfg, EstimatorCfg, ProfileSelection, SessionCfg, StabilizationCfg};
use crate::frame::FirmwareProfile;

// ── ProfileSelection ─────────────────────────────────────────────────────────

impl From<miscale_config::ProfileName> for ProfileSelection {
    fn from(p: miscale_config::ProfileName) -> Self {
        match p {
            miscale_config::ProfileName::Auto => Self::Auto,
            miscale_config::ProfileName::Mi2 => Self::Fixed(FirmwareProfile::Mi2),
            miscale_config::ProfileName::Centigram => Self::Fixed(FirmwareProfile::Centigram),
        }
    }
}

// ── DecoderCfg ───────────────────────────────────────────────────────────────

impl From<&miscale_config::DecoderCfg> for DecoderCfg {
    fn from(c: &miscale_config::DecoderCfg) -> Self {
        Self {
            profile: c.profile.into(),
            min_weight_kg: c.min_weight_kg,
            max_weight_kg: c.max_weight_kg,
        }
    }
}

// ── StabilizationCfg ─────────────────────────────────────────────────────────

impl From<&miscale_config::StabilizationCfg> for StabilizationCfg {
    fn from(c: &miscale_config::StabilizationCfg) -> Self {
        Self {
            horizon_ms: c.horizon_ms,
            min_readings: c.min_readings,
            min_span_ms: c.min_span_ms,
            tolerance_kg: c.tolerance_kg,
            dedup_window_ms: c.dedup_window_ms,
        }
    }
}

// ── SessionCfg ───────────────────────────────────────────────────────────────

impl From<&miscale_config::SessionCfg> for SessionCfg {
    fn from(c: &miscale_config::SessionCfg) -> Self {
        Self {
            timeout_ms: c.timeout_ms,
            fallback_on_timeout: c.fallback_on_timeout,
            poll_ms: c.poll_ms,
        }
    }
}

// ── EstimatorCfg ─────────────────────────────────────────────────────────────

impl From<&miscale_config::EstimatorCfg> for EstimatorCfg {
    fn from(c: &miscale_config::EstimatorCfg) -> Self {
        Self {
            bmr_muscle_coeff: c.bmr_muscle_coeff,
            trend_threshold_kg: c.trend_threshold_kg,
        }
    }
}
