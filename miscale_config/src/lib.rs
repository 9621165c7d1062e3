#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
//! Config schema and capture parsing for the scale decoder.
//!
//! - `Config` and its sections are deserialized from TOML and validated. Every
//!   section is optional; an empty file yields the defaults.
//! - The capture CSV loader enforces headers and decodes hex payloads so that a
//!   recorded BLE session can be replayed offline.
use miscale_traits::Uuid;
use miscale_traits::gatt::parse_characteristic;
use serde::Deserialize;

/// Firmware layout selection as written in TOML.
#[derive(Debug, Deserialize, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ProfileName {
    /// Probe the layouts on the first in-range frame and lock the winner.
    #[default]
    Auto,
    /// Weight at offset 1, 5 g resolution, impedance at offset 9.
    Mi2,
    /// Weight at offset 2, 10 g resolution, impedance at offset 11.
    Centigram,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct DecoderCfg {
    pub profile: ProfileName,
    pub min_weight_kg: f32,
    pub max_weight_kg: f32,
}

impl Default for DecoderCfg {
    fn default() -> Self {
        Self {
            profile: ProfileName::Auto,
            min_weight_kg: 5.0,
            max_weight_kg: 300.0,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct StabilizationCfg {
    /// Readings older than this (relative to the newest) are pruned.
    pub horizon_ms: u64,
    /// Minimum number of stable readings before accepting.
    pub min_readings: usize,
    /// Minimum time covered by the stable readings.
    pub min_span_ms: u64,
    /// Max-minus-min spread must stay strictly below this.
    pub tolerance_kg: f32,
    /// Notifications from different characteristics closer than this are one event.
    pub dedup_window_ms: u64,
}

impl Default for StabilizationCfg {
    fn default() -> Self {
        Self {
            horizon_ms: 3000,
            min_readings: 3,
            min_span_ms: 1500,
            tolerance_kg: 0.1,
            dedup_window_ms: 200,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct SessionCfg {
    /// Hard cap on one weighing session.
    pub timeout_ms: u64,
    /// Hand back the most recent reading as a degraded result on timeout.
    pub fallback_on_timeout: bool,
    /// How long a runner waits for one notification before re-checking the deadline.
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

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct UserCfg {
    pub height_cm: f32,
}

impl Default for UserCfg {
    fn default() -> Self {
        Self { height_cm: 170.0 }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct EstimatorCfg {
    /// Muscle-mass coefficient of the basal metabolism heuristic, 15..=25.
    pub bmr_muscle_coeff: f32,
    /// Weight change below this is reported as a steady trend.
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

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct Logging {
    pub file: Option<String>,  // path to .log (JSON lines)
    pub level: Option<String>, // "info","debug"
    /// Log rotation policy: "never" | "daily" | "hourly" (default: never)
    pub rotation: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub decoder: DecoderCfg,
    pub stabilization: StabilizationCfg,
    pub session: SessionCfg,
    pub user: UserCfg,
    pub estimator: EstimatorCfg,
    pub logging: Logging,
}

pub fn load_toml(s: &str) -> Result<Config, toml::de::Error> {
    toml::from_str::<Config>(s)
}

impl Config {
    pub fn validate(&self) -> eyre::Result<()> {
        // Decoder
        let d = &self.decoder;
        if !(d.min_weight_kg.is_finite() && d.max_weight_kg.is_finite()) {
            eyre::bail!("decoder weight bounds must be finite");
        }
        if d.min_weight_kg <= 0.0 {
            eyre::bail!("decoder.min_weight_kg must be > 0");
        }
        if d.max_weight_kg <= d.min_weight_kg {
            eyre::bail!("decoder.max_weight_kg must be greater than decoder.min_weight_kg");
        }

        // Stabilization
        let s = &self.stabilization;
        if s.horizon_ms == 0 {
            eyre::bail!("stabilization.horizon_ms must be >= 1");
        }
        if s.min_readings < 2 {
            eyre::bail!("stabilization.min_readings must be >= 2");
        }
        if s.min_span_ms > s.horizon_ms {
            eyre::bail!("stabilization.min_span_ms must not exceed stabilization.horizon_ms");
        }
        if !(s.tolerance_kg.is_finite() && s.tolerance_kg > 0.0) {
            eyre::bail!("stabilization.tolerance_kg must be > 0");
        }
        if s.dedup_window_ms >= s.horizon_ms {
            eyre::bail!("stabilization.dedup_window_ms must be below stabilization.horizon_ms");
        }

        // Session
        if self.session.timeout_ms == 0 {
            eyre::bail!("session.timeout_ms must be >= 1");
        }
        if self.session.timeout_ms > 10 * 60 * 1000 {
            eyre::bail!("session.timeout_ms is unreasonably large (>10min)");
        }
        if self.session.poll_ms == 0 {
            eyre::bail!("session.poll_ms must be >= 1");
        }

        // User
        let h = self.user.height_cm;
        if !(50.0..=250.0).contains(&h) {
            eyre::bail!("user.height_cm must be in [50, 250]");
        }

        // Estimator
        let c = self.estimator.bmr_muscle_coeff;
        if !(15.0..=25.0).contains(&c) {
            eyre::bail!("estimator.bmr_muscle_coeff must be in [15, 25]");
        }
        let t = self.estimator.trend_threshold_kg;
        if !t.is_finite() || t < 0.0 {
            eyre::bail!("estimator.trend_threshold_kg must be >= 0");
        }

        // Logging
        if let Some(r) = self.logging.rotation.as_deref()
            && !matches!(r, "never" | "daily" | "hourly")
        {
            eyre::bail!("logging.rotation must be one of never|daily|hourly");
        }

        Ok(())
    }
}

/// Capture CSV schema, one BLE notification per row.
///
/// Expected headers:
/// t_ms,characteristic,payload
///
/// Example:
/// t_ms,characteristic,payload
/// 0,2a9c,00b036
/// 250,2a9c,20b036000000000000f4010000
#[derive(Debug, Deserialize, Clone)]
pub struct CaptureRow {
    pub t_ms: u64,
    pub characteristic: String,
    pub payload: String,
}

/// A decoded capture row: arrival offset, characteristic and payload bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapturedFrame {
    pub t_ms: u64,
    pub characteristic: Uuid,
    pub payload: Vec<u8>,
}

impl TryFrom<CaptureRow> for CapturedFrame {
    type Error = eyre::Report;
    fn try_from(row: CaptureRow) -> Result<Self, Self::Error> {
        let characteristic = parse_characteristic(&row.characteristic)
            .ok_or_else(|| eyre::eyre!("invalid characteristic id '{}'", row.characteristic))?;
        let compact: String = row
            .payload
            .chars()
            .filter(|c| !c.is_whitespace() && *c != ':')
            .collect();
        let payload = hex::decode(&compact)
            .map_err(|e| eyre::eyre!("invalid hex payload '{}': {}", row.payload, e))?;
        Ok(Self {
            t_ms: row.t_ms,
            characteristic,
            payload,
        })
    }
}

/// Load a recorded session. Rows must be ordered by `t_ms` (arrival order).
pub fn load_capture_csv(path: &std::path::Path) -> eyre::Result<Vec<CapturedFrame>> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(|e| eyre::eyre!("open capture CSV {:?}: {}", path, e))?;

    // Enforce exact headers
    let headers = rdr
        .headers()
        .map_err(|e| eyre::eyre!("read CSV headers {:?}: {}", path, e))?
        .clone();
    let expected = ["t_ms", "characteristic", "payload"];
    let actual: Vec<String> = headers.iter().map(|s| s.to_string()).collect();
    if actual != expected {
        eyre::bail!(
            "capture CSV must have headers 't_ms,characteristic,payload', got: {}",
            actual.join(",")
        );
    }

    let mut frames: Vec<CapturedFrame> = Vec::new();
    for (idx, rec) in rdr.deserialize::<CaptureRow>().enumerate() {
        let row = match rec {
            Ok(row) => row,
            Err(e) => eyre::bail!("invalid CSV row {}: {}", idx + 2, e),
        };
        let frame = CapturedFrame::try_from(row)
            .map_err(|e| eyre::eyre!("invalid CSV row {}: {}", idx + 2, e))?;
        if let Some(prev) = frames.last()
            && frame.t_ms < prev.t_ms
        {
            eyre::bail!(
                "capture rows must be in arrival order: row {} goes back in time",
                idx + 2
            );
        }
        frames.push(frame);
    }

    Ok(frames)
}
