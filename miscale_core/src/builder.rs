//! Builder for `ScaleSession`.
//!
//! Every section has a default, so `ScaleSession::builder().build()` yields a session
//! with the stock parameters. Validation happens once, in `build()`.

use std::sync::Arc;

use miscale_traits::{Clock, MonotonicClock};

use crate::composition::BodyCompositionEstimator;
use crate::config::*;
use crate::core::ScaleSession;
use crate::error::{BuildError, Result};

impl ScaleSession {
    /// Start building a session.
    pub fn builder() -> ScaleSessionBuilder {
        ScaleSessionBuilder::default()
    }
}

/// Builder for `ScaleSession`. All fields are validated on `build()`.
#[derive(Default)]
pub struct ScaleSessionBuilder {
    decoder: Option<DecoderCfg>,
    stabilization: Option<StabilizationCfg>,
    session: Option<SessionCfg>,
    estimator: Option<EstimatorCfg>,
    clock: Option<Box<dyn Clock + Send + Sync>>,
    previous_kg: Option<f32>,
}

fn invalid(msg: &'static str) -> eyre::Report {
    eyre::Report::new(BuildError::InvalidConfig(msg))
}

/// Validate configuration and construct a `ScaleSession`.
fn validate_and_build(
    decoder: DecoderCfg,
    stabilization: StabilizationCfg,
    session: SessionCfg,
    estimator: EstimatorCfg,
    clock: Option<Box<dyn Clock + Send + Sync>>,
    previous_kg: Option<f32>,
) -> Result<ScaleSession> {
    // ── Validation ───────────────────────────────────────────────────────────
    if !(decoder.min_weight_kg.is_finite() && decoder.max_weight_kg.is_finite()) {
        return Err(invalid("weight limits must be finite"));
    }
    if decoder.min_weight_kg <= 0.0 {
        return Err(invalid("min_weight_kg must be > 0"));
    }
    if decoder.max_weight_kg <= decoder.min_weight_kg {
        return Err(invalid("max_weight_kg must exceed min_weight_kg"));
    }
    if stabilization.horizon_ms == 0 {
        return Err(invalid("horizon_ms must be >= 1"));
    }
    if stabilization.min_readings < 2 {
        return Err(invalid("min_readings must be >= 2"));
    }
    if stabilization.min_span_ms > stabilization.horizon_ms {
        return Err(invalid("min_span_ms must not exceed horizon_ms"));
    }
    if !(stabilization.tolerance_kg.is_finite() && stabilization.tolerance_kg > 0.0) {
        return Err(invalid("tolerance_kg must be > 0"));
    }
    if stabilization.dedup_window_ms >= stabilization.horizon_ms {
        return Err(invalid("dedup_window_ms must be below horizon_ms"));
    }
    if session.timeout_ms == 0 {
        return Err(invalid("timeout_ms must be >= 1"));
    }
    if session.poll_ms == 0 {
        return Err(invalid("poll_ms must be >= 1"));
    }
    if !(15.0..=25.0).contains(&estimator.bmr_muscle_coeff) {
        return Err(invalid("bmr_muscle_coeff must be in [15, 25]"));
    }
    if !estimator.trend_threshold_kg.is_finite() || estimator.trend_threshold_kg < 0.0 {
        return Err(invalid("trend_threshold_kg must be >= 0"));
    }

    // ── Construct ────────────────────────────────────────────────────────────
    let clock: Arc<dyn Clock + Send + Sync> = match clock {
        Some(b) => Arc::from(b),
        None => Arc::new(MonotonicClock::new()),
    };

    let mut s = ScaleSession::from_parts(
        &decoder,
        &stabilization,
        session,
        BodyCompositionEstimator::new(estimator),
        clock,
    );
    s.set_previous_weight_kg(previous_kg);
    Ok(s)
}

impl ScaleSessionBuilder {
    pub fn with_decoder(mut self, decoder: DecoderCfg) -> Self {
        self.decoder = Some(decoder);
        self
    }
    pub fn with_stabilization(mut self, stabilization: StabilizationCfg) -> Self {
        self.stabilization = Some(stabilization);
        self
    }
    pub fn with_session(mut self, session: SessionCfg) -> Self {
        self.session = Some(session);
        self
    }
    pub fn with_estimator(mut self, estimator: EstimatorCfg) -> Self {
        self.estimator = Some(estimator);
        self
    }
    /// Shorthand for a fixed or auto profile on top of the current decoder section.
    pub fn with_profile(mut self, profile: ProfileSelection) -> Self {
        let mut d = self.decoder.unwrap_or_default();
        d.profile = profile;
        self.decoder = Some(d);
        self
    }
    /// Seed the trend baseline with a previously stored weight.
    pub fn with_previous_weight(mut self, kg: f32) -> Self {
        self.previous_kg = Some(kg);
        self
    }
    /// Provide a custom clock implementation; defaults to `MonotonicClock` when not provided.
    pub fn with_clock(mut self, clock: Box<dyn Clock + Send + Sync>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Validate and build the session.
    pub fn build(self) -> Result<ScaleSession> {
        validate_and_build(
            self.decoder.unwrap_or_default(),
            self.stabilization.unwrap_or_default(),
            self.session.unwrap_or_default(),
            self.estimator.unwrap_or_default(),
            self.clock,
            self.previous_kg,
        )
    }
}

/// Build a session straight from a validated TOML config.
pub fn build_session(
    cfg: &miscale_config::Config,
    clock: Option<Box<dyn Clock + Send + Sync>>,
) -> Result<ScaleSession> {
    validate_and_build(
        DecoderCfg::from(&cfg.decoder),
        StabilizationCfg::from(&cfg.stabilization),
        SessionCfg::from(&cfg.session),
        EstimatorCfg::from(&cfg.estimator),
        clock,
        None,
    )
}
