//! The weighing session state machine (`ScaleSession`).
//!
//! Folds decoded frames into the stabilization window, enforces the session
//! timeout, and hands the accepted weight to the estimator.

use std::sync::Arc;
use std::time::{Duration, Instant};

use miscale_traits::{Clock, RawFrame};

use crate::composition::{
    AcceptedWeight, BodyCompositionEstimator, FinalizedMeasurement, MeasurementQuality,
};
use crate::config::{DecoderCfg, SessionCfg, StabilizationCfg};
use crate::error::{Result, ScaleError};
use crate::fixed_point::{grams_to_kg_centi, kg_to_grams};
use crate::frame::{FirmwareProfile, ProfileProbe, WeightLimits};
use crate::status::{SessionOutcome, SessionState, SessionStatus};
use crate::util::span_ms;
use crate::window::{Admission, Reading, StabilizationWindow};

/// Accepted body height range for BMI, in centimetres.
pub const HEIGHT_RANGE_CM: std::ops::RangeInclusive<f32> = 50.0..=250.0;

/// Frame counters since the session object was built.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionStats {
    pub frames: u64,
    /// Frames the decoder rejected (too short, out of range).
    pub dropped: u64,
    pub duplicates: u64,
    pub removals: u64,
}

/// One connected scale's weighing session.
///
/// Owned by the caller; there is no global state. Frames must be fed in delivery order.
pub struct ScaleSession {
    pub(crate) limits: WeightLimits,
    pub(crate) session: SessionCfg,
    pub(crate) estimator: BodyCompositionEstimator,
    pub(crate) probe: ProfileProbe,
    pub(crate) window: StabilizationWindow,
    pub(crate) clock: Arc<dyn Clock + Send + Sync>,

    pub(crate) state: SessionState,
    pub(crate) started_at: Option<Instant>,
    pub(crate) height_cm: f32,
    pub(crate) last_reading_kg: Option<f32>,
    pub(crate) last_impedance: Option<u16>,
    pub(crate) previous_kg: Option<f32>,
    pub(crate) stats: SessionStats,
}

impl core::fmt::Debug for ScaleSession {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ScaleSession")
            .field("state", &self.state)
            .field("profile", &self.probe.locked())
            .field("readings", &self.window.len())
            .field("previous_kg", &self.previous_kg)
            .finish_non_exhaustive()
    }
}

impl ScaleSession {
    pub(crate) fn from_parts(
        decoder: &DecoderCfg,
        stabilization: &StabilizationCfg,
        session: SessionCfg,
        estimator: BodyCompositionEstimator,
        clock: Arc<dyn Clock + Send + Sync>,
    ) -> Self {
        Self {
            limits: WeightLimits {
                min_kg: decoder.min_weight_kg,
                max_kg: decoder.max_weight_kg,
            },
            session,
            estimator,
            probe: ProfileProbe::new(decoder.profile),
            window: StabilizationWindow::new(stabilization),
            clock,
            state: SessionState::Idle,
            started_at: None,
            height_cm: 170.0,
            last_reading_kg: None,
            last_impedance: None,
            previous_kg: None,
            stats: SessionStats::default(),
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Firmware profile decoding this device's frames, once fixed or probed.
    pub fn profile(&self) -> Option<FirmwareProfile> {
        self.probe.locked()
    }

    pub fn stats(&self) -> SessionStats {
        self.stats
    }

    pub fn session_cfg(&self) -> &SessionCfg {
        &self.session
    }

    /// Weight of the last stabilized measurement, used for the trend.
    pub fn previous_weight_kg(&self) -> Option<f32> {
        self.previous_kg
    }

    /// Seed the trend baseline, e.g. from stored history.
    pub fn set_previous_weight_kg(&mut self, kg: Option<f32>) {
        self.previous_kg = kg.filter(|w| w.is_finite());
    }

    /// Forget the probed firmware profile (a different scale connected).
    pub fn reset_device(&mut self) {
        self.probe.reset();
    }

    /// Begin collecting. Fails while another session is collecting.
    pub fn start_session(&mut self, height_cm: f32) -> Result<()> {
        if self.state == SessionState::Collecting {
            return Err(eyre::Report::new(ScaleError::SessionInProgress));
        }
        if !HEIGHT_RANGE_CM.contains(&height_cm) {
            return Err(eyre::Report::new(ScaleError::InvalidHeight(height_cm)));
        }
        self.reset_window();
        self.height_cm = height_cm;
        self.started_at = Some(self.clock.now());
        self.state = SessionState::Collecting;
        tracing::info!(
            height_cm,
            timeout_ms = self.session.timeout_ms,
            "weighing session started"
        );
        Ok(())
    }

    /// Abort the collecting session. Idempotent: returns `None` when nothing was collecting.
    pub fn cancel_session(&mut self) -> Option<SessionOutcome> {
        let was_collecting = self.state == SessionState::Collecting;
        self.reset_window();
        self.started_at = None;
        self.state = SessionState::Idle;
        if was_collecting {
            tracing::info!("weighing session cancelled");
            Some(SessionOutcome::Cancelled)
        } else {
            None
        }
    }

    /// Time left before the session times out. A derived view; it never drives state.
    pub fn remaining(&self) -> Option<Duration> {
        self.remaining_at(self.clock.now())
    }

    fn remaining_at(&self, now: Instant) -> Option<Duration> {
        if self.state != SessionState::Collecting {
            return None;
        }
        let started = self.started_at?;
        let elapsed = span_ms(started, now);
        Some(Duration::from_millis(
            self.session.timeout_ms.saturating_sub(elapsed),
        ))
    }

    fn deadline_passed(&self, now: Instant) -> bool {
        self.remaining_at(now).is_some_and(|d| d.is_zero())
    }

    /// Enforce the timeout without a frame. Returns the outcome if the session just ended.
    pub fn poll(&mut self) -> Option<SessionOutcome> {
        let now = self.clock.now();
        if self.deadline_passed(now) {
            Some(self.finish_timeout())
        } else {
            None
        }
    }

    /// Fold one notification into the session.
    ///
    /// The deadline is checked against the frame's arrival stamp, so a frame that arrived
    /// in time still counts when it is handled after the deadline.
    pub fn handle_frame(&mut self, frame: &RawFrame) -> SessionStatus {
        self.stats.frames += 1;
        let now = frame.received_at;

        if self.state != SessionState::Collecting {
            let preview_kg = self
                .probe
                .decode(frame, &self.limits)
                .filter(|c| !c.is_weight_removed)
                .map(|c| c.weight_kg);
            return SessionStatus::Idle { preview_kg };
        }

        if self.deadline_passed(now) {
            return SessionStatus::Finished(self.finish_timeout());
        }

        let Some(candidate) = self.probe.decode(frame, &self.limits) else {
            self.stats.dropped += 1;
            return self.collecting();
        };

        if candidate.is_weight_removed {
            self.stats.removals += 1;
            tracing::debug!(weight_kg = candidate.weight_kg, "weight removed; window cleared");
            self.reset_window();
            return self.collecting();
        }

        let reading = Reading {
            grams: kg_to_grams(candidate.weight_kg),
            at: candidate.captured_at,
            characteristic: candidate.characteristic,
        };
        if self.window.push(reading) == Admission::Duplicate {
            self.stats.duplicates += 1;
            return self.collecting();
        }
        self.last_reading_kg = Some(candidate.weight_kg);
        if candidate.impedance_ohms.is_some() {
            self.last_impedance = candidate.impedance_ohms;
        }

        if let Some(conv) = self.window.converged() {
            let accepted = AcceptedWeight {
                weight_kg: grams_to_kg_centi(conv.mean_grams),
                impedance_ohms: self.last_impedance,
                quality: MeasurementQuality::Stabilized,
                sample_count: conv.count,
            };
            let m = self.finalize(accepted);
            self.previous_kg = Some(m.weight_kg);
            self.state = SessionState::Stabilized;
            self.reset_window();
            tracing::info!(
                weight_kg = m.weight_kg,
                bmi = m.bmi,
                samples = conv.count,
                span_ms = conv.span_ms,
                "measurement stabilized"
            );
            return SessionStatus::Finished(SessionOutcome::Stabilized(m));
        }

        self.collecting()
    }

    fn collecting(&self) -> SessionStatus {
        SessionStatus::Collecting {
            readings: self.window.len(),
        }
    }

    fn finalize(&self, accepted: AcceptedWeight) -> FinalizedMeasurement {
        self.estimator.finalize(
            accepted,
            self.height_cm,
            self.previous_kg,
            self.clock.utc_now(),
        )
    }

    fn finish_timeout(&mut self) -> SessionOutcome {
        let fallback = if self.session.fallback_on_timeout {
            self.last_reading_kg.map(|kg| {
                self.finalize(AcceptedWeight {
                    weight_kg: kg,
                    impedance_ohms: self.last_impedance,
                    quality: MeasurementQuality::SingleSample,
                    sample_count: 1,
                })
            })
        } else {
            None
        };
        match &fallback {
            Some(m) => tracing::warn!(
                weight_kg = m.weight_kg,
                "session timed out; using most recent reading"
            ),
            None => tracing::warn!("session timed out; no measurement captured"),
        }
        self.state = SessionState::TimedOut;
        self.reset_window();
        SessionOutcome::TimedOut { fallback }
    }

    fn reset_window(&mut self) {
        self.window.clear();
        self.last_reading_kg = None;
        self.last_impedance = None;
    }
}
