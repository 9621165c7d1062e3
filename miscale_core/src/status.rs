//! Session state and the per-step status returned to callers.

use crate::composition::FinalizedMeasurement;

/// Lifecycle of one weighing.
///
/// `Stabilized` and `TimedOut` are terminal until the next `start_session`; in those
/// states frames are treated like `Idle`. Cancelling returns to `Idle`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    Idle,
    Collecting,
    Stabilized,
    TimedOut,
}

/// How a session ended.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionOutcome {
    Stabilized(FinalizedMeasurement),
    /// `fallback` carries the most recent reading as a single-sample measurement when
    /// fallback is enabled and anything was seen.
    TimedOut {
        fallback: Option<FinalizedMeasurement>,
    },
    Cancelled,
}

impl SessionOutcome {
    pub fn measurement(&self) -> Option<&FinalizedMeasurement> {
        match self {
            Self::Stabilized(m) => Some(m),
            Self::TimedOut { fallback } => fallback.as_ref(),
            Self::Cancelled => None,
        }
    }
}

/// Public status of a single step of the session.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionStatus {
    /// No session is collecting. Carries the decoded weight as a live preview, if any.
    Idle { preview_kg: Option<f32> },
    /// Keep going; not converged yet.
    Collecting { readings: usize },
    /// The session just ended.
    Finished(SessionOutcome),
}
