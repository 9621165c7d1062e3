#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]
//! Measurement decoding for the Mi Body Composition Scale 2 (transport-agnostic).
//!
//! Frames arrive through `miscale_traits::FrameSource`; nothing here initiates BLE
//! reads of its own.
//!
//! ## Architecture
//!
//! - **Frame decoding**: control flags, per-firmware weight/impedance layouts and
//!   profile probing (`frame` module)
//! - **Stabilization**: time-bounded window with a spread/count/span convergence
//!   check (`window` module)
//! - **Session**: the Idle/Collecting/Stabilized/TimedOut state machine (`ScaleSession`)
//! - **Estimation**: BMI, category, approximate composition and trend (`composition`)
//! - **Runners**: direct or threaded loops driving one session to an outcome
//!
//! ## Fixed-Point Arithmetic
//!
//! The window operates in whole **grams** (`i32`), so spreads and means are exact.
//! Finalized weights are reported at 0.01 kg. See `fixed_point`.

pub mod builder;
pub mod composition;
pub mod config;
pub mod conversions;
pub mod core;
pub mod error;
pub mod fixed_point;
pub mod frame;
pub mod listener;
pub mod runner;
pub mod status;
pub mod transport_error;
pub mod util;
pub mod window;

pub use builder::{ScaleSessionBuilder, build_session};
pub use composition::{
    AcceptedWeight, BmiCategory, BodyComposition, BodyCompositionEstimator,
    FinalizedMeasurement, MeasurementQuality, WeightTrend,
};
pub use config::{DecoderCfg, EstimatorCfg, ProfileSelection, SessionCfg, StabilizationCfg};
pub use crate::core::{HEIGHT_RANGE_CM, ScaleSession, SessionStats};
pub use error::{BuildError, ScaleError};
pub use frame::{
    CandidateMeasurement, Channel, ControlFlags, FirmwareProfile, ProfileProbe, WeightLimits,
    decode_frame,
};
pub use listener::FrameListener;
pub use runner::{ListenMode, run, run_listening, run_session};
pub use status::{SessionOutcome, SessionState, SessionStatus};
pub use window::{Admission, Convergence, Reading, StabilizationWindow};
