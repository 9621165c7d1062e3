//! Shared seams between the BLE transport and the measurement decoder.
//!
//! The transport side produces [`RawFrame`]s through [`FrameSource`]; the decoder
//! side never initiates reads of its own. Time flows through [`Clock`] so that
//! sessions can be driven deterministically in tests and replays.
pub mod clock;
pub mod gatt;

use std::time::{Duration, Instant};

pub use clock::{Clock, ManualClock, MonotonicClock};
pub use uuid::Uuid;

/// One BLE notification payload, exactly as delivered by the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawFrame {
    /// Characteristic that emitted the notification.
    pub characteristic: Uuid,
    pub payload: Vec<u8>,
    /// Arrival time on the monotonic clock of the receiving side.
    pub received_at: Instant,
}

impl RawFrame {
    pub fn new(characteristic: Uuid, payload: impl Into<Vec<u8>>, received_at: Instant) -> Self {
        Self {
            characteristic,
            payload: payload.into(),
            received_at,
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.payload.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.payload.is_empty()
    }
}

/// Push-style notification source.
///
/// `Ok(None)` means no notification arrived within `timeout`; it is not an error.
/// Errors are transport failures (disconnect, adapter gone) and end the session loop.
pub trait FrameSource {
    fn next_frame(
        &mut self,
        timeout: Duration,
    ) -> Result<Option<RawFrame>, Box<dyn std::error::Error + Send + Sync>>;
}

impl<T: FrameSource + ?Sized> FrameSource for Box<T> {
    fn next_frame(
        &mut self,
        timeout: Duration,
    ) -> Result<Option<RawFrame>, Box<dyn std::error::Error + Send + Sync>> {
        (**self).next_frame(timeout)
    }
}
