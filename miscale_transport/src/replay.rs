//! Replays a timed list of notifications as a `FrameSource`.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use miscale_traits::{Clock, FrameSource, RawFrame, Uuid};

use crate::error::TransportError;

/// One notification scheduled at `at_ms` after the replay starts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptedFrame {
    pub at_ms: u64,
    pub characteristic: Uuid,
    pub payload: Vec<u8>,
}

/// Delivers scripted frames at their offsets on the given clock.
///
/// Waiting goes through `Clock::sleep`, so a `ManualClock` replays instantly while a
/// `MonotonicClock` reproduces the recorded pacing. Frames with offsets in the past are
/// delivered immediately, in order.
pub struct ReplayTransport<C: Clock> {
    frames: VecDeque<ScriptedFrame>,
    clock: C,
    origin: Instant,
    disconnect_when_exhausted: bool,
}

impl<C: Clock> ReplayTransport<C> {
    pub fn new(frames: impl IntoIterator<Item = ScriptedFrame>, clock: C) -> Self {
        let origin = clock.now();
        Self {
            frames: frames.into_iter().collect(),
            clock,
            origin,
            disconnect_when_exhausted: false,
        }
    }

    /// Report `TransportError::Disconnected` once the script runs out, instead of
    /// staying silent.
    pub fn disconnect_when_exhausted(mut self, yes: bool) -> Self {
        self.disconnect_when_exhausted = yes;
        self
    }

    pub fn remaining(&self) -> usize {
        self.frames.len()
    }
}

impl<C: Clock> FrameSource for ReplayTransport<C> {
    fn next_frame(
        &mut self,
        timeout: Duration,
    ) -> Result<Option<RawFrame>, Box<dyn std::error::Error + Send + Sync>> {
        let Some(next_at) = self.frames.front().map(|f| f.at_ms) else {
            if self.disconnect_when_exhausted {
                tracing::debug!("replay exhausted; reporting disconnect");
                return Err(Box::new(TransportError::Disconnected));
            }
            self.clock.sleep(timeout);
            return Ok(None);
        };

        let now_ms = self.clock.ms_since(self.origin);
        let wait = Duration::from_millis(next_at.saturating_sub(now_ms));
        if wait > timeout {
            self.clock.sleep(timeout);
            return Ok(None);
        }
        self.clock.sleep(wait);
        let Some(f) = self.frames.pop_front() else {
            return Ok(None);
        };
        tracing::trace!(at_ms = f.at_ms, len = f.payload.len(), "replaying frame");
        Ok(Some(RawFrame::new(f.characteristic, f.payload, self.clock.now())))
    }
}
