use crate::error::{Report, Result as CoreResult, ScaleError};
use crate::listener::FrameListener;
use crate::status::{SessionOutcome, SessionStatus};
use crate::transport_error::map_transport_error;
use crate::{ScaleSession, util};
use miscale_traits::{FrameSource, RawFrame};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

/// How notifications should be pulled from the transport
#[derive(Debug, Clone, Copy)]
pub enum ListenMode {
    /// Read inside the session loop using FrameSource::next_frame(timeout)
    Direct,
    /// A background `FrameListener` owns the source; frames arrive over a bounded channel
    Threaded { capacity: usize },
}

/// Per-read wait: the poll period, cut short by the time left in the session.
#[inline]
fn read_wait(poll_ms: u64, remaining: Option<Duration>) -> Duration {
    let poll = util::poll_period(poll_ms);
    match remaining {
        Some(r) if !r.is_zero() => poll.min(r),
        _ => poll,
    }
}

/// Start a session and fold frames until it ends.
///
/// `next` yields the next frame within the given wait. `shutdown`, when set, cancels the
/// session at the next iteration. Delivered frames are judged by their arrival stamps;
/// the clock-based deadline is only polled once `next` comes back empty, so frames queued
/// by a listener are never discarded because the clock moved on while they waited.
fn drive<F>(
    session: &mut ScaleSession,
    height_cm: f32,
    shutdown: Option<&AtomicBool>,
    mut next: F,
) -> CoreResult<SessionOutcome>
where
    F: FnMut(Duration) -> Result<Option<RawFrame>, ScaleError>,
{
    session.start_session(height_cm)?;

    loop {
        if shutdown.is_some_and(|f| f.load(Ordering::Relaxed)) {
            let outcome = session
                .cancel_session()
                .unwrap_or(SessionOutcome::Cancelled);
            return Ok(outcome);
        }

        let wait = read_wait(session.session_cfg().poll_ms, session.remaining());
        match next(wait) {
            Ok(Some(frame)) => {
                if let SessionStatus::Finished(outcome) = session.handle_frame(&frame) {
                    return Ok(outcome);
                }
            }
            Ok(None) => {
                if let Some(outcome) = session.poll() {
                    return Ok(outcome);
                }
            }
            Err(e) => {
                session.cancel_session();
                tracing::error!(error = %e, "session aborted");
                return Err(Report::new(e).wrap_err("receiving notification"));
            }
        }
    }
}

/// Run one session, reading the source inside the loop.
pub fn run_session<S: FrameSource + ?Sized>(
    session: &mut ScaleSession,
    source: &mut S,
    height_cm: f32,
    shutdown: Option<&AtomicBool>,
) -> CoreResult<SessionOutcome> {
    tracing::debug!(mode = "direct", "listening");
    drive(session, height_cm, shutdown, |wait| {
        source
            .next_frame(wait)
            .map_err(|e| map_transport_error(&*e))
    })
}

/// Run one session with frames supplied by a running `FrameListener`.
pub fn run_listening(
    session: &mut ScaleSession,
    listener: &FrameListener,
    height_cm: f32,
    shutdown: Option<&AtomicBool>,
) -> CoreResult<SessionOutcome> {
    tracing::debug!(mode = "threaded", "listening");
    drive(session, height_cm, shutdown, |wait| listener.recv_timeout(wait))
}

/// Run one session to completion in the chosen mode.
pub fn run<S>(
    session: &mut ScaleSession,
    mut source: S,
    height_cm: f32,
    shutdown: Option<&AtomicBool>,
    mode: ListenMode,
) -> CoreResult<SessionOutcome>
where
    S: FrameSource + Send + 'static,
{
    match mode {
        ListenMode::Direct => run_session(session, &mut source, height_cm, shutdown),
        ListenMode::Threaded { capacity } => {
            let read_timeout = util::poll_period(session.session_cfg().poll_ms);
            let listener = FrameListener::spawn(source, read_timeout, capacity);
            run_listening(session, &listener, height_cm, shutdown)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::read_wait;
    use std::time::Duration;

    #[test]
    fn read_wait_is_poll_period_when_time_remains() {
        assert_eq!(
            read_wait(100, Some(Duration::from_secs(5))),
            Duration::from_millis(100)
        );
        assert_eq!(read_wait(100, None), Duration::from_millis(100));
    }

    #[test]
    fn read_wait_is_cut_short_near_deadline() {
        assert_eq!(
            read_wait(100, Some(Duration::from_millis(30))),
            Duration::from_millis(30)
        );
    }

    #[test]
    fn read_wait_never_zero() {
        assert_eq!(read_wait(0, Some(Duration::ZERO)), Duration::from_millis(1));
    }
}
