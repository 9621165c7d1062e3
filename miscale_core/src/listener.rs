//! Background notification listener.
//!
//! Spawns a thread that owns the `FrameSource` and forwards every frame over a
//! bounded channel in arrival order. A full channel applies backpressure instead of
//! dropping frames. A transport error is forwarded once and ends the thread.
//!
//! Each `FrameListener` spawns exactly one thread that is shut down and joined
//! when the listener is dropped.
use crossbeam_channel as xch;
use miscale_traits::{FrameSource, RawFrame};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use crate::error::ScaleError;
use crate::transport_error::map_transport_error;

/// How long a blocked send waits before re-checking the shutdown flag.
const SEND_RETRY: Duration = Duration::from_millis(20);

pub struct FrameListener {
    rx: xch::Receiver<Result<RawFrame, ScaleError>>,
    /// Shutdown flag for immediate response (atomic for lock-free check)
    shutdown: Arc<AtomicBool>,
    /// Join handle for graceful thread cleanup
    join_handle: Option<std::thread::JoinHandle<()>>,
}

impl FrameListener {
    /// Spawn the listener thread. `read_timeout` bounds each `next_frame` call and thus
    /// how long shutdown may take; `capacity` is the channel bound (at least 1).
    pub fn spawn<S: FrameSource + Send + 'static>(
        mut source: S,
        read_timeout: Duration,
        capacity: usize,
    ) -> Self {
        let (tx, rx) = xch::bounded(capacity.max(1));
        let shutdown = Arc::new(AtomicBool::new(false));
        let shutdown_clone = shutdown.clone();

        let join_handle = std::thread::spawn(move || {
            loop {
                if shutdown_clone.load(Ordering::Relaxed) {
                    tracing::debug!("listener thread received shutdown signal");
                    break;
                }

                let item = match source.next_frame(read_timeout) {
                    Ok(Some(frame)) => Ok(frame),
                    Ok(None) => continue,
                    Err(e) => Err(map_transport_error(&*e)),
                };
                let fatal = item.is_err();

                let mut pending = item;
                loop {
                    match tx.send_timeout(pending, SEND_RETRY) {
                        Ok(()) => break,
                        Err(xch::SendTimeoutError::Timeout(back)) => {
                            if shutdown_clone.load(Ordering::Relaxed) {
                                tracing::trace!("listener thread exiting cleanly");
                                return;
                            }
                            pending = back;
                        }
                        Err(xch::SendTimeoutError::Disconnected(_)) => {
                            tracing::debug!("listener consumer disconnected, exiting thread");
                            return;
                        }
                    }
                }

                if fatal {
                    tracing::debug!("transport error forwarded, listener stopping");
                    break;
                }
            }
            tracing::trace!("listener thread exiting cleanly");
        });

        Self {
            rx,
            shutdown,
            join_handle: Some(join_handle),
        }
    }

    /// Wait up to `timeout` for the next frame.
    ///
    /// `Ok(None)` means nothing arrived in time. After a transport error has been
    /// delivered, later calls report `ScaleError::Disconnected`.
    pub fn recv_timeout(&self, timeout: Duration) -> Result<Option<RawFrame>, ScaleError> {
        match self.rx.recv_timeout(timeout) {
            Ok(Ok(frame)) => Ok(Some(frame)),
            Ok(Err(e)) => Err(e),
            Err(xch::RecvTimeoutError::Timeout) => Ok(None),
            Err(xch::RecvTimeoutError::Disconnected) => Err(ScaleError::Disconnected),
        }
    }

    /// Frames already queued, without waiting.
    pub fn pending(&self) -> usize {
        self.rx.len()
    }
}

impl Drop for FrameListener {
    fn drop(&mut self) {
        self.shutdown.store(true, Ordering::Relaxed);

        // The thread exits between reads, after the current `next_frame` returns
        // (bounded by the read timeout), or within one send retry when blocked.
        if let Some(handle) = self.join_handle.take() {
            match handle.join() {
                Ok(()) => {
                    tracing::trace!("listener thread joined successfully");
                }
                Err(e) => {
                    tracing::warn!(?e, "listener thread panicked during shutdown");
                }
            }
        }
    }
}
