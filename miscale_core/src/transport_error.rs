//! Maps `Box<dyn Error>` from the `FrameSource` boundary to typed `ScaleError`.
//!
//! `miscale_traits` uses `Box<dyn Error + Send + Sync>` so any BLE stack can plug in;
//! this module converts those to our typed error enum, with an optional
//! feature-gated path for `miscale_transport::TransportError` downcasting.

use crate::error::ScaleError;

/// Map a trait-boundary error to a typed `ScaleError`.
///
/// Attempts to downcast known transport error types first, then falls back
/// to string-based heuristics.
pub fn map_transport_error(e: &(dyn std::error::Error + 'static)) -> ScaleError {
    #[cfg(feature = "transport-errors")]
    {
        use miscale_transport::TransportError;
        if let Some(t) = e.downcast_ref::<TransportError>() {
            return match t {
                TransportError::Disconnected => ScaleError::Disconnected,
                TransportError::Timeout => ScaleError::Timeout,
                other => ScaleError::Transport(other.to_string()),
            };
        }
    }

    let s = e.to_string();
    let lower = s.to_lowercase();
    if lower.contains("disconnect") {
        ScaleError::Disconnected
    } else if lower.contains("timeout") || lower.contains("timed out") {
        ScaleError::Timeout
    } else {
        ScaleError::Transport(s)
    }
}
