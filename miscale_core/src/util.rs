//! Common time helpers for miscale_core.

use std::time::{Duration, Instant};

/// Milliseconds from `earlier` to `later`, saturating at 0 when out of order.
#[inline]
pub fn span_ms(earlier: Instant, later: Instant) -> u64 {
    let dur = later.saturating_duration_since(earlier);
    u64::try_from(dur.as_millis()).unwrap_or(u64::MAX)
}

/// Shorthand for `Duration::from_millis`, clamping 0 up to 1 ms for poll periods.
#[inline]
pub fn poll_period(ms: u64) -> Duration {
    Duration::from_millis(ms.max(1))
}
