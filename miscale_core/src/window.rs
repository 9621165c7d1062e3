//! Stabilization window: recent readings and the convergence check.
//!
//! Readings are kept in arrival order as integer grams. Every insert prunes entries
//! older than the horizon (relative to the newest reading). Convergence looks at the
//! longest run of newest readings whose spread stays strictly below the tolerance.
//! A reading outside the tolerance ends that run, so one outlier restarts convergence;
//! the run rebuilds from the readings that follow it.

use std::collections::VecDeque;
use std::time::Instant;

use crate::config::StabilizationCfg;
use miscale_traits::Uuid;

use crate::fixed_point::{abs_diff_i32_u32, div_round_nearest_i64, kg_to_grams};
use crate::util::span_ms;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Reading {
    pub grams: i32,
    pub at: Instant,
    /// Characteristic the notification arrived on.
    pub characteristic: Uuid,
}

/// Result of offering a reading to the window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    Accepted,
    /// Same physical event seen on another characteristic; dropped.
    Duplicate,
}

/// A converged run of readings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Convergence {
    /// Mean of the run, rounded to whole grams.
    pub mean_grams: i32,
    pub count: usize,
    pub span_ms: u64,
}

#[derive(Debug, Clone)]
pub struct StabilizationWindow {
    horizon_ms: u64,
    min_readings: usize,
    min_span_ms: u64,
    tolerance_g: u32,
    dedup_window_ms: u64,
    readings: VecDeque<Reading>,
}

impl StabilizationWindow {
    pub fn new(cfg: &StabilizationCfg) -> Self {
        Self {
            horizon_ms: cfg.horizon_ms,
            min_readings: cfg.min_readings.max(1),
            min_span_ms: cfg.min_span_ms,
            tolerance_g: kg_to_grams(cfg.tolerance_kg).max(1).unsigned_abs(),
            dedup_window_ms: cfg.dedup_window_ms,
            readings: VecDeque::with_capacity(16),
        }
    }

    pub fn len(&self) -> usize {
        self.readings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.readings.is_empty()
    }

    pub fn latest(&self) -> Option<&Reading> {
        self.readings.back()
    }

    pub fn readings(&self) -> impl Iterator<Item = &Reading> {
        self.readings.iter()
    }

    pub fn clear(&mut self) {
        self.readings.clear();
    }

    /// Append a reading, dropping it if it duplicates the previous one from another
    /// characteristic, then prune everything outside the horizon.
    pub fn push(&mut self, reading: Reading) -> Admission {
        if let Some(last) = self.readings.back()
            && last.characteristic != reading.characteristic
            && span_ms(last.at, reading.at) <= self.dedup_window_ms
        {
            tracing::trace!(
                grams = reading.grams,
                characteristic = %reading.characteristic,
                "duplicate notification dropped"
            );
            return Admission::Duplicate;
        }
        self.readings.push_back(reading);
        self.prune(reading.at);
        Admission::Accepted
    }

    fn prune(&mut self, newest: Instant) {
        while let Some(front) = self.readings.front() {
            if span_ms(front.at, newest) > self.horizon_ms {
                self.readings.pop_front();
            } else {
                break;
            }
        }
    }

    /// Check the acceptance predicate against the newest readings.
    ///
    /// Walks back from the newest reading while max - min stays below the tolerance;
    /// the run converges once it holds `min_readings` readings covering `min_span_ms`.
    pub fn converged(&self) -> Option<Convergence> {
        let newest = self.readings.back()?;
        let mut lo = newest.grams;
        let mut hi = newest.grams;
        let mut sum = 0i64;
        let mut count = 0usize;
        let mut earliest = newest.at;

        for r in self.readings.iter().rev() {
            let next_lo = lo.min(r.grams);
            let next_hi = hi.max(r.grams);
            if abs_diff_i32_u32(next_hi, next_lo) >= self.tolerance_g {
                break;
            }
            lo = next_lo;
            hi = next_hi;
            sum += i64::from(r.grams);
            count += 1;
            earliest = r.at;
        }

        let span = span_ms(earliest, newest.at);
        if count < self.min_readings || span < self.min_span_ms {
            return None;
        }
        let n = i64::try_from(count).ok()?;
        let mean = div_round_nearest_i64(sum, n);
        Some(Convergence {
            mean_grams: i32::try_from(mean).ok()?,
            count,
            span_ms: span,
        })
    }
}
