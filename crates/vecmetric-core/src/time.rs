//! Elapsed-time helper for latency call sites.

use std::time::Instant;

/// Whole milliseconds elapsed since `start`, as a float ready for
/// [`HistogramVec::observe`](crate::HistogramVec::observe).
pub fn since_ms(start: Instant) -> f64 {
    start.elapsed().as_millis() as f64
}
