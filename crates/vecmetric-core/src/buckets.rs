//! Histogram bucket schemes.
//!
//! Bounds are in milliseconds, finer at low latencies and coarse at the tail.

use crate::error::{MetricError, Result};

/// Default latency buckets (ms), 1ms..=100s.
pub const DEFAULT_LATENCY_BUCKETS: &[f64] = &[
    1.0, 2.0, 3.0, 4.0, 5.0, //
    6.0, 8.0, 10.0, 13.0, 16.0, //
    20.0, 25.0, 30.0, 40.0, 50.0, //
    65.0, 80.0, 100.0, 130.0, 160.0, //
    200.0, 250.0, 300.0, 400.0, 500.0, //
    650.0, 800.0, 1000.0, 2000.0, 5000.0, //
    10000.0, 20000.0, 50000.0, 100000.0,
];

/// `count` bounds starting at `start`, each `factor` times the previous.
///
/// `start` must be finite and positive, `factor` finite and greater than 1,
/// and `count` at least 1. Fails with `InvalidArgument` otherwise, or when
/// the series overflows.
pub fn exponential_buckets(start: f64, factor: f64, count: usize) -> Result<Vec<f64>> {
    check_start_count(start, count)?;
    if !factor.is_finite() || factor <= 1.0 {
        return Err(MetricError::InvalidArgument(format!(
            "exponential bucket factor must be finite and > 1, got {factor}"
        )));
    }

    let mut out = Vec::new();
    let mut next = start;
    for _ in 0..count {
        push_increasing(&mut out, next)?;
        next *= factor;
    }
    Ok(out)
}

/// `count` bounds starting at `start`, spaced `width` apart.
///
/// `start` must be finite and positive, `width` finite and positive, and
/// `count` at least 1.
pub fn linear_buckets(start: f64, width: f64, count: usize) -> Result<Vec<f64>> {
    check_start_count(start, count)?;
    if !width.is_finite() || width <= 0.0 {
        return Err(MetricError::InvalidArgument(format!(
            "linear bucket width must be finite and > 0, got {width}"
        )));
    }

    let mut out = Vec::new();
    let mut next = start;
    for _ in 0..count {
        push_increasing(&mut out, next)?;
        next += width;
    }
    Ok(out)
}

fn check_start_count(start: f64, count: usize) -> Result<()> {
    if count == 0 {
        return Err(MetricError::InvalidArgument(
            "bucket count must be at least 1".into(),
        ));
    }
    if !start.is_finite() || start <= 0.0 {
        return Err(MetricError::InvalidArgument(format!(
            "first bucket bound must be positive and finite, got {start}"
        )));
    }
    Ok(())
}

// Overflow to +Inf, or a step lost to rounding, shows up here.
fn push_increasing(out: &mut Vec<f64>, bound: f64) -> Result<()> {
    match out.last() {
        _ if !bound.is_finite() => Err(MetricError::InvalidArgument(format!(
            "bucket series overflows after {} bounds",
            out.len()
        ))),
        Some(&prev) if bound <= prev => Err(MetricError::InvalidArgument(format!(
            "bucket series stops increasing at {bound}"
        ))),
        _ => {
            out.push(bound);
            Ok(())
        }
    }
}

/// Check caller supplied bounds and collapse repeated values.
///
/// Bounds must be finite, positive and non-decreasing. The implicit `+Inf`
/// bucket is never part of the returned list.
pub(crate) fn normalize(bounds: &[f64]) -> Result<Vec<f64>> {
    if bounds.is_empty() {
        return Err(MetricError::InvalidArgument(
            "histogram needs at least one bucket".into(),
        ));
    }

    let mut out: Vec<f64> = Vec::with_capacity(bounds.len());
    for &b in bounds {
        if !b.is_finite() || b <= 0.0 {
            return Err(MetricError::InvalidArgument(format!(
                "bucket bound must be positive and finite, got {b}"
            )));
        }
        match out.last() {
            Some(&prev) if b < prev => {
                return Err(MetricError::InvalidArgument(format!(
                    "bucket bounds must be non-decreasing ({b} after {prev})"
                )));
            }
            Some(&prev) if b == prev => continue,
            _ => out.push(b),
        }
    }
    Ok(out)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn default_scheme_shape() {
        assert_eq!(DEFAULT_LATENCY_BUCKETS.len(), 34);
        assert_eq!(DEFAULT_LATENCY_BUCKETS[0], 1.0);
        assert_eq!(DEFAULT_LATENCY_BUCKETS[33], 100_000.0);
        assert!(DEFAULT_LATENCY_BUCKETS.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn exponential() {
        assert_eq!(
            Some(vec![1.0, 2.0, 4.0, 8.0, 16.0]),
            exponential_buckets(1.0, 2.0, 5).ok()
        );
        assert_eq!(Some(vec![0.5]), exponential_buckets(0.5, 10.0, 1).ok());
    }

    #[test]
    fn exponential_rejects_degenerate_input() {
        for (start, factor, count) in [
            (0.0, 2.0, 3),
            (-1.0, 2.0, 3),
            (f64::NAN, 2.0, 3),
            (1.0, 1.0, 3),
            (1.0, 0.5, 3),
            (1.0, -2.0, 3),
            (1.0, f64::INFINITY, 3),
            (1.0, 2.0, 0),
        ] {
            let err = exponential_buckets(start, factor, count).unwrap_err();
            assert_eq!(err.kind().as_str(), "INVALID_ARGUMENT", "{start} {factor} {count}");
        }
    }

    #[test]
    fn exponential_overflow_is_an_error() {
        // 2^1100 is past f64::MAX
        assert!(exponential_buckets(1.0, 2.0, 1100).is_err());
        // huge counts stop at overflow
        assert!(exponential_buckets(1.0, 2.0, usize::MAX).is_err());
    }

    #[test]
    fn linear() {
        assert_eq!(Some(vec![5.0, 10.0, 15.0]), linear_buckets(5.0, 5.0, 3).ok());
    }

    #[test]
    fn linear_rejects_degenerate_input() {
        assert!(linear_buckets(0.0, 1.0, 3).is_err());
        assert!(linear_buckets(1.0, 0.0, 3).is_err());
        assert!(linear_buckets(1.0, -1.0, 3).is_err());
        assert!(linear_buckets(1.0, f64::NAN, 3).is_err());
        assert!(linear_buckets(1.0, 1.0, 0).is_err());
        // width lost to rounding
        assert!(linear_buckets(1e20, 1.0, 2).is_err());
    }

    #[test]
    fn generated_schemes_pass_normalize() {
        let exp = exponential_buckets(0.25, 1.5, 20).unwrap();
        assert_eq!(normalize(&exp).unwrap(), exp);
        let lin = linear_buckets(10.0, 2.5, 40).unwrap();
        assert_eq!(normalize(&lin).unwrap(), lin);
    }

    #[test]
    fn normalize_dedups_and_rejects() {
        assert_eq!(normalize(&[1.0, 1.0, 2.0]).ok(), Some(vec![1.0, 2.0]));
        assert!(normalize(&[]).is_err());
        assert!(normalize(&[2.0, 1.0]).is_err());
        assert!(normalize(&[0.0, 1.0]).is_err());
        assert!(normalize(&[1.0, f64::INFINITY]).is_err());
        assert!(normalize(&[f64::NAN]).is_err());
    }
}
