use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use crate::buckets::{normalize, DEFAULT_LATENCY_BUCKETS};
use crate::error::Result;
use crate::registry::{FamilySnapshot, MetricKind, Registry, Sample};
use crate::time::since_ms;
use crate::value::AtomicF64;

use super::{Desc, Family};

pub(crate) struct HistogramState {
    bounds: Arc<[f64]>,
    // Cumulative: buckets[i] counts observations <= bounds[i].
    buckets: Box<[AtomicU64]>,
    count: AtomicU64,
    sum: AtomicF64,
}

impl HistogramState {
    fn new(bounds: Arc<[f64]>) -> Self {
        let buckets = bounds.iter().map(|_| AtomicU64::new(0)).collect();
        Self {
            bounds,
            buckets,
            count: AtomicU64::new(0),
            sum: AtomicF64::default(),
        }
    }

    fn observe(&self, v: f64) {
        self.count.fetch_add(1, Ordering::Relaxed);
        self.sum.add(v);
        // Widest bucket first, so a concurrent snapshot reading narrow to wide
        // never sees a narrower bucket ahead of a wider one or of `count`.
        for (le, bucket) in self.bounds.iter().zip(self.buckets.iter()).rev() {
            if v <= *le {
                bucket.fetch_add(1, Ordering::Release);
            }
        }
    }

    fn sample(&self) -> Sample {
        let buckets = self
            .bounds
            .iter()
            .zip(self.buckets.iter())
            .map(|(le, b)| (*le, b.load(Ordering::Acquire)))
            .collect();
        Sample::Histogram {
            buckets,
            count: self.count.load(Ordering::Relaxed),
            sum: self.sum.get(),
        }
    }
}

/// One histogram series, bound to a label tuple.
#[derive(Clone)]
pub struct Histogram {
    state: Arc<HistogramState>,
}

impl Histogram {
    /// Record one observation of `v`.
    pub fn observe(&self, v: f64) {
        self.state.observe(v);
    }

    /// Record the milliseconds elapsed since `start`.
    pub fn observe_since(&self, start: Instant) {
        self.observe(since_ms(start));
    }

    /// Total observations.
    pub fn count(&self) -> u64 {
        self.state.count.load(Ordering::Relaxed)
    }

    /// Sum of all observed values.
    pub fn sum(&self) -> f64 {
        self.state.sum.get()
    }

    /// `(upper bound, cumulative count)` pairs, without the `+Inf` bucket.
    pub fn buckets(&self) -> Vec<(f64, u64)> {
        match self.state.sample() {
            Sample::Histogram { buckets, .. } => buckets,
            Sample::Value(_) => Vec::new(),
        }
    }
}

/// Cumulative distributions partitioned by label values.
#[derive(Clone)]
pub struct HistogramVec {
    inner: Arc<Family<HistogramState>>,
    bounds: Arc<[f64]>,
}

impl HistogramVec {
    /// `buckets: None` uses [`DEFAULT_LATENCY_BUCKETS`].
    pub fn new(
        registry: &Registry,
        name: &str,
        help: &str,
        label_names: &[&str],
        buckets: Option<&[f64]>,
    ) -> Result<Self> {
        let desc = Desc::new(name, help, label_names, &["le"])?;
        let bounds = normalize(buckets.unwrap_or(DEFAULT_LATENCY_BUCKETS))?;
        let vec = Self {
            inner: Arc::new(Family::new(desc)),
            bounds: bounds.into(),
        };
        registry.register(vec.clone())?;
        Ok(vec)
    }

    /// Registered metric name.
    pub fn name(&self) -> &str {
        &self.inner.desc().name
    }

    /// Label keys, in the order values are passed.
    pub fn label_names(&self) -> &[String] {
        &self.inner.desc().label_names
    }

    /// Upper bounds after normalization, without `+Inf`.
    pub fn bounds(&self) -> &[f64] {
        &self.bounds
    }

    /// Number of label tuples seen so far.
    pub fn series_count(&self) -> usize {
        self.inner.len()
    }

    /// Handle bound to one series, created if missing.
    pub fn with_label_values(&self, values: &[&str]) -> Result<Histogram> {
        let bounds = Arc::clone(&self.bounds);
        let state = self
            .inner
            .get_or_create(values, move || HistogramState::new(bounds))?;
        Ok(Histogram { state })
    }

    /// Record `v` in the series selected by `values`. Every bucket whose
    /// bound is at least `v` is incremented.
    pub fn observe(&self, v: f64, values: &[&str]) -> Result<()> {
        self.with_label_values(values)?.observe(v);
        Ok(())
    }

    /// Record the milliseconds elapsed since `start` in the selected series.
    pub fn observe_since(&self, start: Instant, values: &[&str]) -> Result<()> {
        self.with_label_values(values)?.observe_since(start);
        Ok(())
    }

    pub(crate) fn snapshot(&self) -> FamilySnapshot {
        self.inner.snapshot(MetricKind::Histogram, HistogramState::sample)
    }
}
