use std::sync::Arc;

use crate::error::{MetricError, Result};
use crate::registry::{FamilySnapshot, MetricKind, Registry, Sample};
use crate::value::AtomicF64;

use super::{Desc, Family};

/// One counter series, bound to a label tuple.
#[derive(Clone, Debug)]
pub struct Counter {
    state: Arc<AtomicF64>,
}

impl Counter {
    /// Add 1.
    pub fn inc(&self) {
        self.state.add(1.0);
    }

    /// Add `v`; counters never go down, so negative or NaN deltas are rejected.
    pub fn add(&self, v: f64) -> Result<()> {
        check_delta(v)?;
        self.state.add(v);
        Ok(())
    }

    /// Current value.
    pub fn get(&self) -> f64 {
        self.state.get()
    }
}

fn check_delta(v: f64) -> Result<()> {
    if v.is_nan() || v < 0.0 {
        return Err(MetricError::InvalidArgument(format!(
            "counter delta must not be negative, got {v}"
        )));
    }
    Ok(())
}

/// Monotonic counters partitioned by label values.
#[derive(Clone)]
pub struct CounterVec {
    inner: Arc<Family<AtomicF64>>,
}

impl CounterVec {
    /// Build the vector and register it into `registry`.
    pub fn new(registry: &Registry, name: &str, help: &str, label_names: &[&str]) -> Result<Self> {
        let desc = Desc::new(name, help, label_names, &[])?;
        let vec = Self {
            inner: Arc::new(Family::new(desc)),
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

    /// Number of label tuples seen so far.
    pub fn series_count(&self) -> usize {
        self.inner.len()
    }

    /// Handle bound to one series, created if missing. Fails with
    /// `InvalidArgument` when `values` does not match the label arity.
    pub fn with_label_values(&self, values: &[&str]) -> Result<Counter> {
        let state = self.inner.get_or_create(values, AtomicF64::default)?;
        Ok(Counter { state })
    }

    /// Add 1 to the series selected by `values`.
    pub fn inc(&self, values: &[&str]) -> Result<()> {
        self.with_label_values(values)?.inc();
        Ok(())
    }

    /// Negative deltas fail before any series is touched.
    pub fn add(&self, v: f64, values: &[&str]) -> Result<()> {
        check_delta(v)?;
        self.with_label_values(values)?.add(v)
    }

    pub(crate) fn snapshot(&self) -> FamilySnapshot {
        self.inner
            .snapshot(MetricKind::Counter, |s| Sample::Value(s.get()))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn add_rejects_negative_without_mutation() {
        let registry = Registry::new();
        let c = CounterVec::new(&registry, "hits_total", "hits", &["route"]).unwrap();

        c.add(2.5, &["/a"]).unwrap();
        let err = c.add(-1.0, &["/a"]).unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::InvalidArgument);
        assert!(c.add(f64::NAN, &["/a"]).is_err());

        assert_eq!(c.with_label_values(&["/a"]).unwrap().get(), 2.5);
    }

    #[test]
    fn negative_add_does_not_create_series() {
        let registry = Registry::new();
        let c = CounterVec::new(&registry, "hits_total", "hits", &["route"]).unwrap();

        assert!(c.add(-3.0, &["/never"]).is_err());
        assert_eq!(c.series_count(), 0);
    }

    #[test]
    fn bound_handle_shares_series() {
        let registry = Registry::new();
        let c = CounterVec::new(&registry, "jobs_total", "", &["queue"]).unwrap();
        let bound = c.with_label_values(&["mail"]).unwrap();

        bound.inc();
        c.inc(&["mail"]).unwrap();
        assert_eq!(bound.get(), 2.0);
        assert_eq!(c.series_count(), 1);
    }

    #[test]
    fn inc_checks_arity() {
        let registry = Registry::new();
        let c = CounterVec::new(&registry, "jobs_total", "", &["queue", "kind"]).unwrap();
        assert!(c.inc(&["mail"]).is_err());
        assert_eq!(c.series_count(), 0);
    }
}
