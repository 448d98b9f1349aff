use std::sync::Arc;

use crate::error::Result;
use crate::registry::{FamilySnapshot, MetricKind, Registry, Sample};
use crate::value::AtomicF64;

use super::{Desc, Family};

/// One gauge series, bound to a label tuple.
#[derive(Clone, Debug)]
pub struct Gauge {
    state: Arc<AtomicF64>,
}

impl Gauge {
    /// Overwrite the value.
    pub fn set(&self, v: f64) {
        self.state.set(v);
    }

    /// Add `v`, which may be negative.
    pub fn add(&self, v: f64) {
        self.state.add(v);
    }

    /// Subtract `v`.
    pub fn sub(&self, v: f64) {
        self.state.add(-v);
    }

    /// Add 1.
    pub fn inc(&self) {
        self.add(1.0);
    }

    /// Subtract 1.
    pub fn dec(&self) {
        self.add(-1.0);
    }

    /// Current value.
    pub fn get(&self) -> f64 {
        self.state.get()
    }
}

/// Settable values partitioned by label values.
#[derive(Clone)]
pub struct GaugeVec {
    inner: Arc<Family<AtomicF64>>,
}

impl GaugeVec {
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

    /// Handle bound to one series, created if missing.
    pub fn with_label_values(&self, values: &[&str]) -> Result<Gauge> {
        let state = self.inner.get_or_create(values, AtomicF64::default)?;
        Ok(Gauge { state })
    }

    /// Overwrite the series selected by `values`.
    pub fn set(&self, v: f64, values: &[&str]) -> Result<()> {
        self.with_label_values(values)?.set(v);
        Ok(())
    }

    /// `v` may be negative.
    pub fn add(&self, v: f64, values: &[&str]) -> Result<()> {
        self.with_label_values(values)?.add(v);
        Ok(())
    }

    /// Subtract `v` from the selected series.
    pub fn sub(&self, v: f64, values: &[&str]) -> Result<()> {
        self.with_label_values(values)?.sub(v);
        Ok(())
    }

    /// Add 1 to the selected series.
    pub fn inc(&self, values: &[&str]) -> Result<()> {
        self.add(1.0, values)
    }

    /// Subtract 1 from the selected series.
    pub fn dec(&self, values: &[&str]) -> Result<()> {
        self.add(-1.0, values)
    }

    pub(crate) fn snapshot(&self) -> FamilySnapshot {
        self.inner
            .snapshot(MetricKind::Gauge, |s| Sample::Value(s.get()))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn set_then_adjust() {
        let registry = Registry::new();
        let g = GaugeVec::new(&registry, "queue_depth", "pending jobs", &["queue"]).unwrap();

        g.set(10.0, &["mail"]).unwrap();
        g.add(-3.0, &["mail"]).unwrap();
        g.inc(&["mail"]).unwrap();
        g.sub(0.5, &["mail"]).unwrap();
        g.dec(&["sms"]).unwrap();

        assert_eq!(g.with_label_values(&["mail"]).unwrap().get(), 7.5);
        assert_eq!(g.with_label_values(&["sms"]).unwrap().get(), -1.0);
    }

    #[test]
    fn unlabeled_gauge() {
        let registry = Registry::new();
        let g = GaugeVec::new(&registry, "up", "", &[]).unwrap();
        g.set(1.0, &[]).unwrap();
        assert!(g.set(1.0, &["extra"]).is_err());
        assert_eq!(g.series_count(), 1);
    }
}
