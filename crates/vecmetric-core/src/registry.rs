//! Metric registry: the name-keyed table every vector registers into.
//!
//! Registration is permanent. A second vector under an existing name is
//! refused with [`MetricError::DuplicateName`]; callers that want the existing
//! handle use [`Registry::lookup`] instead.

use std::sync::{Arc, OnceLock};

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

use crate::error::{MetricError, Result};
use crate::vector::{CounterVec, GaugeVec, HistogramVec};

static GLOBAL_REGISTRY: OnceLock<Registry> = OnceLock::new();

/// Any registered vector.
#[derive(Clone)]
pub enum MetricVec {
    Counter(CounterVec),
    Gauge(GaugeVec),
    Histogram(HistogramVec),
}

impl MetricVec {
    /// Name the vector was registered under.
    pub fn name(&self) -> &str {
        match self {
            MetricVec::Counter(v) => v.name(),
            MetricVec::Gauge(v) => v.name(),
            MetricVec::Histogram(v) => v.name(),
        }
    }

    /// Which of the three vector types this is.
    pub fn kind(&self) -> MetricKind {
        match self {
            MetricVec::Counter(_) => MetricKind::Counter,
            MetricVec::Gauge(_) => MetricKind::Gauge,
            MetricVec::Histogram(_) => MetricKind::Histogram,
        }
    }

    /// The counter vector, or `None` for another type.
    pub fn as_counter(&self) -> Option<&CounterVec> {
        match self {
            MetricVec::Counter(v) => Some(v),
            _ => None,
        }
    }

    /// The gauge vector, or `None` for another type.
    pub fn as_gauge(&self) -> Option<&GaugeVec> {
        match self {
            MetricVec::Gauge(v) => Some(v),
            _ => None,
        }
    }

    /// The histogram vector, or `None` for another type.
    pub fn as_histogram(&self) -> Option<&HistogramVec> {
        match self {
            MetricVec::Histogram(v) => Some(v),
            _ => None,
        }
    }

    fn snapshot(&self) -> FamilySnapshot {
        match self {
            MetricVec::Counter(v) => v.snapshot(),
            MetricVec::Gauge(v) => v.snapshot(),
            MetricVec::Histogram(v) => v.snapshot(),
        }
    }
}

impl From<CounterVec> for MetricVec {
    fn from(v: CounterVec) -> Self {
        MetricVec::Counter(v)
    }
}

impl From<GaugeVec> for MetricVec {
    fn from(v: GaugeVec) -> Self {
        MetricVec::Gauge(v)
    }
}

impl From<HistogramVec> for MetricVec {
    fn from(v: HistogramVec) -> Self {
        MetricVec::Histogram(v)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricKind {
    Counter,
    Gauge,
    Histogram,
}

impl MetricKind {
    /// Name used on `# TYPE` lines.
    pub fn as_str(self) -> &'static str {
        match self {
            MetricKind::Counter => "counter",
            MetricKind::Gauge => "gauge",
            MetricKind::Histogram => "histogram",
        }
    }
}

/// Point-in-time value of one series.
#[derive(Debug, Clone, PartialEq)]
pub enum Sample {
    Value(f64),
    /// `buckets` holds `(upper bound, cumulative count)` without `+Inf`;
    /// the `+Inf` bucket equals `count`.
    Histogram {
        buckets: Vec<(f64, u64)>,
        count: u64,
        sum: f64,
    },
}

#[derive(Debug, Clone)]
pub struct SeriesSnapshot {
    pub label_values: Vec<String>,
    pub sample: Sample,
}

/// Everything an encoder needs to expose one vector.
#[derive(Debug, Clone)]
pub struct FamilySnapshot {
    pub name: String,
    pub help: String,
    pub kind: MetricKind,
    pub label_names: Vec<String>,
    /// Sorted by label values.
    pub series: Vec<SeriesSnapshot>,
}

impl FamilySnapshot {
    /// Series whose label values equal `values`, in label order.
    pub fn series(&self, values: &[&str]) -> Option<&SeriesSnapshot> {
        self.series
            .iter()
            .find(|s| s.label_values.iter().map(String::as_str).eq(values.iter().copied()))
    }
}

/// Shared, cheaply cloneable registry handle.
#[derive(Clone, Default)]
pub struct Registry {
    families: Arc<DashMap<String, MetricVec>>,
}

impl Registry {
    /// Empty registry, independent of [`Registry::global`].
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide default registry.
    pub fn global() -> Registry {
        GLOBAL_REGISTRY.get_or_init(Registry::new).clone()
    }

    /// Insert `vec` unless its name is taken. The check and the insert happen
    /// under the same shard lock, so concurrent callers get one winner.
    pub fn register(&self, vec: impl Into<MetricVec>) -> Result<()> {
        let vec = vec.into();
        match self.families.entry(vec.name().to_string()) {
            Entry::Occupied(e) => {
                tracing::warn!(name = %e.key(), "metric name already registered");
                Err(MetricError::DuplicateName(e.key().clone()))
            }
            Entry::Vacant(e) => {
                tracing::debug!(name = %e.key(), kind = vec.kind().as_str(), "metric registered");
                e.insert(vec);
                Ok(())
            }
        }
    }

    /// The vector registered as `name`, if any. The returned value shares
    /// series storage with the registered one.
    pub fn lookup(&self, name: &str) -> Option<MetricVec> {
        self.families.get(name).map(|r| r.value().clone())
    }

    /// Whether `name` is taken.
    pub fn contains(&self, name: &str) -> bool {
        self.families.contains_key(name)
    }

    /// Number of registered vectors.
    pub fn len(&self) -> usize {
        self.families.len()
    }

    /// Whether nothing has been registered yet.
    pub fn is_empty(&self) -> bool {
        self.families.is_empty()
    }

    /// Snapshot every registered vector, sorted by name.
    pub fn gather(&self) -> Vec<FamilySnapshot> {
        // Clone handles first so no shard lock is held while series tables are walked.
        let vecs: Vec<MetricVec> = self.families.iter().map(|r| r.value().clone()).collect();
        let mut out: Vec<FamilySnapshot> = vecs.iter().map(MetricVec::snapshot).collect();
        out.sort_by(|a, b| a.name.cmp(&b.name));
        out
    }

    /// Shorthand for [`CounterVec::new`] on this registry.
    pub fn counter_vec(&self, name: &str, help: &str, label_names: &[&str]) -> Result<CounterVec> {
        CounterVec::new(self, name, help, label_names)
    }

    /// Shorthand for [`GaugeVec::new`] on this registry.
    pub fn gauge_vec(&self, name: &str, help: &str, label_names: &[&str]) -> Result<GaugeVec> {
        GaugeVec::new(self, name, help, label_names)
    }

    /// Shorthand for [`HistogramVec::new`] on this registry.
    pub fn histogram_vec(
        &self,
        name: &str,
        help: &str,
        label_names: &[&str],
        buckets: Option<&[f64]>,
    ) -> Result<HistogramVec> {
        HistogramVec::new(self, name, help, label_names, buckets)
    }
}

/// Declare a counter vector on the global registry.
pub fn new_counter_vec(name: &str, help: &str, label_names: &[&str]) -> Result<CounterVec> {
    Registry::global().counter_vec(name, help, label_names)
}

/// Declare a gauge vector on the global registry.
pub fn new_gauge_vec(name: &str, help: &str, label_names: &[&str]) -> Result<GaugeVec> {
    Registry::global().gauge_vec(name, help, label_names)
}

/// Declare a histogram vector on the global registry.
pub fn new_histogram_vec(
    name: &str,
    help: &str,
    label_names: &[&str],
    buckets: Option<&[f64]>,
) -> Result<HistogramVec> {
    Registry::global().histogram_vec(name, help, label_names, buckets)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn duplicate_name_across_kinds() {
        let registry = Registry::new();
        registry.counter_vec("dup", "", &[]).unwrap();

        let err = registry.gauge_vec("dup", "", &[]).err().unwrap();
        assert_eq!(err.kind(), crate::ErrorKind::DuplicateName);
        assert_eq!(registry.lookup("dup").map(|v| v.kind()), Some(MetricKind::Counter));
    }

    #[test]
    fn lookup_returns_live_handle() {
        let registry = Registry::new();
        let c = registry.counter_vec("events_total", "", &["src"]).unwrap();
        c.inc(&["a"]).unwrap();

        let found = registry.lookup("events_total").unwrap();
        let again = found.as_counter().unwrap();
        again.inc(&["a"]).unwrap();

        assert_eq!(c.with_label_values(&["a"]).unwrap().get(), 2.0);
        assert!(found.as_gauge().is_none());
        assert!(registry.lookup("missing").is_none());
    }

    #[test]
    fn new_registry_is_isolated() {
        let registry = Registry::new();
        assert!(registry.is_empty());

        registry.counter_vec("isolated_total", "", &[]).unwrap();
        assert_eq!(registry.len(), 1);
        assert!(registry.contains("isolated_total"));
        assert!(!Registry::new().contains("isolated_total"));
        assert!(!Registry::global().contains("isolated_total"));
    }

    #[test]
    fn gather_is_sorted() {
        let registry = Registry::new();
        let b = registry.gauge_vec("b", "", &["k"]).unwrap();
        registry.counter_vec("a", "", &[]).unwrap();
        b.set(1.0, &["z"]).unwrap();
        b.set(2.0, &["m"]).unwrap();

        let families = registry.gather();
        let names: Vec<&str> = families.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["a", "b"]);

        let values: Vec<&str> = families[1]
            .series
            .iter()
            .map(|s| s.label_values[0].as_str())
            .collect();
        assert_eq!(values, vec!["m", "z"]);
        assert_eq!(families[1].series(&["z"]).map(|s| &s.sample), Some(&Sample::Value(1.0)));
    }

    #[test]
    fn registries_are_independent() {
        let a = Registry::new();
        let b = Registry::new();
        a.counter_vec("same", "", &[]).unwrap();
        b.counter_vec("same", "", &[]).unwrap();
        assert_eq!(a.len(), 1);
        assert_eq!(b.len(), 1);
    }
}
