//! Label-parameterized metric families.
//!
//! Each vector owns a table `label values -> series`. Series are created on
//! first use of a tuple and live as long as the vector. Every mutation checks
//! that the caller passed exactly one value per declared label name.

mod counter;
mod gauge;
mod histogram;

use std::sync::Arc;

use dashmap::DashMap;

use crate::error::{MetricError, Result};
use crate::registry::{FamilySnapshot, MetricKind, Sample, SeriesSnapshot};

pub use counter::{Counter, CounterVec};
pub use gauge::{Gauge, GaugeVec};
pub use histogram::{Histogram, HistogramVec};

/// Upper bound on the number of label keys a vector may declare.
pub const MAX_LABELS: usize = 10;

#[derive(Debug)]
pub(crate) struct Desc {
    pub(crate) name: String,
    pub(crate) help: String,
    pub(crate) label_names: Vec<String>,
}

impl Desc {
    /// `reserved` lists label names the vector kind emits itself (`le`).
    pub(crate) fn new(
        name: &str,
        help: &str,
        label_names: &[&str],
        reserved: &[&str],
    ) -> Result<Self> {
        if label_names.len() > MAX_LABELS {
            return Err(MetricError::TooManyLabels {
                name: name.to_string(),
                count: label_names.len(),
                max: MAX_LABELS,
            });
        }
        if !is_valid_metric_name(name) {
            return Err(MetricError::InvalidArgument(format!(
                "invalid metric name: {name:?}"
            )));
        }
        for (i, label) in label_names.iter().enumerate() {
            if !is_valid_label_name(label) || label.starts_with("__") {
                return Err(MetricError::InvalidArgument(format!(
                    "invalid label name {label:?} on {name}"
                )));
            }
            if reserved.contains(label) {
                return Err(MetricError::InvalidArgument(format!(
                    "label name {label:?} is reserved on {name}"
                )));
            }
            if label_names[..i].contains(label) {
                return Err(MetricError::InvalidArgument(format!(
                    "duplicate label name {label:?} on {name}"
                )));
            }
        }

        Ok(Self {
            name: name.to_string(),
            help: help.to_string(),
            label_names: label_names.iter().map(|l| l.to_string()).collect(),
        })
    }
}

fn is_valid_metric_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' || c == ':' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == ':')
}

fn is_valid_label_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Series table shared by every vector kind.
pub(crate) struct Family<S> {
    desc: Desc,
    series: DashMap<Vec<String>, Arc<S>>,
}

impl<S> Family<S> {
    pub(crate) fn new(desc: Desc) -> Self {
        Self {
            desc,
            series: DashMap::new(),
        }
    }

    pub(crate) fn desc(&self) -> &Desc {
        &self.desc
    }

    /// Select the series for `values`, creating it with `make` on first use.
    /// Creation goes through the map entry so racing callers share one series.
    pub(crate) fn get_or_create(&self, values: &[&str], make: impl FnOnce() -> S) -> Result<Arc<S>> {
        if values.len() != self.desc.label_names.len() {
            return Err(MetricError::InvalidArgument(format!(
                "{} expects {} label values, got {}",
                self.desc.name,
                self.desc.label_names.len(),
                values.len()
            )));
        }

        let key: Vec<String> = values.iter().map(|v| v.to_string()).collect();
        if let Some(found) = self.series.get(&key) {
            return Ok(Arc::clone(found.value()));
        }
        let entry = self.series.entry(key).or_insert_with(|| Arc::new(make()));
        Ok(Arc::clone(entry.value()))
    }

    pub(crate) fn len(&self) -> usize {
        self.series.len()
    }

    pub(crate) fn snapshot(&self, kind: MetricKind, sample: impl Fn(&S) -> Sample) -> FamilySnapshot {
        let mut series: Vec<SeriesSnapshot> = self
            .series
            .iter()
            .map(|r| SeriesSnapshot {
                label_values: r.key().clone(),
                sample: sample(r.value().as_ref()),
            })
            .collect();
        series.sort_by(|a, b| a.label_values.cmp(&b.label_values));

        FamilySnapshot {
            name: self.desc.name.clone(),
            help: self.desc.help.clone(),
            kind,
            label_names: self.desc.label_names.clone(),
            series,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn metric_name_rules() {
        assert!(is_valid_metric_name("requests_total"));
        assert!(is_valid_metric_name("ns:sub_metric"));
        assert!(is_valid_metric_name("_private"));
        assert!(!is_valid_metric_name(""));
        assert!(!is_valid_metric_name("9lives"));
        assert!(!is_valid_metric_name("with-dash"));
    }

    #[test]
    fn label_name_rules() {
        assert!(is_valid_label_name("method"));
        assert!(!is_valid_label_name("a:b"));
        assert!(!is_valid_label_name("0x"));
    }

    #[test]
    fn desc_rejects_bad_labels() {
        let too_many: Vec<String> = (0..=MAX_LABELS).map(|i| format!("l{i}")).collect();
        let refs: Vec<&str> = too_many.iter().map(String::as_str).collect();
        let err = Desc::new("m", "", &refs, &[]).err().map(|e| e.kind());
        assert_eq!(err, Some(crate::ErrorKind::TooManyLabels));

        assert!(Desc::new("m", "", &["a", "a"], &[]).is_err());
        assert!(Desc::new("m", "", &["__name"], &[]).is_err());
        assert!(Desc::new("m", "", &["le"], &["le"]).is_err());
        assert!(Desc::new("m", "", &["le"], &[]).is_ok());
    }

    #[test]
    fn arity_mismatch_creates_nothing() {
        let family: Family<u8> = Family::new(Desc {
            name: "m".into(),
            help: String::new(),
            label_names: vec!["a".into(), "b".into()],
        });

        assert!(family.get_or_create(&["x"], || 0).is_err());
        assert!(family.get_or_create(&["x", "y", "z"], || 0).is_err());
        assert_eq!(family.len(), 0);

        assert!(family.get_or_create(&["x", "y"], || 0).is_ok());
        assert!(family.get_or_create(&["x", "y"], || 1).is_ok());
        assert_eq!(family.len(), 1);
    }
}
