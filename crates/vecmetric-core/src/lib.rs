//! vecmetric core: label-parameterized metric vectors, the registry they live
//! in, and the text exposition encoder.
//!
//! This crate carries no HTTP or async runtime dependency; the exporter crate
//! serves what [`Registry::gather`] produces through an [`Encoder`].
//!
//! # Defensive guarantees
//! Panics, `unwrap`, and `expect` are compile-denied here. Every fallible path
//! surfaces as [`MetricError`] so instrumented processes never crash on a bad
//! metric declaration or a mismatched label tuple.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

pub mod buckets;
pub mod encode;
pub mod error;
pub mod registry;
pub mod time;
pub mod vector;

mod value;

pub use buckets::{exponential_buckets, linear_buckets, DEFAULT_LATENCY_BUCKETS};
pub use encode::{Encoder, TextEncoder};
pub use error::{ErrorKind, MetricError, Result};
pub use registry::{
    new_counter_vec, new_gauge_vec, new_histogram_vec, FamilySnapshot, MetricKind, MetricVec,
    Registry, Sample, SeriesSnapshot,
};
pub use time::since_ms;
pub use vector::{Counter, CounterVec, Gauge, GaugeVec, Histogram, HistogramVec, MAX_LABELS};
