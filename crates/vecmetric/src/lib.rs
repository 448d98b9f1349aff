//! Top-level facade crate for vecmetric.
//!
//! Re-exports the metric vectors and the exporter so users can depend on a single crate.

pub mod core {
    pub use vecmetric_core::*;
}

pub mod exporter {
    pub use vecmetric_exporter::*;
}
