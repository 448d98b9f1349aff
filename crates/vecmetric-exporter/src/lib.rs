//! vecmetric exporter library entry.
//!
//! Wires the core registry to an HTTP scrape endpoint: configuration loading,
//! the path → handler mux (private or the process-wide debug mux), scrape
//! and debug handlers, and the exporter server lifecycle. Consumed by the binary
//! (`main.rs`) and by integration tests.

pub mod config;
pub mod debug;
pub mod ops;
pub mod router;
pub mod server;

pub use router::{debug_mux, Mux};
pub use server::{
    init_from_config, start_exporter, Exporter, ExporterHandle, ExporterOptions, ExporterState,
};
