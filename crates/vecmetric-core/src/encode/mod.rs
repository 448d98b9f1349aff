//! Exposition backends.
//!
//! The exporter only knows the [`Encoder`] trait; the Prometheus text format
//! is the built-in implementation.

mod text;

use bytes::Bytes;

use crate::error::Result;
use crate::registry::FamilySnapshot;

pub use text::TextEncoder;

/// Turns gathered families into a scrape response body.
pub trait Encoder: Send + Sync {
    /// Value of the HTTP `Content-Type` header.
    fn content_type(&self) -> &'static str;

    fn encode(&self, families: &[FamilySnapshot]) -> Result<Bytes>;
}
