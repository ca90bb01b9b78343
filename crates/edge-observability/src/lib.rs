//! Observability for the edge incremental-cache adapter.
//!
//! This crate provides:
//! - `init_logging` - Installs the `tracing` subscriber (JSON or human format)
//! - `CacheMetrics` - Hit/miss/write counters shared by the cache components

mod error;
mod logging;
mod metrics;

pub use error::*;
pub use logging::*;
pub use metrics::*;
