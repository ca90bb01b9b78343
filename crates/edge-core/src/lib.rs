//! Core configuration for the edge incremental-cache adapter.
//!
//! This crate provides:
//! - `CacheConfig` - Bucket prefix, edge cache name, and build metadata
//! - `BuildId` - Build identifier used to namespace cache entries and tags
//! - `now_millis` - Wall-clock helper shared by the cache crates

mod build;
mod clock;
mod config;

pub use build::*;
pub use clock::*;
pub use config::*;
