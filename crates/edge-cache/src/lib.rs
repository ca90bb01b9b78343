//! Incremental cache and tag cache for prerendered pages on the edge.
//!
//! This crate provides:
//! - `compute_cache_key` - Maps logical keys to object store keys
//! - `IncrementalCache` - Page/fetch payloads over an edge cache and a durable store
//! - `TagManifest` - The shared tag/path and revalidation document
//! - `TagCache` - Tag lookups and on-demand revalidation
//! - `KeyedMutex` - In-process serialization of manifest writes
//! - `discover_cache_assets` / `populate_cache` - Seeding storage from build output
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use edge_cache::{CacheContext, CacheKind, IncrementalCache, TagCache, TagWrite};
//! use edge_core::CacheConfig;
//! use edge_data::{MemoryEdgeCache, MemoryObjectStore};
//!
//! let ctx = CacheContext::new(
//!     Arc::new(MemoryObjectStore::new()),
//!     Arc::new(MemoryEdgeCache::new()),
//!     CacheConfig::from_env()?,
//! );
//! let pages = IncrementalCache::new(ctx.clone());
//! let tags = TagCache::new(&ctx);
//!
//! pages.set("/home", &serde_json::json!({"html": "<h1>Hi</h1>"}), CacheKind::Page).await?;
//! tags.write_tags(&[TagWrite::new("home-tag", "/home")]).await?;
//!
//! if let Some(entry) = pages.get("/home", CacheKind::Page).await? {
//!     let last_modified = tags.get_last_modified("/home", Some(entry.last_modified)).await?;
//! }
//! ```

mod context;
mod error;
mod incremental;
mod key;
mod lock;
mod manifest;
pub mod populate;
mod tags;

pub use context::*;
pub use error::*;
pub use incremental::*;
pub use key::*;
pub use lock::*;
pub use manifest::*;
pub use populate::{discover_cache_assets, populate_cache, CacheAsset, PopulateError, PopulateReport};
pub use tags::*;
