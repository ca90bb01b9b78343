//! Storage clients for the edge incremental cache.
//!
//! This crate provides:
//! - `ObjectStore` - Durable key-value object storage
//! - `EdgeCache` - Best-effort regional cache keyed by synthetic requests
//! - `MemoryObjectStore` / `MemoryEdgeCache` - In-process backends with fault injection
//! - `FsObjectStore` - Directory-backed object store for local preview and seeding
//! - `SpinObjectStore` - Spin Key-Value backed store (wasm32 only)

mod edge;
mod error;
mod fs;
mod memory;
#[cfg(target_arch = "wasm32")]
mod spin;
mod store;

pub use edge::*;
pub use error::*;
pub use fs::*;
pub use memory::*;
#[cfg(target_arch = "wasm32")]
pub use spin::*;
pub use store::*;
