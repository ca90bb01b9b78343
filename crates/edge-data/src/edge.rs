//! Ephemeral edge cache capability.

use async_trait::async_trait;
use http::Request;

use crate::error::{StoreError, StoreResult};

/// Hostname of the synthetic URLs used as edge cache keys.
pub const EDGE_CACHE_HOST: &str = "cacheapinextjs";

/// Build the synthetic request identifying `key` in the edge cache.
///
/// `/home` and `home` map to the same URL: `http://cacheapinextjs/home`.
pub fn edge_cache_request(key: &str) -> StoreResult<Request<()>> {
    let uri = format!("http://{}/{}", EDGE_CACHE_HOST, key.trim_start_matches('/'));
    Request::get(uri)
        .body(())
        .map_err(|e| StoreError::InvalidKey(format!("{key}: {e}")))
}

/// Fast, best-effort, regionally scoped cache.
///
/// Entries live in named caches (one per build) and are keyed by request URL.
/// Nothing written here is guaranteed to be readable later.
#[async_trait]
pub trait EdgeCache: Send + Sync {
    /// Find the body stored for `request`.
    async fn lookup(&self, cache_name: &str, request: &Request<()>) -> StoreResult<Option<Vec<u8>>>;

    /// Store a body for `request`.
    async fn put(&self, cache_name: &str, request: &Request<()>, body: Vec<u8>) -> StoreResult<()>;

    /// Remove the entry for `request`. Returns whether an entry existed.
    async fn delete(&self, cache_name: &str, request: &Request<()>) -> StoreResult<bool>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_edge_cache_request_url() {
        let req = edge_cache_request("/home").unwrap();
        assert_eq!(req.uri().to_string(), "http://cacheapinextjs/home");
        assert_eq!(req.method(), http::Method::GET);

        let same = edge_cache_request("home").unwrap();
        assert_eq!(req.uri(), same.uri());
    }

    #[test]
    fn test_edge_cache_request_nested_path() {
        let req = edge_cache_request("/blog/post-1").unwrap();
        assert_eq!(req.uri().path(), "/blog/post-1");
    }

    #[test]
    fn test_edge_cache_request_rejects_unencodable_key() {
        let err = edge_cache_request("/with space").unwrap_err();
        assert!(matches!(err, StoreError::InvalidKey(_)));
    }
}
