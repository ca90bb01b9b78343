//! Cache error types.

use edge_data::StoreError;
use thiserror::Error;

use crate::key::CacheKind;

/// Result type for cache operations.
pub type CacheResult<T> = Result<T, CacheError>;

/// Errors raised by the incremental cache and tag cache.
///
/// Variants fall into three classes:
/// - ignorable: [`CacheError::NotFound`], always handled as a miss
/// - recoverable: [`CacheError::Recoverable`], a failed durable write the
///   caller may retry or answer by serving stale content
/// - fatal: [`CacheError::UnsupportedKind`], [`CacheError::InvalidValue`]
///   and [`CacheError::Serialization`], raised immediately and never retried
#[derive(Error, Debug)]
pub enum CacheError {
    /// No entry stored for the key.
    #[error("cache entry not found: {key}")]
    NotFound { key: String },

    /// A durable write failed.
    #[error("{message}")]
    Recoverable {
        message: String,
        #[source]
        source: Option<StoreError>,
    },

    /// The storage tier cannot hold this kind of entry.
    #[error("cache kind `{kind}` is not supported by the storage tier")]
    UnsupportedKind { kind: CacheKind },

    /// The value cannot be stored as a cache payload.
    #[error("invalid cache value: {0}")]
    InvalidValue(String),

    /// Payload or manifest (de)serialization failed.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Storage backend failure.
    #[error("storage error: {0}")]
    Store(#[from] StoreError),
}

impl CacheError {
    /// Build a recoverable error wrapping a storage failure.
    pub fn recoverable(message: impl Into<String>, source: StoreError) -> Self {
        Self::Recoverable {
            message: message.into(),
            source: Some(source),
        }
    }

    /// Whether this is a miss rather than a failure.
    pub fn is_ignorable(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Whether the caller may retry the operation.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::Recoverable { .. } | Self::Store(_))
    }

    /// Whether this is a configuration error that must not be retried.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::UnsupportedKind { .. } | Self::InvalidValue(_) | Self::Serialization(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_classes_are_disjoint() {
        let errors = [
            CacheError::NotFound { key: "/a".into() },
            CacheError::recoverable("write failed", StoreError::Backend("down".into())),
            CacheError::UnsupportedKind {
                kind: CacheKind::Composable,
            },
        ];
        let classes: Vec<(bool, bool, bool)> = errors
            .iter()
            .map(|e| (e.is_ignorable(), e.is_recoverable(), e.is_fatal()))
            .collect();
        assert_eq!(
            classes,
            vec![(true, false, false), (false, true, false), (false, false, true)]
        );
    }

    #[test]
    fn test_recoverable_keeps_source() {
        use std::error::Error as _;

        let err = CacheError::recoverable("Failed to set cache [/a]", StoreError::Backend("down".into()));
        assert_eq!(err.to_string(), "Failed to set cache [/a]");
        assert!(err.source().is_some());
    }

    #[test]
    fn test_malformed_document_is_fatal() {
        let err: CacheError = serde_json::from_str::<serde_json::Value>("{nope")
            .unwrap_err()
            .into();
        assert!(err.is_fatal());
        assert!(!err.is_recoverable());
    }
}
