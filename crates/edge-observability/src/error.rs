//! Observability error types.

/// Errors raised while setting up observability.
#[derive(Debug, thiserror::Error)]
pub enum ObservabilityError {
    /// A global subscriber is already installed, or the filter is invalid.
    #[error("failed to install tracing subscriber: {0}")]
    Subscriber(String),
}
