//! Error types for the event store

use thiserror::Error;

/// Main error type for the event store
#[derive(Error, Debug)]
pub enum Error {
    /// Explicit single-entity lookup missed (e.g. `retrieve_event` on an
    /// unknown key). Discovery-style reads return empty results instead.
    #[error("Not found: {0}")]
    NotFound(String),

    /// The check-and-set retry budget was exhausted while updating shared
    /// catalog state. The whole write is safe to retry.
    #[error("Concurrent modification of {key} after {attempts} attempts")]
    ConcurrentModification {
        /// Key that kept changing under us
        key: String,
        /// Number of check-and-set attempts made
        attempts: u32,
    },

    /// Tag filter expression failed to parse; no query was executed.
    #[error("Malformed filter: {0}")]
    MalformedFilter(String),

    /// Input rejected before touching the store (reserved characters,
    /// empty names, inverted time ranges).
    #[error("Validation error: {0}")]
    Validation(String),

    /// Event payload could not be serialized or deserialized
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Backing store failure
    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

/// Errors from the backing key-value store
#[derive(Error, Debug)]
pub enum StoreError {
    /// Connection failure or the store is unreachable
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    /// A store round-trip exceeded its deadline
    #[error("Store timeout: {0}")]
    Timeout(String),

    /// The store answered, but with something unexpected
    #[error("Store response error: {0}")]
    Response(String),
}

impl Error {
    /// Whether the caller can safely retry the whole operation
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Error::ConcurrentModification { .. }
                | Error::Store(StoreError::Unavailable(_))
                | Error::Store(StoreError::Timeout(_))
        )
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_classification() {
        let err = Error::ConcurrentModification {
            key: "ev:metrics".to_string(),
            attempts: 5,
        };
        assert!(err.is_retryable());

        assert!(Error::Store(StoreError::Timeout("GET".to_string())).is_retryable());
        assert!(!Error::NotFound("temperature/123".to_string()).is_retryable());
        assert!(!Error::MalformedFilter("region".to_string()).is_retryable());
    }

    #[test]
    fn test_store_error_bridges_into_error() {
        fn fails() -> Result<()> {
            Err(StoreError::Unavailable("connection refused".to_string()))?
        }
        assert!(matches!(fails(), Err(Error::Store(_))));
    }
}
