//! Error types for the caching layer
//!
//! Provides unified error handling using thiserror.

use thiserror::Error;

// == Cache Error Enum ==
/// Unified error type for clients, providers and the rate limiter.
///
/// Connectivity loss on the remote backend is deliberately absent: remote
/// operations degrade to neutral results instead of failing.
#[derive(Error, Debug)]
pub enum CacheError {
    /// Value rejected by the local backend because it is too large
    #[error("Item size {size} bytes exceeds maximum allowed size of {max} bytes")]
    SizeExceeded { size: usize, max: usize },

    /// Stored text does not match the shape the caller asked for
    #[error("Stored value for key '{key}' does not match the expected shape: {source}")]
    DeserializationMismatch {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    /// Value could not be serialized before being stored
    #[error("Failed to serialize value: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Invalid configuration value
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl CacheError {
    /// Builds a `DeserializationMismatch` for the given (prefixed) key.
    pub fn mismatch(key: impl Into<String>, source: serde_json::Error) -> Self {
        CacheError::DeserializationMismatch {
            key: key.into(),
            source,
        }
    }
}

// == Result Type Alias ==
/// Convenience Result type for the caching layer.
pub type Result<T> = std::result::Result<T, CacheError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_size_exceeded_message() {
        let err = CacheError::SizeExceeded { size: 20, max: 10 };
        let msg = err.to_string();
        assert!(msg.contains("20"));
        assert!(msg.contains("10"));
    }

    #[test]
    fn test_mismatch_keeps_key_and_source() {
        let source = serde_json::from_str::<u32>("\"text\"").unwrap_err();
        let err = CacheError::mismatch("p:key", source);

        assert!(err.to_string().contains("p:key"));
        assert!(std::error::Error::source(&err).is_some());
    }
}
