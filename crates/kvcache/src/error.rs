//! Cache error types

use thiserror::Error;

/// Result type alias for cache operations
pub type Result<T> = std::result::Result<T, CacheError>;

/// Errors surfaced by the cache adapter and its backends
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CacheError {
    /// Key (or hash) is absent at the backend
    #[error("Key not found: {0}")]
    NotFound(String),

    /// Value could not be JSON-encoded on write
    #[error("Encode error: {0}")]
    Encode(String),

    /// Stored payload could not be JSON-decoded on read
    #[error("Decode error: {0}")]
    Decode(String),

    /// Transport, protocol, pool, or connection failure below the adapter
    #[error("Backend error: {0}")]
    Backend(String),
}

impl CacheError {
    /// Returns true if the key was absent
    pub fn is_not_found(&self) -> bool {
        matches!(self, CacheError::NotFound(_))
    }

    /// Returns true if the failure came from the backend
    pub fn is_backend(&self) -> bool {
        matches!(self, CacheError::Backend(_))
    }

    /// Error reported once a backend has been closed
    pub fn closed() -> Self {
        CacheError::Backend("client is closed".to_string())
    }
}

#[cfg(feature = "redis")]
impl From<redis::RedisError> for CacheError {
    fn from(err: redis::RedisError) -> Self {
        CacheError::Backend(err.to_string())
    }
}

#[cfg(feature = "redis")]
impl From<deadpool_redis::PoolError> for CacheError {
    fn from(err: deadpool_redis::PoolError) -> Self {
        CacheError::Backend(format!("Failed to get connection: {}", err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_not_found() {
        let err = CacheError::NotFound("user:1".to_string());
        assert_eq!(err.to_string(), "Key not found: user:1");
    }

    #[test]
    fn test_error_display_encode() {
        let err = CacheError::Encode("key must be a string".to_string());
        assert_eq!(err.to_string(), "Encode error: key must be a string");
    }

    #[test]
    fn test_error_display_decode() {
        let err = CacheError::Decode("expected value".to_string());
        assert_eq!(err.to_string(), "Decode error: expected value");
    }

    #[test]
    fn test_error_display_backend() {
        let err = CacheError::closed();
        assert_eq!(err.to_string(), "Backend error: client is closed");
    }

    #[test]
    fn test_error_classification() {
        assert!(CacheError::NotFound("k".into()).is_not_found());
        assert!(!CacheError::NotFound("k".into()).is_backend());
        assert!(CacheError::Backend("refused".into()).is_backend());
        assert!(!CacheError::Decode("bad".into()).is_not_found());
    }
}
