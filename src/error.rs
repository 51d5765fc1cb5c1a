//! Error types for the adapter

use thiserror::Error;

/// Result type for adapter operations
pub type AdapterResult<T> = Result<T, AdapterError>;

/// Errors that can occur while serving a connection
#[derive(Debug, Error)]
pub enum AdapterError {
    /// Malformed or unsupported wire protocol frame
    #[error("wire protocol error: {0}")]
    Protocol(String),

    /// Handshake could not be completed
    #[error("handshake error: {0}")]
    Handshake(String),

    /// Backing store command failed
    #[error("backing store error: {0}")]
    Store(String),

    /// Backing store operation exceeded its deadline
    #[error("backing store timeout during {0}")]
    StoreTimeout(String),

    /// Invalid configuration
    #[error("configuration error: {0}")]
    Config(String),

    /// Serialization/deserialization error
    #[error("serialization error: {0}")]
    Serialization(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<serde_json::Error> for AdapterError {
    fn from(err: serde_json::Error) -> Self {
        AdapterError::Serialization(err.to_string())
    }
}

impl From<redis::RedisError> for AdapterError {
    fn from(err: redis::RedisError) -> Self {
        AdapterError::Store(err.to_string())
    }
}
