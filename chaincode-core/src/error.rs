//! Error types for the chaincode

use thiserror::Error;

/// Result type for chaincode operations
pub type Result<T> = std::result::Result<T, Error>;

/// Chaincode errors
#[derive(Error, Debug)]
pub enum Error {
    /// Wrong number of arguments for an operation
    #[error("Incorrect number of arguments: expected {expected}, got {got}")]
    ArgumentCount {
        /// Arguments the operation requires
        expected: usize,
        /// Arguments actually supplied
        got: usize,
    },

    /// Malformed argument (e.g. not valid UTF-8 where a key is expected)
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Operation name not recognized by the dispatcher
    #[error("Invalid operation name: {0}")]
    UnknownOperation(String),

    /// Serialization error (JSON record encode/decode)
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Storage error (RocksDB or backend-specific)
    #[error("Storage error: {0}")]
    Storage(String),

    /// Read-set validation failed at commit time
    #[error("Commit conflict on key: {0}")]
    Conflict(String),

    /// Transaction commit timestamp unavailable or out of range
    #[error("Invalid transaction timestamp: {0}")]
    Timestamp(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Metrics registration error
    #[error("Metrics error: {0}")]
    Metrics(#[from] prometheus::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl From<rocksdb::Error> for Error {
    fn from(err: rocksdb::Error) -> Self {
        Error::Storage(err.to_string())
    }
}

impl From<String> for Error {
    fn from(msg: String) -> Self {
        Error::Other(msg)
    }
}

impl From<&str> for Error {
    fn from(msg: &str) -> Self {
        Error::Other(msg.to_string())
    }
}
