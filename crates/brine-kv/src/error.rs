//! KV error types

use brine_sql::SqlError;
use thiserror::Error;

/// Result type for KV operations
pub type KvResult<T> = Result<T, KvError>;

/// Error type for KV operations
#[derive(Debug, Error)]
pub enum KvError {
    /// Operation attempted before `init` completed or after `close`
    #[error("Brine not initialized")]
    NotInitialized,

    /// Backend unreachable, authentication failure or malformed URI
    #[error("Connection error: {0}")]
    Connection(#[source] SqlError),

    /// Schema DDL rejected
    #[error("Migration error: {0}")]
    Migration(#[source] SqlError),

    /// A batch write failed and was rolled back
    #[error("Batch write error: {0}")]
    BatchWrite(#[source] SqlError),

    /// Backend failure on a single-row operation
    #[error("Storage error: {0}")]
    Storage(#[source] SqlError),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl KvError {
    /// The underlying backend error, if any
    pub fn backend(&self) -> Option<&SqlError> {
        match self {
            KvError::Connection(e)
            | KvError::Migration(e)
            | KvError::BatchWrite(e)
            | KvError::Storage(e) => Some(e),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for KvError {
    fn from(err: serde_json::Error) -> Self {
        KvError::Serialization(err.to_string())
    }
}
