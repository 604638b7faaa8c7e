//! Error types for the store module.

use dagjose_core::{ContentId, EncodingError};
use thiserror::Error;

/// Errors that can occur during store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The backend could not be reached.
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// No block with this CID.
    #[error("block not found: {0}")]
    NotFound(ContentId),

    /// The backend addressed a block differently than expected.
    #[error("cid mismatch: expected {expected}, got {actual}")]
    CidMismatch {
        expected: ContentId,
        actual: ContentId,
    },

    /// Database error from SQLite.
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// The remote API answered with an error.
    #[error("http error: {0}")]
    Http(String),

    /// CID could not be computed or parsed.
    #[error(transparent)]
    Encoding(#[from] EncodingError),

    /// Invalid data in storage.
    #[error("invalid data: {0}")]
    InvalidData(String),

    /// Migration error.
    #[error("migration error: {0}")]
    Migration(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
