//! Error types for harness runs.

use dagjose::DagError;
use dagjose_store::StoreError;
use thiserror::Error;

use crate::compare::Divergence;

/// Errors that end a harness run.
#[derive(Debug, Error)]
pub enum HarnessError {
    /// Building or walking a chain failed.
    #[error(transparent)]
    Dag(#[from] DagError),

    /// A store call made directly by the script failed.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// A backend could not be opened.
    #[error("backend {backend}: {source}")]
    Backend {
        backend: String,
        #[source]
        source: StoreError,
    },

    /// The two backends did not behave the same.
    #[error("{0}")]
    Divergence(Box<Divergence>),

    /// A stop was requested; the run ended between store operations.
    #[error("run cancelled")]
    Cancelled,

    /// Invalid or unreadable configuration.
    #[error("configuration error: {0}")]
    Config(String),
}

/// Result type for harness operations.
pub type Result<T> = std::result::Result<T, HarnessError>;
