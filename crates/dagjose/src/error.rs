//! Error types for building and walking chains.

use dagjose_core::ContentId;
use dagjose_envelope::{EnvelopeError, EnvelopeKind};
use dagjose_store::StoreError;
use thiserror::Error;

/// Errors that can occur while building or walking a chain.
#[derive(Debug, Error)]
pub enum DagError {
    /// Encoding, signing, encryption, verification or decryption failed.
    #[error("envelope error: {0}")]
    Envelope(#[from] EnvelopeError),

    /// Storage error.
    #[error("storage error: {0}")]
    Store(#[from] StoreError),

    /// A referenced block is absent from the store.
    #[error("broken chain at depth {depth}: {referenced_by} references missing block {missing}")]
    BrokenChain {
        missing: ContentId,
        referenced_by: ContentId,
        depth: usize,
    },

    /// A fetched block does not hash to the CID it was requested by.
    #[error("block {cid} at depth {depth} does not match its cid")]
    Integrity { cid: ContentId, depth: usize },

    /// A path segment does not exist in the resolved node.
    #[error("no {segment:?} in {path:?}")]
    PathNotFound { path: String, segment: String },

    /// A `prev` reference points back into the walked chain.
    #[error("cycle at depth {depth}: {cid} was already visited")]
    Cycle { cid: ContentId, depth: usize },

    /// The node's envelope is not of the requested kind.
    #[error("{cid} is a {found} envelope, expected {expected}")]
    ModeMismatch {
        cid: ContentId,
        expected: EnvelopeKind,
        found: EnvelopeKind,
    },

    /// A document's `prev` is not in the store, so it cannot be linked.
    #[error("prev {0} is not in the store")]
    DanglingPrev(ContentId),

    /// A signed envelope's payload block is not in the store.
    #[error("linked payload {0} is not in the store")]
    DanglingLink(ContentId),

    /// The chain is longer than the configured bound.
    #[error("chain exceeds maximum depth {0}")]
    DepthExceeded(usize),
}

/// Result type for chain operations.
pub type Result<T> = std::result::Result<T, DagError>;
