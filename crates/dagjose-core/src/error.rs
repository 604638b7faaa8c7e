//! Error types for dagjose core primitives.

use thiserror::Error;

/// A payload or block could not be represented in (or read from) canonical DAG-CBOR.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EncodingError {
    #[error("non-finite float: {0}")]
    NonFiniteFloat(String),

    #[error("reserved key \"prev\" must be set through the document back-reference")]
    ReservedKey,

    #[error("value nested deeper than {0} levels")]
    TooDeep(usize),

    #[error("map keys must be text strings")]
    NonTextKey,

    #[error("integer out of range: {0}")]
    IntegerOutOfRange(i128),

    #[error("unsupported CBOR item: {0}")]
    Unsupported(String),

    #[error("input is not in canonical form")]
    NonCanonical,

    #[error("\"prev\" must be a link, got {0}")]
    InvalidPrev(String),

    #[error("invalid content id: {0}")]
    InvalidCid(String),

    #[error("decoding error: {0}")]
    Decoding(String),
}

/// Errors from key custody and identifier resolution.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IdentityError {
    #[error("unsupported DID method: {0}")]
    UnsupportedMethod(String),

    #[error("malformed identifier: {0}")]
    Malformed(String),

    #[error("invalid public key")]
    InvalidPublicKey,

    #[error("unresolved identifier: {0}")]
    Unresolved(String),
}

/// Result type for encoding operations.
pub type Result<T> = std::result::Result<T, EncodingError>;
