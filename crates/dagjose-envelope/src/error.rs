//! Error types for envelope encoding and decoding.

use dagjose_core::{ContentId, EncodingError};
use thiserror::Error;

/// Errors from building or opening an envelope.
#[derive(Debug, Error)]
pub enum EnvelopeError {
    #[error(transparent)]
    Encoding(#[from] EncodingError),

    #[error(transparent)]
    Signing(#[from] SigningError),

    #[error(transparent)]
    Encryption(#[from] EncryptionError),

    #[error("verification failed: {0}")]
    Verification(#[from] VerificationError),

    #[error("decryption failed: {0}")]
    Decryption(#[from] DecryptionError),

    #[error("malformed envelope: {0}")]
    Malformed(String),

    #[error("block is neither a signed nor an encrypted envelope")]
    UnknownFormat,
}

/// The signature provider refused or failed to sign.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("signing failed for {kid}: {reason}")]
pub struct SigningError {
    pub kid: String,
    pub reason: String,
}

/// Encryption could not produce an envelope for every recipient.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EncryptionError {
    #[error("no recipients")]
    NoRecipients,

    #[error("key wrap failed for {recipient}: {reason}")]
    KeyWrap { recipient: String, reason: String },

    #[error("cipher error: {0}")]
    Cipher(String),
}

/// A signed envelope could not be trusted.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VerificationError {
    #[error("payload block {actual} does not match envelope link {expected}")]
    LinkMismatch {
        expected: ContentId,
        actual: ContentId,
    },

    #[error("invalid signature from {kid}")]
    InvalidSignature { kid: String },

    #[error("unresolved signer {kid}: {reason}")]
    UnresolvedSigner { kid: String, reason: String },

    #[error("envelope carries no signatures")]
    NoSignatures,

    #[error("unsupported algorithm: {0}")]
    UnsupportedAlgorithm(String),

    #[error("malformed protected header: {0}")]
    MalformedHeader(String),
}

/// An encrypted envelope could not be opened.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecryptionError {
    #[error("no recipient entry can be unwrapped with the local key")]
    NoMatchingRecipient,

    #[error("ciphertext or wrapped key is corrupt")]
    Corrupt,

    #[error("unsupported algorithm: {0}")]
    UnsupportedAlgorithm(String),
}

/// Result type for envelope operations.
pub type Result<T> = std::result::Result<T, EnvelopeError>;
