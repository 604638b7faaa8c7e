//! # dagjose-envelope
//!
//! DAG-JOSE envelopes around canonical documents.
//!
//! Two variants, closed at compile time:
//!
//! - [`jws`] - a signed envelope linking to a separate payload block
//! - [`jwe`] - an encrypted envelope embedding the payload as ciphertext
//!
//! Both are stored as DAG-CBOR blocks; [`json`] converts them to and from
//! the JOSE general JSON serialization.
//!
//! Key material is never handled here directly. Signing, verification, key
//! wrapping and unwrapping go through the traits in [`provider`], which
//! [`dagjose_core::Identity`] and any [`dagjose_core::Resolver`] implement.
//!
//! ## Failure policy
//!
//! Decoding fails closed. A signed envelope is trusted only if its payload
//! block addresses to the declared link and every signature verifies. An
//! encrypted envelope is built for all recipients or not at all.

pub mod aead;
pub mod envelope;
pub mod error;
pub mod jwe;
pub mod json;
pub mod jws;
pub mod keywrap;
pub mod provider;

pub use aead::SecureRng;
pub use envelope::{sniff, EncryptedEnvelope, Envelope, EnvelopeKind, SignedEnvelope};
pub use error::{
    DecryptionError, EncryptionError, EnvelopeError, Result, SigningError, VerificationError,
};
pub use jwe::{decode_encrypted, decrypt, encode_encrypted};
pub use jws::{
    decode_signed, encode_signed, encode_signed_with, verify_signed, JwsHeader, SignedBlocks,
    VerifiedPayload,
};
pub use keywrap::WrappedKey;
pub use provider::{Decrypter, KeyWrapper, SignatureProvider, Verifier};
