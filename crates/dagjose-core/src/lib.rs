//! # dagjose-core
//!
//! Pure primitives for building chains of signed and encrypted documents
//! in a content-addressed store.
//!
//! This crate does no I/O. It covers:
//!
//! - [`ContentId`] - CIDv1 addresses tagged with codec and hash algorithm
//! - [`Document`] / [`Value`] - payload model with an explicit `prev` link
//! - [`canonical`] - strict, deterministic DAG-CBOR encoding
//! - [`Identity`] / [`Did`] - Ed25519 + X25519 key custody behind a `did:key`
//! - [`Resolver`] - identifier to key material lookup
//!
//! ## Determinism
//!
//! Structurally equal documents always encode to the same bytes, and so to
//! the same [`ContentId`]. Decoding rejects any non-canonical input.

pub mod canonical;
pub mod cid;
pub mod crypto;
pub mod document;
pub mod error;
pub mod identity;

pub use canonical::{decode_document, document_block, encode_document};
pub use cid::{Codec, ContentId, HashAlgorithm};
pub use crypto::{Ed25519PublicKey, Ed25519Signature, X25519PublicKey};
pub use document::{Document, Value};
pub use error::{EncodingError, IdentityError};
pub use identity::{Did, DidKeyResolver, Identity, PublicKeys, Resolver, StaticResolver};
