//! # dagjose
//!
//! Linked chains of signed and encrypted documents in a content-addressed
//! store.
//!
//! ## Overview
//!
//! - [`DagBuilder`] encodes a document into a DAG-JOSE envelope, persists
//!   it (payload block first for signed nodes) and pins it
//! - [`DagWalker`] fetches a node, verifies or decrypts it, and follows
//!   its `prev` link back to the start of the chain, or resolves an IPLD
//!   path such as `/link/prev` through envelopes and documents
//!
//! A chain is built newest-last: each node's CID is only known once the
//! previous node is stored, and goes into the next document's `prev`.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use dagjose::{DagBuilder, DagConfig, DagWalker, WalkMode};
//! use dagjose::core::{DidKeyResolver, Document, Identity};
//! use dagjose::store::MemoryStore;
//!
//! async fn example() -> dagjose::Result<()> {
//!     let store = Arc::new(MemoryStore::new());
//!     let resolver = Arc::new(DidKeyResolver);
//!     let identity = Identity::generate();
//!
//!     let builder = DagBuilder::new(store.clone(), resolver.clone(), DagConfig::default());
//!     let first = builder
//!         .add_signed(&Document::new().with("hello", "world"), &identity)
//!         .await?;
//!     let second = builder
//!         .add_signed(
//!             &Document::new().with("hello", "getting the hang of this").with_prev(first),
//!             &identity,
//!         )
//!         .await?;
//!
//!     let walker = DagWalker::new(store, resolver);
//!     let nodes = walker.follow(second, WalkMode::Signed, &identity).collect().await?;
//!     assert_eq!(nodes.len(), 2);
//!     Ok(())
//! }
//! ```
//!
//! ## Re-exports
//!
//! - `dagjose::core` - content ids, documents, identities
//! - `dagjose::envelope` - JWS/JWE envelope codec
//! - `dagjose::store` - store trait and backends

pub mod builder;
pub mod error;
pub mod path;
pub mod walker;

pub use dagjose_core as core;
pub use dagjose_envelope as envelope;
pub use dagjose_store as store;

pub use builder::{DagBuilder, DagConfig};
pub use error::{DagError, Result};
pub use path::Resolved;
pub use walker::{ChainNode, ChainWalk, DagWalker, WalkMode};

pub use dagjose_core::{ContentId, Did, Document, HashAlgorithm, Identity, Value};
pub use dagjose_envelope::EnvelopeKind;
