//! # dagjose testkit
//!
//! Testing utilities for dagjose.
//!
//! ## Overview
//!
//! This crate provides:
//!
//! - **Golden vectors**: signed nodes whose bytes, CIDs and signatures are fixed
//! - **Generators**: Proptest strategies for documents, identities and CIDs
//! - **Fixtures**: an identity plus a memory store, with chain helpers
//! - **Fake IPFS**: an in-process block API server for `HttpStore` tests
//!
//! ## Golden Vectors
//!
//! ```rust
//! use dagjose_testkit::vectors::verify_all_vectors;
//!
//! for (name, matches, envelope) in verify_all_vectors() {
//!     assert!(matches, "{name}: {envelope}");
//! }
//! ```
//!
//! ## Property Testing
//!
//! ```rust,ignore
//! use proptest::prelude::*;
//! use dagjose_testkit::generators::NodeParams;
//!
//! proptest! {
//!     #[test]
//!     fn signing_is_deterministic(params: NodeParams) {
//!         let a = encode_signed(&params.document, &params.identity).unwrap();
//!         let b = encode_signed(&params.document, &params.identity).unwrap();
//!         prop_assert_eq!(a.link, b.link);
//!     }
//! }
//! ```
//!
//! ## Test Fixtures
//!
//! ```rust,no_run
//! use dagjose_testkit::fixtures::TestFixture;
//!
//! # async fn example() -> dagjose::Result<()> {
//! let fixture = TestFixture::golden();
//! let cids = fixture.signed_chain(&["world", "getting the hang of this"]).await?;
//! # Ok(())
//! # }
//! ```

pub mod fixtures;
pub mod generators;
pub mod ipfs;
pub mod vectors;

pub use fixtures::{golden_identity, hello, parties, TestFixture};
pub use generators::NodeParams;
pub use ipfs::{Behaviour, FakeIpfs};
pub use vectors::{all_vectors, verify_all_vectors, GoldenVector};
