//! # dagjose-store
//!
//! Content-addressed block storage for dag-jose chains.
//!
//! ## Key Types
//!
//! - [`Store`] - the async trait every backend implements
//! - [`MemoryStore`] - local-process store, no persistence
//! - [`SqliteStore`] - local persistent store
//! - [`HttpStore`] - client for an IPFS daemon's RPC API
//!
//! ## Usage
//!
//! ```rust,no_run
//! use dagjose_core::{Codec, HashAlgorithm};
//! use dagjose_store::{SqliteStore, Store};
//!
//! async fn example() -> dagjose_store::Result<()> {
//!     let store = SqliteStore::open("blocks.db")?;
//!     let cid = store.put(b"hello", Codec::Raw, HashAlgorithm::Sha2_256).await?;
//!     store.pin(&cid).await?;
//!     assert_eq!(&store.get(&cid).await?[..], b"hello");
//!     Ok(())
//! }
//! ```
//!
//! ## Design Notes
//!
//! - **Interchangeable**: for the same bytes, codec and hash every backend
//!   returns the same CID.
//! - **At most once**: backends never retry; failures surface to the caller.

pub mod error;
pub mod http;
pub mod memory;
pub mod migration;
pub mod sqlite;
pub mod traits;

pub use error::{Result, StoreError};
pub use http::{HttpStore, HttpStoreConfig};
pub use memory::MemoryStore;
pub use sqlite::SqliteStore;
pub use traits::Store;
