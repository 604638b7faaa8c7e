//! Store trait: the abstract interface for block persistence.
//!
//! Builders and walkers only ever see `dyn Store`, so backends are
//! interchangeable. Implementations include in-memory (tests, harness),
//! SQLite (local persistence) and an IPFS HTTP client (remote).

use async_trait::async_trait;
use bytes::Bytes;
use dagjose_core::{Codec, ContentId, HashAlgorithm};

use crate::error::Result;

/// The Store trait: async interface for content-addressed blocks.
///
/// All methods are async to support both blocking (SQLite) and remote
/// (HTTP) backends.
///
/// # Semantics
///
/// - **Content addressing**: `put` returns the CIDv1 of `data` under
///   `codec` and `hash`. Equal bytes, codec and hash give equal CIDs on
///   every backend.
/// - **Idempotent puts**: storing a block twice is not an error.
/// - **Immutable blocks**: there is no update or delete.
/// - **Pinning**: pinning an absent block is [`StoreError::NotFound`].
/// - **No retries**: a failing call fails once; retry policy belongs to
///   the caller.
///
/// [`StoreError::NotFound`]: crate::StoreError::NotFound
#[async_trait]
pub trait Store: Send + Sync {
    // ─────────────────────────────────────────────────────────────────────────
    // Block Operations
    // ─────────────────────────────────────────────────────────────────────────

    /// Store a block and return its content id.
    async fn put(&self, data: &[u8], codec: Codec, hash: HashAlgorithm) -> Result<ContentId>;

    /// Fetch a block by content id.
    async fn get(&self, cid: &ContentId) -> Result<Bytes>;

    /// Check whether a block is present.
    async fn has(&self, cid: &ContentId) -> Result<bool>;

    // ─────────────────────────────────────────────────────────────────────────
    // Pin Operations
    // ─────────────────────────────────────────────────────────────────────────

    /// Protect a stored block from garbage collection.
    async fn pin(&self, cid: &ContentId) -> Result<()>;

    /// Check whether a block is pinned.
    async fn is_pinned(&self, cid: &ContentId) -> Result<bool>;
}
