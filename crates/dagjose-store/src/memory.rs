//! In-memory implementation of the Store trait.
//!
//! Same semantics as the SQLite store, with no persistence. Used by tests
//! and as the local-process backend of the differential harness.

use std::collections::{HashMap, HashSet};
use std::sync::RwLock;

use async_trait::async_trait;
use bytes::Bytes;
use tracing::debug;

use dagjose_core::{Codec, ContentId, HashAlgorithm};

use crate::error::{Result, StoreError};
use crate::traits::Store;

/// In-memory store implementation.
///
/// All data is lost when the store is dropped. Thread-safe via RwLock.
#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<MemoryStoreInner>,
}

#[derive(Default)]
struct MemoryStoreInner {
    blocks: HashMap<ContentId, Bytes>,
    pins: HashSet<ContentId>,
}

impl MemoryStore {
    /// Create a new empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored blocks.
    pub fn len(&self) -> usize {
        self.inner.read().map(|inner| inner.blocks.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop a block, bypassing content addressing. Test support for
    /// simulating missing or garbage-collected blocks.
    #[cfg(any(test, feature = "test-utils"))]
    pub fn evict(&self, cid: &ContentId) -> bool {
        match self.inner.write() {
            Ok(mut inner) => {
                inner.pins.remove(cid);
                inner.blocks.remove(cid).is_some()
            }
            Err(_) => false,
        }
    }

    /// Overwrite a block's bytes in place. Test support for tamper checks.
    #[cfg(any(test, feature = "test-utils"))]
    pub fn corrupt(&self, cid: &ContentId, data: impl Into<Bytes>) -> bool {
        match self.inner.write() {
            Ok(mut inner) => match inner.blocks.get_mut(cid) {
                Some(slot) => {
                    *slot = data.into();
                    true
                }
                None => false,
            },
            Err(_) => false,
        }
    }

    fn read(&self) -> Result<std::sync::RwLockReadGuard<'_, MemoryStoreInner>> {
        self.inner.read().map_err(|e| poisoned(&e))
    }

    fn write(&self) -> Result<std::sync::RwLockWriteGuard<'_, MemoryStoreInner>> {
        self.inner.write().map_err(|e| poisoned(&e))
    }
}

fn poisoned(e: &dyn std::fmt::Display) -> StoreError {
    StoreError::Unavailable(format!("lock poisoned: {e}"))
}

#[async_trait]
impl Store for MemoryStore {
    async fn put(&self, data: &[u8], codec: Codec, hash: HashAlgorithm) -> Result<ContentId> {
        let cid = ContentId::compute(codec, hash, data)?;
        let mut inner = self.write()?;
        inner
            .blocks
            .entry(cid)
            .or_insert_with(|| Bytes::copy_from_slice(data));
        debug!(%cid, len = data.len(), "memory put");
        Ok(cid)
    }

    async fn get(&self, cid: &ContentId) -> Result<Bytes> {
        self.read()?
            .blocks
            .get(cid)
            .cloned()
            .ok_or(StoreError::NotFound(*cid))
    }

    async fn has(&self, cid: &ContentId) -> Result<bool> {
        Ok(self.read()?.blocks.contains_key(cid))
    }

    async fn pin(&self, cid: &ContentId) -> Result<()> {
        let mut inner = self.write()?;
        if !inner.blocks.contains_key(cid) {
            return Err(StoreError::NotFound(*cid));
        }
        inner.pins.insert(*cid);
        Ok(())
    }

    async fn is_pinned(&self, cid: &ContentId) -> Result<bool> {
        Ok(self.read()?.pins.contains(cid))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_put_get() {
        let store = MemoryStore::new();
        let cid = store
            .put(b"block", Codec::Raw, HashAlgorithm::Sha2_256)
            .await
            .unwrap();

        assert_eq!(
            cid,
            ContentId::compute(Codec::Raw, HashAlgorithm::Sha2_256, b"block").unwrap()
        );
        assert_eq!(store.get(&cid).await.unwrap(), Bytes::from_static(b"block"));
        assert!(store.has(&cid).await.unwrap());
    }

    #[tokio::test]
    async fn test_idempotent_put() {
        let store = MemoryStore::new();
        let a = store.put(b"x", Codec::Raw, HashAlgorithm::Blake3).await.unwrap();
        let b = store.put(b"x", Codec::Raw, HashAlgorithm::Blake3).await.unwrap();
        assert_eq!(a, b);
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn test_hash_algorithm_changes_cid() {
        let store = MemoryStore::new();
        let a = store.put(b"x", Codec::Raw, HashAlgorithm::Sha2_256).await.unwrap();
        let b = store.put(b"x", Codec::Raw, HashAlgorithm::Blake3).await.unwrap();
        assert_ne!(a, b);
        assert_eq!(store.len(), 2);
    }

    #[tokio::test]
    async fn test_get_missing() {
        let store = MemoryStore::new();
        let cid = ContentId::compute(Codec::Raw, HashAlgorithm::Sha2_256, b"nope").unwrap();
        assert!(matches!(store.get(&cid).await, Err(StoreError::NotFound(c)) if c == cid));
        assert!(!store.has(&cid).await.unwrap());
    }

    #[tokio::test]
    async fn test_pin() {
        let store = MemoryStore::new();
        let cid = store.put(b"p", Codec::Raw, HashAlgorithm::Sha2_256).await.unwrap();
        assert!(!store.is_pinned(&cid).await.unwrap());
        store.pin(&cid).await.unwrap();
        assert!(store.is_pinned(&cid).await.unwrap());

        let absent = ContentId::compute(Codec::Raw, HashAlgorithm::Sha2_256, b"q").unwrap();
        assert!(matches!(store.pin(&absent).await, Err(StoreError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_evict_and_corrupt() {
        let store = MemoryStore::new();
        let cid = store.put(b"v", Codec::Raw, HashAlgorithm::Sha2_256).await.unwrap();

        assert!(store.corrupt(&cid, &b"w"[..]));
        assert_eq!(store.get(&cid).await.unwrap(), Bytes::from_static(b"w"));

        assert!(store.evict(&cid));
        assert!(!store.has(&cid).await.unwrap());
        assert!(!store.evict(&cid));
    }
}
