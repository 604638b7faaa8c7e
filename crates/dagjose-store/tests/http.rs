//! HttpStore against an in-process fake daemon.

use std::time::Duration;

use bytes::Bytes;
use dagjose_core::{Codec, ContentId, HashAlgorithm};
use dagjose_store::{HttpStore, HttpStoreConfig, MemoryStore, Store, StoreError};
use dagjose_testkit::ipfs::{Behaviour, FakeIpfs};

fn client(daemon: &FakeIpfs) -> HttpStore {
    let config = HttpStoreConfig::new(daemon.url()).with_timeout(Duration::from_secs(5));
    HttpStore::new(&config).unwrap()
}

#[tokio::test]
async fn test_put_get_roundtrip() {
    let daemon = FakeIpfs::spawn().await.unwrap();
    let store = client(&daemon);

    let cid = store
        .put(b"envelope", Codec::DagJose, HashAlgorithm::Sha2_256)
        .await
        .unwrap();
    assert_eq!(cid.codec(), Some(Codec::DagJose));
    assert_eq!(daemon.block_count(), 1);

    assert_eq!(store.get(&cid).await.unwrap(), Bytes::from_static(b"envelope"));
    assert!(store.has(&cid).await.unwrap());
}

#[tokio::test]
async fn test_same_cid_as_memory_store() {
    let daemon = FakeIpfs::spawn().await.unwrap();
    let remote = client(&daemon);
    let local = MemoryStore::new();

    for hash in [HashAlgorithm::Sha2_256, HashAlgorithm::Blake3] {
        let a = remote.put(b"same", Codec::DagCbor, hash).await.unwrap();
        let b = local.put(b"same", Codec::DagCbor, hash).await.unwrap();
        assert_eq!(a, b);
    }
}

#[tokio::test]
async fn test_missing_block() {
    let daemon = FakeIpfs::spawn().await.unwrap();
    let store = client(&daemon);
    let cid = ContentId::compute(Codec::Raw, HashAlgorithm::Sha2_256, b"absent").unwrap();

    assert!(matches!(store.get(&cid).await, Err(StoreError::NotFound(c)) if c == cid));
    assert!(!store.has(&cid).await.unwrap());
    assert!(matches!(store.pin(&cid).await, Err(StoreError::NotFound(_))));
}

#[tokio::test]
async fn test_pin() {
    let daemon = FakeIpfs::spawn().await.unwrap();
    let store = client(&daemon);
    let cid = store.put(b"keep", Codec::Raw, HashAlgorithm::Sha2_256).await.unwrap();

    assert!(!store.is_pinned(&cid).await.unwrap());
    store.pin(&cid).await.unwrap();
    assert!(store.is_pinned(&cid).await.unwrap());
    assert!(daemon.is_pinned(&cid));
}

#[tokio::test]
async fn test_daemon_with_other_hash_is_rejected() {
    let daemon = FakeIpfs::spawn_with(Behaviour::ForceHash(HashAlgorithm::Blake3))
        .await
        .unwrap();
    let store = client(&daemon);

    let err = store
        .put(b"x", Codec::Raw, HashAlgorithm::Sha2_256)
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::CidMismatch { .. }));
}

#[tokio::test]
async fn test_corrupt_reads_are_rejected() {
    let daemon = FakeIpfs::spawn_with(Behaviour::CorruptReads).await.unwrap();
    let store = client(&daemon);
    let cid = store.put(b"x", Codec::Raw, HashAlgorithm::Sha2_256).await.unwrap();

    assert!(matches!(store.get(&cid).await, Err(StoreError::InvalidData(_))));
}
