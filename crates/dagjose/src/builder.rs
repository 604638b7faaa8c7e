//! The DAG builder: encode, persist and pin chain nodes.
//!
//! Each `add_*` call is one honest dependency chain of store operations.
//! For a signed node the payload block is written before the envelope
//! that links to it, so a stored envelope never references a missing
//! block. An encrypted node is a single block.

use std::sync::Arc;

use rand::rngs::StdRng;
use rand::SeedableRng;
use tokio::sync::Mutex;
use tracing::debug;

use dagjose_core::{Codec, ContentId, Did, Document, HashAlgorithm, Resolver};
use dagjose_envelope::{encode_encrypted, encode_signed_with, Envelope, SignatureProvider};
use dagjose_store::{Store, StoreError};

use crate::error::{DagError, Result};

/// Configuration shared by builders and walkers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DagConfig {
    /// Hash algorithm for every block written.
    pub hash: HashAlgorithm,
    /// Pin blocks after writing them.
    pub pin: bool,
    /// Upper bound on walked chain length. `None` walks to the root.
    pub max_depth: Option<usize>,
}

impl Default for DagConfig {
    fn default() -> Self {
        Self {
            hash: HashAlgorithm::Sha2_256,
            pin: true,
            max_depth: None,
        }
    }
}

/// Writes signed and encrypted nodes into a store.
pub struct DagBuilder<S: Store + ?Sized> {
    store: Arc<S>,
    resolver: Arc<dyn Resolver>,
    config: DagConfig,
    rng: Mutex<StdRng>,
}

impl<S: Store + ?Sized> DagBuilder<S> {
    /// Create a builder with OS-seeded randomness.
    pub fn new(store: Arc<S>, resolver: Arc<dyn Resolver>, config: DagConfig) -> Self {
        Self {
            store,
            resolver,
            config,
            rng: Mutex::new(StdRng::from_entropy()),
        }
    }

    /// Seed the randomness used for content keys, nonces and ephemeral
    /// keys. Two builders with the same seed produce identical encrypted
    /// blocks for identical inputs.
    pub fn with_rng_seed(mut self, seed: u64) -> Self {
        self.rng = Mutex::new(StdRng::seed_from_u64(seed));
        self
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    pub fn config(&self) -> &DagConfig {
        &self.config
    }

    /// Sign `doc` and store it. Returns the envelope CID.
    pub async fn add_signed(&self, doc: &Document, signer: &dyn SignatureProvider) -> Result<ContentId> {
        self.add_signed_by(doc, &[signer]).await
    }

    /// Sign `doc` with several signers and store it.
    pub async fn add_signed_by(
        &self,
        doc: &Document,
        signers: &[&dyn SignatureProvider],
    ) -> Result<ContentId> {
        self.check_prev(doc).await?;

        let hash = self.config.hash;
        let blocks = encode_signed_with(doc, signers, hash)?;

        let link = self.store.put(&blocks.payload, Codec::DagCbor, hash).await?;
        if link != blocks.link {
            return Err(StoreError::CidMismatch {
                expected: blocks.link,
                actual: link,
            }
            .into());
        }
        let cid = self.store.put(&blocks.envelope, Codec::DagJose, hash).await?;

        if self.config.pin {
            self.store.pin(&link).await?;
            self.store.pin(&cid).await?;
        }

        debug!(%cid, %link, prev = ?doc.prev(), "added signed node");
        Ok(cid)
    }

    /// Encrypt `doc` for `recipients` and store it. Returns the envelope CID.
    pub async fn add_encrypted(&self, doc: &Document, recipients: &[Did]) -> Result<ContentId> {
        self.check_prev(doc).await?;

        let block = {
            let mut rng = self.rng.lock().await;
            encode_encrypted(doc, recipients, &*self.resolver, &mut *rng)?
        };

        let cid = self
            .store
            .put(&block, Codec::DagJose, self.config.hash)
            .await?;
        if self.config.pin {
            self.store.pin(&cid).await?;
        }

        debug!(%cid, recipients = recipients.len(), prev = ?doc.prev(), "added encrypted node");
        Ok(cid)
    }

    /// Store an envelope given in JOSE general JSON serialization.
    ///
    /// A signed envelope's payload block must already be in the store.
    /// Nothing is verified or decrypted here.
    pub async fn put_general_json(&self, json: &str) -> Result<ContentId> {
        let envelope = Envelope::from_general_json(json)?;
        if let Envelope::Signed(env) = &envelope {
            if !self.store.has(&env.link).await? {
                return Err(DagError::DanglingLink(env.link));
            }
        }

        let block = envelope.to_block()?;
        let cid = self
            .store
            .put(&block, Codec::DagJose, self.config.hash)
            .await?;
        if self.config.pin {
            self.store.pin(&cid).await?;
        }

        debug!(%cid, kind = %envelope.kind(), "stored json envelope");
        Ok(cid)
    }

    async fn check_prev(&self, doc: &Document) -> Result<()> {
        if let Some(prev) = doc.prev() {
            if !self.store.has(prev).await? {
                return Err(DagError::DanglingPrev(*prev));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dagjose_core::{DidKeyResolver, Identity};
    use dagjose_store::MemoryStore;

    fn builder() -> DagBuilder<MemoryStore> {
        DagBuilder::new(
            Arc::new(MemoryStore::new()),
            Arc::new(DidKeyResolver),
            DagConfig::default(),
        )
    }

    #[tokio::test]
    async fn test_signed_node_writes_two_pinned_blocks() {
        let builder = builder();
        let id = Identity::from_seed(&[1; 32]);

        let cid = builder
            .add_signed(&Document::new().with("hello", "world"), &id)
            .await
            .unwrap();

        let store = builder.store();
        assert_eq!(store.len(), 2);
        assert_eq!(cid.codec(), Some(Codec::DagJose));
        assert!(store.is_pinned(&cid).await.unwrap());
    }

    #[tokio::test]
    async fn test_encrypted_node_writes_one_block() {
        let builder = builder().with_rng_seed(1);
        let id = Identity::from_seed(&[1; 32]);

        let cid = builder
            .add_encrypted(&Document::new().with("hello", "secret"), &[id.did().clone()])
            .await
            .unwrap();

        assert_eq!(builder.store().len(), 1);
        assert!(builder.store().is_pinned(&cid).await.unwrap());
    }

    #[tokio::test]
    async fn test_unpinned_config() {
        let builder = DagBuilder::new(
            Arc::new(MemoryStore::new()),
            Arc::new(DidKeyResolver),
            DagConfig {
                pin: false,
                ..DagConfig::default()
            },
        );
        let id = Identity::from_seed(&[1; 32]);
        let cid = builder.add_signed(&Document::new(), &id).await.unwrap();
        assert!(!builder.store().is_pinned(&cid).await.unwrap());
    }

    #[tokio::test]
    async fn test_dangling_prev_rejected_without_writes() {
        let builder = builder();
        let id = Identity::from_seed(&[1; 32]);
        let ghost = ContentId::compute(Codec::DagJose, HashAlgorithm::Sha2_256, b"ghost").unwrap();

        let err = builder
            .add_signed(&Document::new().with_prev(ghost), &id)
            .await
            .unwrap_err();
        assert!(matches!(err, DagError::DanglingPrev(c) if c == ghost));
        assert!(builder.store().is_empty());
    }

    #[tokio::test]
    async fn test_seeded_builders_agree() {
        let id = Identity::from_seed(&[1; 32]);
        let doc = Document::new().with("hello", "secret");

        let a = builder()
            .with_rng_seed(42)
            .add_encrypted(&doc, &[id.did().clone()])
            .await
            .unwrap();
        let b = builder()
            .with_rng_seed(42)
            .add_encrypted(&doc, &[id.did().clone()])
            .await
            .unwrap();
        assert_eq!(a, b);
    }

    #[tokio::test]
    async fn test_json_envelope_needs_its_payload() {
        let id = Identity::from_seed(&[1; 32]);
        let source = builder();
        let cid = source.add_signed(&Document::new().with("a", 1i64), &id).await.unwrap();
        let block = source.store().get(&cid).await.unwrap();
        let json = Envelope::from_block(&block).unwrap().to_general_json().unwrap();

        let target = builder();
        let err = target.put_general_json(&json).await.unwrap_err();
        assert!(matches!(err, DagError::DanglingLink(_)));
        assert!(target.store().is_empty());

        let Envelope::Signed(env) = Envelope::from_block(&block).unwrap() else {
            panic!("expected a signed envelope");
        };
        let payload = source.store().get(&env.link).await.unwrap();
        target
            .store()
            .put(&payload, Codec::DagCbor, HashAlgorithm::Sha2_256)
            .await
            .unwrap();
        assert_eq!(target.put_general_json(&json).await.unwrap(), cid);
        assert!(target.store().is_pinned(&cid).await.unwrap());
    }

    #[tokio::test]
    async fn test_json_encrypted_envelope() {
        let id = Identity::from_seed(&[1; 32]);
        let source = builder().with_rng_seed(3);
        let cid = source
            .add_encrypted(&Document::new().with("hello", "secret"), &[id.did().clone()])
            .await
            .unwrap();
        let json = Envelope::from_block(&source.store().get(&cid).await.unwrap())
            .unwrap()
            .to_general_json()
            .unwrap();

        assert_eq!(builder().put_general_json(&json).await.unwrap(), cid);
    }

    #[tokio::test]
    async fn test_blake3_config() {
        let builder = DagBuilder::new(
            Arc::new(MemoryStore::new()),
            Arc::new(DidKeyResolver),
            DagConfig {
                hash: HashAlgorithm::Blake3,
                ..DagConfig::default()
            },
        );
        let id = Identity::from_seed(&[1; 32]);
        let cid = builder.add_signed(&Document::new(), &id).await.unwrap();
        assert_eq!(cid.hash_algorithm(), Some(HashAlgorithm::Blake3));
    }
}
