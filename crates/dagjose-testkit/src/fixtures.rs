//! Test fixtures and helpers.
//!
//! Common setup code for integration tests.

use std::sync::Arc;

use dagjose::{DagBuilder, DagConfig, DagWalker};
use dagjose_core::{ContentId, Did, DidKeyResolver, Document, Identity, Resolver};
use dagjose_store::MemoryStore;

/// Passphrase whose SHA-256 is the seed of the golden identity.
pub const GOLDEN_PASSPHRASE: &str = "me secret string to provide entropy";

/// RNG seed fixture builders use for encryption.
pub const FIXTURE_RNG_SEED: u64 = 7;

/// The identity every golden vector is signed with.
pub fn golden_identity() -> Identity {
    Identity::from_passphrase(GOLDEN_PASSPHRASE)
}

/// `{hello: <message>}`.
pub fn hello(message: &str) -> Document {
    Document::new().with("hello", message)
}

/// An identity, a memory store and a `did:key` resolver.
pub struct TestFixture {
    pub identity: Identity,
    pub store: Arc<MemoryStore>,
    pub resolver: Arc<dyn Resolver>,
}

impl TestFixture {
    /// Create a new test fixture with a random identity.
    pub fn new() -> Self {
        Self::with_identity(Identity::generate())
    }

    /// Create with a deterministic identity from seed.
    pub fn with_seed(seed: [u8; 32]) -> Self {
        Self::with_identity(Identity::from_seed(&seed))
    }

    /// Create with the golden identity.
    pub fn golden() -> Self {
        Self::with_identity(golden_identity())
    }

    pub fn with_identity(identity: Identity) -> Self {
        Self {
            identity,
            store: Arc::new(MemoryStore::new()),
            resolver: Arc::new(DidKeyResolver),
        }
    }

    pub fn did(&self) -> &Did {
        self.identity.did()
    }

    /// A builder over the fixture store with seeded randomness.
    pub fn builder(&self) -> DagBuilder<MemoryStore> {
        DagBuilder::new(self.store.clone(), self.resolver.clone(), DagConfig::default())
            .with_rng_seed(FIXTURE_RNG_SEED)
    }

    pub fn walker(&self) -> DagWalker<MemoryStore> {
        DagWalker::new(self.store.clone(), self.resolver.clone())
    }

    /// Build a signed chain of `{hello: ..}` documents. CIDs are returned
    /// oldest first; the last one is the chain head.
    pub async fn signed_chain(&self, messages: &[&str]) -> dagjose::Result<Vec<ContentId>> {
        let builder = self.builder();
        let mut cids: Vec<ContentId> = Vec::with_capacity(messages.len());
        for message in messages {
            let mut doc = hello(message);
            if let Some(prev) = cids.last() {
                doc = doc.with_prev(*prev);
            }
            cids.push(builder.add_signed(&doc, &self.identity).await?);
        }
        Ok(cids)
    }

    /// Build an encrypted chain for `recipients`, oldest first.
    pub async fn encrypted_chain(
        &self,
        messages: &[&str],
        recipients: &[Did],
    ) -> dagjose::Result<Vec<ContentId>> {
        let builder = self.builder();
        let mut cids: Vec<ContentId> = Vec::with_capacity(messages.len());
        for message in messages {
            let mut doc = hello(message);
            if let Some(prev) = cids.last() {
                doc = doc.with_prev(*prev);
            }
            cids.push(builder.add_encrypted(&doc, recipients).await?);
        }
        Ok(cids)
    }
}

impl Default for TestFixture {
    fn default() -> Self {
        Self::new()
    }
}

/// Deterministic, distinct identities for multi-party tests.
pub fn parties(count: usize) -> Vec<Identity> {
    (0..count)
        .map(|i| {
            let mut seed = [0u8; 32];
            seed[0] = i as u8;
            seed[1] = 0xd1;
            Identity::from_seed(&seed)
        })
        .collect()
}
