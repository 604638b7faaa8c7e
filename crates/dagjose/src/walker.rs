//! The DAG walker: fetch, verify or decrypt, and follow `prev` links.
//!
//! Traversal is iterative. A [`ChainWalk`] yields one node per `next()`
//! call, newest first, and treats depth as data rather than stack. It stops
//! for good at the first error: nodes already yielded stay valid, but
//! nothing past a broken, tampered or cyclic link is returned.
//!
//! Envelope blocks are checked against their CID whatever the backend, so
//! a block swapped in place is a [`DagError::Integrity`] error. Payload
//! blocks of signed nodes are covered by the envelope's link check.

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use bytes::Bytes;
use tracing::{debug, warn};

use dagjose_core::{ContentId, Did, Document, Identity, Resolver};
use dagjose_envelope::{decrypt, verify_signed, Envelope, EnvelopeKind};
use dagjose_store::{Store, StoreError};

use crate::error::{DagError, Result};

/// How node envelopes are interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum WalkMode {
    /// Every node must be a signed envelope.
    Signed,
    /// Every node must be an encrypted envelope.
    Encrypted,
    /// Each node is decoded according to its own envelope tag.
    #[default]
    Sniff,
}

impl WalkMode {
    fn expected(self) -> Option<EnvelopeKind> {
        match self {
            WalkMode::Signed => Some(EnvelopeKind::Signed),
            WalkMode::Encrypted => Some(EnvelopeKind::Encrypted),
            WalkMode::Sniff => None,
        }
    }
}

impl fmt::Display for WalkMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WalkMode::Signed => f.write_str("signed"),
            WalkMode::Encrypted => f.write_str("encrypted"),
            WalkMode::Sniff => f.write_str("sniff"),
        }
    }
}

/// One decoded node of a chain.
#[derive(Debug, Clone, PartialEq)]
pub struct ChainNode {
    /// Envelope CID.
    pub cid: ContentId,
    pub kind: EnvelopeKind,
    pub document: Document,
    /// Payload block CID (signed nodes only).
    pub link: Option<ContentId>,
    /// Verified signers (signed nodes only).
    pub signers: Vec<Did>,
    /// Distance from the walk's root; the root is 0.
    pub depth: usize,
}

impl ChainNode {
    pub fn prev(&self) -> Option<&ContentId> {
        self.document.prev()
    }
}

/// Reads chains back out of a store.
pub struct DagWalker<S: Store + ?Sized> {
    pub(crate) store: Arc<S>,
    resolver: Arc<dyn Resolver>,
    max_depth: Option<usize>,
}

impl<S: Store + ?Sized> DagWalker<S> {
    pub fn new(store: Arc<S>, resolver: Arc<dyn Resolver>) -> Self {
        Self {
            store,
            resolver,
            max_depth: None,
        }
    }

    /// Refuse chains longer than `max` nodes.
    pub fn with_max_depth(mut self, max: Option<usize>) -> Self {
        self.max_depth = max;
        self
    }

    /// Decode a single node without following its `prev`.
    pub async fn open(&self, cid: &ContentId, mode: WalkMode, identity: &Identity) -> Result<ChainNode> {
        self.load(*cid, None, 0, mode, identity).await
    }

    /// Start a lazy walk from `root` towards the start of the chain.
    pub fn follow<'a>(&'a self, root: ContentId, mode: WalkMode, identity: &'a Identity) -> ChainWalk<'a, S> {
        ChainWalk {
            walker: self,
            identity,
            mode,
            next: Some((root, None)),
            visited: HashSet::new(),
            depth: 0,
        }
    }

    async fn load(
        &self,
        cid: ContentId,
        referenced_by: Option<ContentId>,
        depth: usize,
        mode: WalkMode,
        identity: &Identity,
    ) -> Result<ChainNode> {
        let bytes = self.fetch(cid, referenced_by, depth).await?;
        check_block(&cid, &bytes, depth)?;
        let envelope = Envelope::from_block(&bytes)?;
        if let Some(expected) = mode.expected() {
            if envelope.kind() != expected {
                return Err(DagError::ModeMismatch {
                    cid,
                    expected,
                    found: envelope.kind(),
                });
            }
        }

        match envelope {
            Envelope::Signed(env) => {
                let payload = self.fetch(env.link, Some(cid), depth).await?;
                let verified = verify_signed(&env, &payload, &*self.resolver)?;
                Ok(ChainNode {
                    cid,
                    kind: EnvelopeKind::Signed,
                    document: verified.document,
                    link: Some(verified.link),
                    signers: verified.signers,
                    depth,
                })
            }
            Envelope::Encrypted(env) => Ok(ChainNode {
                cid,
                kind: EnvelopeKind::Encrypted,
                document: decrypt(&env, identity)?,
                link: None,
                signers: Vec::new(),
                depth,
            }),
        }
    }

    /// Fetch a block, reporting a missing referenced block as a broken chain.
    pub(crate) async fn fetch(
        &self,
        cid: ContentId,
        referenced_by: Option<ContentId>,
        depth: usize,
    ) -> Result<Bytes> {
        match self.store.get(&cid).await {
            Ok(bytes) => Ok(bytes),
            Err(StoreError::NotFound(missing)) => match referenced_by {
                Some(referenced_by) => Err(DagError::BrokenChain {
                    missing,
                    referenced_by,
                    depth,
                }),
                None => Err(StoreError::NotFound(missing).into()),
            },
            Err(e) => Err(e.into()),
        }
    }
}

/// Fail unless `bytes` hash to `cid`.
pub(crate) fn check_block(cid: &ContentId, bytes: &[u8], depth: usize) -> Result<()> {
    if cid.verify(bytes) {
        Ok(())
    } else {
        warn!(%cid, depth, "block does not match its cid");
        Err(DagError::Integrity { cid: *cid, depth })
    }
}

/// A lazy, fused walk over one chain.
pub struct ChainWalk<'a, S: Store + ?Sized> {
    walker: &'a DagWalker<S>,
    identity: &'a Identity,
    mode: WalkMode,
    /// Next CID to load and the node that referenced it.
    next: Option<(ContentId, Option<ContentId>)>,
    visited: HashSet<ContentId>,
    depth: usize,
}

impl<'a, S: Store + ?Sized> ChainWalk<'a, S> {
    /// Load the next node. `None` once the chain start is reached or after
    /// an error has been returned.
    pub async fn next(&mut self) -> Option<Result<ChainNode>> {
        let (cid, referenced_by) = self.next.take()?;

        if !self.visited.insert(cid) {
            warn!(%cid, depth = self.depth, "cycle in chain");
            return Some(Err(DagError::Cycle {
                cid,
                depth: self.depth,
            }));
        }
        if let Some(max) = self.walker.max_depth {
            if self.depth >= max {
                return Some(Err(DagError::DepthExceeded(max)));
            }
        }

        match self
            .walker
            .load(cid, referenced_by, self.depth, self.mode, self.identity)
            .await
        {
            Ok(node) => {
                debug!(%cid, depth = self.depth, kind = %node.kind, "walked node");
                self.next = node.prev().map(|prev| (*prev, Some(cid)));
                self.depth += 1;
                Some(Ok(node))
            }
            Err(e) => {
                warn!(%cid, depth = self.depth, error = %e, "walk stopped");
                Some(Err(e))
            }
        }
    }

    /// Drain the walk into a vector, newest node first.
    pub async fn collect(mut self) -> Result<Vec<ChainNode>> {
        let mut nodes = Vec::new();
        while let Some(node) = self.next().await {
            nodes.push(node?);
        }
        Ok(nodes)
    }

    /// Nodes yielded so far.
    pub fn depth(&self) -> usize {
        self.depth
    }
}
