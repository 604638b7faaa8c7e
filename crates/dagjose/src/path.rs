//! IPLD-style path resolution through envelopes and documents.
//!
//! `resolve(cid, "/link/prev")` starts at a block and walks one segment at
//! a time, following every link it meets the way an IPLD `dag get` does:
//!
//! - a signed envelope exposes `link` (followed to the payload document)
//!   and `payload` (the link's bytes)
//! - an encrypted envelope exposes its binary members `ciphertext`, `iv`,
//!   `protected` and `tag`
//! - a document exposes `prev` and its fields; maps and lists nest
//!
//! Resolution is structural. Blocks are checked against their CIDs but
//! signatures are not verified and nothing is decrypted; use
//! [`DagWalker::open`] for that.

use dagjose_core::{decode_document, Codec, ContentId, Document, Value};
use dagjose_envelope::{Envelope, EnvelopeError};
use dagjose_store::Store;
use tracing::debug;

use crate::error::{DagError, Result};
use crate::walker::{check_block, DagWalker};

/// The node a path ends at.
#[derive(Debug, Clone, PartialEq)]
pub enum Resolved {
    /// A dag-jose block.
    Envelope { cid: ContentId, envelope: Envelope },
    /// A dag-cbor document block.
    Document { cid: ContentId, document: Document },
    /// A value inside a document or envelope.
    Value(Value),
}

impl<S: Store + ?Sized> DagWalker<S> {
    /// Resolve `path` starting at the block `cid`.
    ///
    /// An empty path (or `/`) returns the block itself.
    pub async fn resolve(&self, cid: &ContentId, path: &str) -> Result<Resolved> {
        let mut current = self.resolve_block(*cid, 0).await?;

        for (hop, segment) in path.split('/').filter(|s| !s.is_empty()).enumerate() {
            let next = step(&current, segment).ok_or_else(|| DagError::PathNotFound {
                path: path.to_owned(),
                segment: segment.to_owned(),
            })?;
            current = match next {
                Value::Link(link) => self.resolve_block(link, hop + 1).await?,
                value => Resolved::Value(value),
            };
        }

        debug!(%cid, path, "resolved path");
        Ok(current)
    }

    async fn resolve_block(&self, cid: ContentId, hop: usize) -> Result<Resolved> {
        let bytes = self.fetch(cid, None, hop).await?;
        check_block(&cid, &bytes, hop)?;

        match cid.codec() {
            Some(Codec::DagJose) => Ok(Resolved::Envelope {
                cid,
                envelope: Envelope::from_block(&bytes)?,
            }),
            Some(Codec::DagCbor) => Ok(Resolved::Document {
                cid,
                document: decode_document(&bytes).map_err(EnvelopeError::from)?,
            }),
            _ => Ok(Resolved::Value(Value::Bytes(bytes.to_vec()))),
        }
    }
}

/// One segment below `node`. Links come back unresolved.
fn step(node: &Resolved, segment: &str) -> Option<Value> {
    match node {
        Resolved::Envelope {
            envelope: Envelope::Signed(env),
            ..
        } => match segment {
            "link" => Some(Value::Link(env.link)),
            "payload" => Some(Value::Bytes(env.link.to_bytes())),
            _ => None,
        },
        Resolved::Envelope {
            envelope: Envelope::Encrypted(env),
            ..
        } => match segment {
            "ciphertext" => Some(Value::Bytes(env.ciphertext.clone())),
            "iv" => Some(Value::Bytes(env.iv.as_bytes().to_vec())),
            "protected" => Some(Value::Bytes(env.protected.clone())),
            "tag" => Some(Value::Bytes(env.tag.to_vec())),
            _ => None,
        },
        Resolved::Document { document, .. } => match segment {
            "prev" => document.prev().copied().map(Value::Link),
            key => document.get(key).cloned(),
        },
        Resolved::Value(Value::Map(map)) => map.get(segment).cloned(),
        Resolved::Value(Value::List(items)) => segment
            .parse::<usize>()
            .ok()
            .and_then(|i| items.get(i))
            .cloned(),
        Resolved::Value(_) => None,
    }
}
