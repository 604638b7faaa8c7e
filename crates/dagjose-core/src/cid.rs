//! Content identifiers.
//!
//! Every block is addressed by a CIDv1: `version || codec || multihash`.
//! The multihash carries its own algorithm tag, so blocks hashed with
//! different algorithms never alias each other and a store can add
//! algorithms without invalidating existing ids.

use std::fmt;
use std::str::FromStr;

use cid::Cid;
use multihash::Multihash;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha2::{Digest, Sha256};

use crate::error::{EncodingError, Result};

/// Multicodec tag describing how a block's bytes are encoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Codec {
    /// Opaque bytes.
    Raw,
    /// Canonical DAG-CBOR (payload blocks).
    DagCbor,
    /// DAG-JOSE (signed and encrypted envelopes).
    DagJose,
}

impl Codec {
    pub const fn code(self) -> u64 {
        match self {
            Codec::Raw => 0x55,
            Codec::DagCbor => 0x71,
            Codec::DagJose => 0x85,
        }
    }

    pub const fn from_code(code: u64) -> Option<Self> {
        match code {
            0x55 => Some(Codec::Raw),
            0x71 => Some(Codec::DagCbor),
            0x85 => Some(Codec::DagJose),
            _ => None,
        }
    }

    /// Name used by the IPFS HTTP API (`cid-codec=` parameter).
    pub const fn name(self) -> &'static str {
        match self {
            Codec::Raw => "raw",
            Codec::DagCbor => "dag-cbor",
            Codec::DagJose => "dag-jose",
        }
    }
}

impl fmt::Display for Codec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A 256-bit hash algorithm with its multihash tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum HashAlgorithm {
    #[default]
    #[serde(rename = "sha2-256")]
    Sha2_256,
    #[serde(rename = "blake3")]
    Blake3,
}

impl HashAlgorithm {
    pub const fn code(self) -> u64 {
        match self {
            HashAlgorithm::Sha2_256 => 0x12,
            HashAlgorithm::Blake3 => 0x1e,
        }
    }

    pub const fn from_code(code: u64) -> Option<Self> {
        match code {
            0x12 => Some(HashAlgorithm::Sha2_256),
            0x1e => Some(HashAlgorithm::Blake3),
            _ => None,
        }
    }

    /// Name used by the IPFS HTTP API (`mhtype=` parameter).
    pub const fn name(self) -> &'static str {
        match self {
            HashAlgorithm::Sha2_256 => "sha2-256",
            HashAlgorithm::Blake3 => "blake3",
        }
    }

    /// Compute the 32-byte digest of `data`.
    pub fn digest(self, data: &[u8]) -> [u8; 32] {
        match self {
            HashAlgorithm::Sha2_256 => {
                let mut out = [0u8; 32];
                out.copy_from_slice(&Sha256::digest(data));
                out
            }
            HashAlgorithm::Blake3 => *blake3::hash(data).as_bytes(),
        }
    }
}

impl fmt::Display for HashAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for HashAlgorithm {
    type Err = EncodingError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "sha2-256" | "sha256" => Ok(HashAlgorithm::Sha2_256),
            "blake3" => Ok(HashAlgorithm::Blake3),
            other => Err(EncodingError::Unsupported(format!("hash algorithm {other}"))),
        }
    }
}

/// A CIDv1 addressing one immutable block.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContentId(Cid);

impl ContentId {
    /// Address `data` under the given codec and hash algorithm.
    pub fn compute(codec: Codec, hash: HashAlgorithm, data: &[u8]) -> Result<Self> {
        let digest = hash.digest(data);
        let mh = Multihash::<64>::wrap(hash.code(), &digest)
            .map_err(|e| EncodingError::InvalidCid(e.to_string()))?;
        Ok(Self(Cid::new_v1(codec.code(), mh)))
    }

    /// Parse the binary form (`0x01 || codec || multihash`).
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let cid = Cid::try_from(bytes).map_err(|e| EncodingError::InvalidCid(e.to_string()))?;
        Ok(Self(cid))
    }

    /// Binary form.
    pub fn to_bytes(&self) -> Vec<u8> {
        self.0.to_bytes()
    }

    pub fn codec(&self) -> Option<Codec> {
        Codec::from_code(self.0.codec())
    }

    pub fn hash_algorithm(&self) -> Option<HashAlgorithm> {
        HashAlgorithm::from_code(self.0.hash().code())
    }

    /// The raw digest carried in the multihash.
    pub fn digest(&self) -> &[u8] {
        self.0.hash().digest()
    }

    /// Digest as lowercase hex.
    pub fn to_hex(&self) -> String {
        hex::encode(self.digest())
    }

    /// Check that `data` hashes to this id under its own algorithm.
    ///
    /// Returns false for algorithms this crate does not implement.
    pub fn verify(&self, data: &[u8]) -> bool {
        match self.hash_algorithm() {
            Some(hash) => hash.digest(data).as_slice() == self.digest(),
            None => false,
        }
    }

    pub fn as_cid(&self) -> &Cid {
        &self.0
    }
}

impl fmt::Display for ContentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Debug for ContentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ContentId({})", self.0)
    }
}

impl FromStr for ContentId {
    type Err = EncodingError;

    fn from_str(s: &str) -> Result<Self> {
        let cid = Cid::try_from(s).map_err(|e| EncodingError::InvalidCid(e.to_string()))?;
        Ok(Self(cid))
    }
}

impl From<Cid> for ContentId {
    fn from(cid: Cid) -> Self {
        Self(cid)
    }
}

impl From<ContentId> for Cid {
    fn from(id: ContentId) -> Self {
        id.0
    }
}

impl Serialize for ContentId {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for ContentId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compute_is_deterministic() {
        let a = ContentId::compute(Codec::DagCbor, HashAlgorithm::Sha2_256, b"block").unwrap();
        let b = ContentId::compute(Codec::DagCbor, HashAlgorithm::Sha2_256, b"block").unwrap();
        assert_eq!(a, b);
        assert_eq!(a.to_string(), b.to_string());
    }

    #[test]
    fn test_hash_algorithm_is_tagged() {
        let sha = ContentId::compute(Codec::Raw, HashAlgorithm::Sha2_256, b"x").unwrap();
        let b3 = ContentId::compute(Codec::Raw, HashAlgorithm::Blake3, b"x").unwrap();
        assert_ne!(sha, b3);
        assert_eq!(sha.hash_algorithm(), Some(HashAlgorithm::Sha2_256));
        assert_eq!(b3.hash_algorithm(), Some(HashAlgorithm::Blake3));
        assert!(sha.verify(b"x"));
        assert!(b3.verify(b"x"));
        assert!(!b3.verify(b"y"));
    }

    #[test]
    fn test_codec_is_tagged() {
        let cbor = ContentId::compute(Codec::DagCbor, HashAlgorithm::Sha2_256, b"x").unwrap();
        let jose = ContentId::compute(Codec::DagJose, HashAlgorithm::Sha2_256, b"x").unwrap();
        assert_ne!(cbor, jose);
        assert_eq!(cbor.digest(), jose.digest());
        assert_eq!(jose.codec(), Some(Codec::DagJose));
    }

    #[test]
    fn test_string_and_bytes_roundtrip() {
        let id = ContentId::compute(Codec::DagJose, HashAlgorithm::Blake3, b"hello").unwrap();
        let s = id.to_string();
        assert!(s.starts_with('b'));
        assert_eq!(s.parse::<ContentId>().unwrap(), id);
        assert_eq!(ContentId::from_bytes(&id.to_bytes()).unwrap(), id);
    }

    #[test]
    fn test_dag_cbor_prefix() {
        // CIDv1, dag-cbor, sha2-256, 32-byte digest
        let id = ContentId::compute(Codec::DagCbor, HashAlgorithm::Sha2_256, b"").unwrap();
        assert_eq!(&id.to_bytes()[..4], &[0x01, 0x71, 0x12, 0x20]);
        assert!(id.to_string().starts_with("bafyrei"));
    }

    #[test]
    fn test_rejects_garbage() {
        assert!(ContentId::from_bytes(&[0xff, 0x00]).is_err());
        assert!("not-a-cid".parse::<ContentId>().is_err());
    }

    #[test]
    fn test_hash_algorithm_from_str() {
        assert_eq!("sha2-256".parse::<HashAlgorithm>().unwrap(), HashAlgorithm::Sha2_256);
        assert_eq!("blake3".parse::<HashAlgorithm>().unwrap(), HashAlgorithm::Blake3);
        assert!("md5".parse::<HashAlgorithm>().is_err());
    }
}
