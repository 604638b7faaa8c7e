//! Identities and identifier resolution.
//!
//! An [`Identity`] holds an Ed25519 signing key and the X25519
//! key-agreement secret derived from the same seed. It is addressed by a
//! `did:key` identifier that embeds the public key, so resolution is a pure
//! decoding step ([`DidKeyResolver`]) with no network involved.

use std::collections::HashMap;
use std::fmt;

use ed25519_dalek::{Signer, SigningKey};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256, Sha512};
use x25519_dalek::StaticSecret;

use crate::crypto::{Ed25519PublicKey, Ed25519Signature, X25519PublicKey};
use crate::error::IdentityError;

/// Multicodec prefix for an Ed25519 public key (varint 0xed).
const ED25519_MULTICODEC: [u8; 2] = [0xed, 0x01];

const DID_KEY_PREFIX: &str = "did:key:";

/// A `did:key` identifier for an Ed25519 key.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Did(String);

impl Did {
    /// Build the identifier for a public key.
    pub fn from_public_key(key: &Ed25519PublicKey) -> Self {
        let mut buf = Vec::with_capacity(34);
        buf.extend_from_slice(&ED25519_MULTICODEC);
        buf.extend_from_slice(key.as_bytes());
        Self(format!(
            "{DID_KEY_PREFIX}{}",
            multibase::encode(multibase::Base::Base58Btc, buf)
        ))
    }

    /// Parse and validate an identifier.
    pub fn parse(s: &str) -> Result<Self, IdentityError> {
        let did = Self(s.to_owned());
        did.public_key()?;
        Ok(did)
    }

    /// Recover the identifier from a key id of the form `did#fragment`.
    pub fn from_key_id(kid: &str) -> Result<Self, IdentityError> {
        let (did, fragment) = kid
            .split_once('#')
            .ok_or_else(|| IdentityError::Malformed(format!("key id without fragment: {kid}")))?;
        let did = Self::parse(did)?;
        if did.method_specific_id() != fragment {
            return Err(IdentityError::Malformed(format!(
                "key id fragment does not name the identifier key: {kid}"
            )));
        }
        Ok(did)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The part after `did:key:` (a multibase-encoded key).
    pub fn method_specific_id(&self) -> &str {
        self.0.strip_prefix(DID_KEY_PREFIX).unwrap_or(&self.0)
    }

    /// Key id used in JOSE headers: `did:key:z...#z...`.
    pub fn key_id(&self) -> String {
        format!("{}#{}", self.0, self.method_specific_id())
    }

    /// Decode the Ed25519 public key embedded in the identifier.
    pub fn public_key(&self) -> Result<Ed25519PublicKey, IdentityError> {
        let Some(encoded) = self.0.strip_prefix(DID_KEY_PREFIX) else {
            return match self.0.strip_prefix("did:") {
                Some(rest) => Err(IdentityError::UnsupportedMethod(
                    rest.split(':').next().unwrap_or_default().to_owned(),
                )),
                None => Err(IdentityError::Malformed(self.0.clone())),
            };
        };

        let (base, bytes) =
            multibase::decode(encoded).map_err(|e| IdentityError::Malformed(e.to_string()))?;
        if base != multibase::Base::Base58Btc {
            return Err(IdentityError::Malformed("did:key must be base58btc".into()));
        }
        let key = bytes
            .strip_prefix(&ED25519_MULTICODEC)
            .ok_or_else(|| IdentityError::UnsupportedMethod("did:key with non-Ed25519 key".into()))?;
        let key: [u8; 32] = key.try_into().map_err(|_| IdentityError::InvalidPublicKey)?;
        Ok(Ed25519PublicKey(key))
    }
}

impl fmt::Display for Did {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for Did {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Did({})", self.0)
    }
}

impl TryFrom<String> for Did {
    type Error = IdentityError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::parse(&s)
    }
}

impl From<Did> for String {
    fn from(did: Did) -> Self {
        did.0
    }
}

/// Key material needed to verify signatures from, or wrap keys for, an identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PublicKeys {
    pub signing: Ed25519PublicKey,
    pub agreement: X25519PublicKey,
}

/// Resolves an identifier to its public key material.
///
/// Implementations are pure lookups; caching and retries belong to them.
pub trait Resolver: Send + Sync {
    fn resolve(&self, did: &Did) -> Result<PublicKeys, IdentityError>;
}

/// Offline resolver for `did:key` identifiers.
#[derive(Debug, Clone, Copy, Default)]
pub struct DidKeyResolver;

impl Resolver for DidKeyResolver {
    fn resolve(&self, did: &Did) -> Result<PublicKeys, IdentityError> {
        let signing = did.public_key()?;
        let agreement = signing.to_x25519()?;
        Ok(PublicKeys { signing, agreement })
    }
}

/// Resolver over a fixed set of known identities.
///
/// Anything not registered is [`IdentityError::Unresolved`].
#[derive(Debug, Clone, Default)]
pub struct StaticResolver {
    known: HashMap<Did, PublicKeys>,
}

impl StaticResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, identity: &Identity) -> Self {
        self.insert(identity);
        self
    }

    pub fn insert(&mut self, identity: &Identity) {
        self.known.insert(identity.did().clone(), identity.public_keys());
    }
}

impl Resolver for StaticResolver {
    fn resolve(&self, did: &Did) -> Result<PublicKeys, IdentityError> {
        self.known
            .get(did)
            .copied()
            .ok_or_else(|| IdentityError::Unresolved(did.to_string()))
    }
}

/// A signing and key-agreement key pair addressed by a `did:key`.
///
/// Immutable after construction; safe to share across tasks.
#[derive(Clone)]
pub struct Identity {
    signing_key: SigningKey,
    agreement: StaticSecret,
    did: Did,
}

impl Identity {
    /// Create from a 32-byte seed.
    pub fn from_seed(seed: &[u8; 32]) -> Self {
        let signing_key = SigningKey::from_bytes(seed);

        // Same scalar as the Ed25519 expanded key, so the X25519 public key
        // is the Montgomery form of the Ed25519 public key.
        let expanded = Sha512::digest(seed);
        let mut scalar = [0u8; 32];
        scalar.copy_from_slice(&expanded[..32]);
        let agreement = StaticSecret::from(scalar);

        let did = Did::from_public_key(&Ed25519PublicKey(signing_key.verifying_key().to_bytes()));
        Self {
            signing_key,
            agreement,
            did,
        }
    }

    /// Derive the seed as SHA-256 of a passphrase.
    pub fn from_passphrase(passphrase: &str) -> Self {
        let mut seed = [0u8; 32];
        seed.copy_from_slice(&Sha256::digest(passphrase.as_bytes()));
        Self::from_seed(&seed)
    }

    /// Generate a new random identity.
    pub fn generate() -> Self {
        let mut seed = [0u8; 32];
        rand::thread_rng().fill_bytes(&mut seed);
        Self::from_seed(&seed)
    }

    pub fn did(&self) -> &Did {
        &self.did
    }

    pub fn key_id(&self) -> String {
        self.did.key_id()
    }

    pub fn public_key(&self) -> Ed25519PublicKey {
        Ed25519PublicKey(self.signing_key.verifying_key().to_bytes())
    }

    pub fn agreement_public(&self) -> X25519PublicKey {
        X25519PublicKey::from(x25519_dalek::PublicKey::from(&self.agreement))
    }

    pub fn public_keys(&self) -> PublicKeys {
        PublicKeys {
            signing: self.public_key(),
            agreement: self.agreement_public(),
        }
    }

    /// Sign a message (deterministic Ed25519).
    pub fn sign(&self, message: &[u8]) -> Ed25519Signature {
        Ed25519Signature(self.signing_key.sign(message).to_bytes())
    }

    /// X25519 agreement with a peer public key.
    pub fn diffie_hellman(&self, peer: &X25519PublicKey) -> [u8; 32] {
        *self.agreement.diffie_hellman(&peer.to_dalek()).as_bytes()
    }
}

impl fmt::Debug for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Identity({})", self.did)
    }
}
