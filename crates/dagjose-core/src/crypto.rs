//! Key and signature types.
//!
//! Thin strong types over ed25519-dalek and x25519-dalek byte arrays.

use ed25519_dalek::{Signature, VerifyingKey};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::IdentityError;

/// A 32-byte Ed25519 public key.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Ed25519PublicKey(pub [u8; 32]);

impl Ed25519PublicKey {
    pub const fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Verify a signature over a message.
    ///
    /// Uses strict verification, so malleated or small-order inputs are rejected.
    pub fn verify(&self, message: &[u8], signature: &Ed25519Signature) -> bool {
        let Ok(verifying_key) = VerifyingKey::from_bytes(&self.0) else {
            return false;
        };
        let sig = Signature::from_bytes(&signature.0);
        verifying_key.verify_strict(message, &sig).is_ok()
    }

    /// The birationally equivalent X25519 key, used for key agreement.
    pub fn to_x25519(&self) -> Result<X25519PublicKey, IdentityError> {
        let verifying_key =
            VerifyingKey::from_bytes(&self.0).map_err(|_| IdentityError::InvalidPublicKey)?;
        Ok(X25519PublicKey(verifying_key.to_montgomery().to_bytes()))
    }
}

impl fmt::Debug for Ed25519PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Ed25519Pub({})", &self.to_hex()[..16])
    }
}

impl AsRef<[u8]> for Ed25519PublicKey {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl From<[u8; 32]> for Ed25519PublicKey {
    fn from(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }
}

/// A 64-byte Ed25519 signature.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Ed25519Signature(pub [u8; 64]);

impl Ed25519Signature {
    pub const fn from_bytes(bytes: [u8; 64]) -> Self {
        Self(bytes)
    }

    /// Parse from a slice, which must be exactly 64 bytes.
    pub fn from_slice(bytes: &[u8]) -> Option<Self> {
        <[u8; 64]>::try_from(bytes).ok().map(Self)
    }

    pub const fn as_bytes(&self) -> &[u8; 64] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Debug for Ed25519Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Ed25519Sig({}...)", &self.to_hex()[..16])
    }
}

impl AsRef<[u8]> for Ed25519Signature {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

/// An X25519 public key (32 bytes).
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct X25519PublicKey(pub [u8; 32]);

impl X25519PublicKey {
    pub const fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn to_dalek(&self) -> x25519_dalek::PublicKey {
        x25519_dalek::PublicKey::from(self.0)
    }
}

impl fmt::Debug for X25519PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "X25519Pub({})", &hex::encode(self.0)[..16])
    }
}

impl From<x25519_dalek::PublicKey> for X25519PublicKey {
    fn from(pk: x25519_dalek::PublicKey) -> Self {
        Self(*pk.as_bytes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ed25519_dalek::{Signer, SigningKey};

    #[test]
    fn test_verify() {
        let sk = SigningKey::from_bytes(&[0x42; 32]);
        let pk = Ed25519PublicKey(sk.verifying_key().to_bytes());
        let sig = Ed25519Signature(sk.sign(b"hello world").to_bytes());

        assert!(pk.verify(b"hello world", &sig));
        assert!(!pk.verify(b"hello worlD", &sig));
    }

    #[test]
    fn test_signature_from_slice() {
        assert!(Ed25519Signature::from_slice(&[0u8; 64]).is_some());
        assert!(Ed25519Signature::from_slice(&[0u8; 63]).is_none());
    }

    #[test]
    fn test_wrong_key_does_not_verify() {
        let signer = SigningKey::from_bytes(&[0x42; 32]);
        let other = SigningKey::from_bytes(&[0x43; 32]);
        let sig = Ed25519Signature(signer.sign(b"m").to_bytes());
        assert!(!Ed25519PublicKey(other.verifying_key().to_bytes()).verify(b"m", &sig));
    }
}
