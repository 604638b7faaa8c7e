//! Symmetric primitives for encrypted envelopes.
//!
//! ChaCha20-Poly1305 with detached tags, and BLAKE3 key derivation from an
//! X25519 shared secret.

use chacha20poly1305::{
    aead::{Aead, KeyInit, Payload},
    ChaCha20Poly1305, Nonce,
};
use rand::{CryptoRng, RngCore};

use crate::error::{DecryptionError, EncryptionError};

/// Authentication tag length in bytes.
pub const TAG_LEN: usize = 16;

/// Nonce length in bytes.
pub const IV_LEN: usize = 12;

const KEK_CONTEXT: &str = "dagjose-v0 ECDH-ES+C20PKW key encryption key";

/// Randomness source for keys, nonces and ephemeral secrets.
///
/// Any cryptographically secure generator qualifies; seeding one makes
/// envelope bytes (and so their content ids) reproducible.
pub trait SecureRng: RngCore + CryptoRng {}

impl<T: RngCore + CryptoRng> SecureRng for T {}

/// A 256-bit ChaCha20-Poly1305 key.
#[derive(Clone, PartialEq, Eq)]
pub struct ContentKey([u8; 32]);

impl ContentKey {
    /// Generate a fresh key.
    pub fn generate(rng: &mut dyn SecureRng) -> Self {
        let mut bytes = [0u8; 32];
        rng.fill_bytes(&mut bytes);
        Self(bytes)
    }

    pub const fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Encrypt and return `(ciphertext, tag)`.
    pub fn seal(
        &self,
        iv: &Iv,
        plaintext: &[u8],
        aad: &[u8],
    ) -> Result<(Vec<u8>, [u8; TAG_LEN]), EncryptionError> {
        let cipher = ChaCha20Poly1305::new_from_slice(&self.0)
            .map_err(|e| EncryptionError::Cipher(e.to_string()))?;

        let mut sealed = cipher
            .encrypt(Nonce::from_slice(&iv.0), Payload { msg: plaintext, aad })
            .map_err(|e| EncryptionError::Cipher(e.to_string()))?;

        let tag_bytes = sealed.split_off(sealed.len() - TAG_LEN);
        let mut tag = [0u8; TAG_LEN];
        tag.copy_from_slice(&tag_bytes);
        Ok((sealed, tag))
    }

    /// Authenticate and decrypt a detached `(ciphertext, tag)` pair.
    pub fn open(
        &self,
        iv: &Iv,
        ciphertext: &[u8],
        tag: &[u8; TAG_LEN],
        aad: &[u8],
    ) -> Result<Vec<u8>, DecryptionError> {
        let cipher =
            ChaCha20Poly1305::new_from_slice(&self.0).map_err(|_| DecryptionError::Corrupt)?;

        let mut sealed = Vec::with_capacity(ciphertext.len() + TAG_LEN);
        sealed.extend_from_slice(ciphertext);
        sealed.extend_from_slice(tag);

        cipher
            .decrypt(Nonce::from_slice(&iv.0), Payload { msg: &sealed, aad })
            .map_err(|_| DecryptionError::Corrupt)
    }
}

impl std::fmt::Debug for ContentKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("ContentKey(..)")
    }
}

/// A 96-bit ChaCha20-Poly1305 nonce.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Iv(pub [u8; IV_LEN]);

impl Iv {
    pub fn generate(rng: &mut dyn SecureRng) -> Self {
        let mut bytes = [0u8; IV_LEN];
        rng.fill_bytes(&mut bytes);
        Self(bytes)
    }

    pub fn from_slice(bytes: &[u8]) -> Option<Self> {
        <[u8; IV_LEN]>::try_from(bytes).ok().map(Self)
    }

    pub const fn as_bytes(&self) -> &[u8; IV_LEN] {
        &self.0
    }
}

/// A shared secret from X25519 key agreement.
#[derive(Clone)]
pub struct SharedKey([u8; 32]);

impl SharedKey {
    pub const fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// True unless the peer key was a low-order point.
    pub fn is_contributory(&self) -> bool {
        self.0 != [0u8; 32]
    }

    /// Derive the key-encryption key for one recipient.
    ///
    /// The context binds the ephemeral public key and the recipient key id.
    pub fn derive_key_encryption_key(&self, context: &[u8]) -> ContentKey {
        let mut hasher = blake3::Hasher::new_derive_key(KEK_CONTEXT);
        hasher.update(&self.0);
        hasher.update(context);
        ContentKey(*hasher.finalize().as_bytes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_seal_open() {
        let mut rng = StdRng::seed_from_u64(1);
        let key = ContentKey::generate(&mut rng);
        let iv = Iv::generate(&mut rng);

        let (ciphertext, tag) = key.seal(&iv, b"hello, world!", b"aad").unwrap();
        assert_eq!(ciphertext.len(), 13);
        assert_ne!(ciphertext, b"hello, world!");

        let plaintext = key.open(&iv, &ciphertext, &tag, b"aad").unwrap();
        assert_eq!(plaintext, b"hello, world!");
    }

    #[test]
    fn test_open_rejects_tampering() {
        let mut rng = StdRng::seed_from_u64(2);
        let key = ContentKey::generate(&mut rng);
        let iv = Iv::generate(&mut rng);
        let (mut ciphertext, tag) = key.seal(&iv, b"secret", b"").unwrap();

        assert_eq!(key.open(&iv, &ciphertext, &tag, b"other"), Err(DecryptionError::Corrupt));

        ciphertext[0] ^= 1;
        assert_eq!(key.open(&iv, &ciphertext, &tag, b""), Err(DecryptionError::Corrupt));
    }

    #[test]
    fn test_open_wrong_key_fails() {
        let mut rng = StdRng::seed_from_u64(3);
        let key1 = ContentKey::generate(&mut rng);
        let key2 = ContentKey::generate(&mut rng);
        let iv = Iv::generate(&mut rng);
        let (ciphertext, tag) = key1.seal(&iv, b"secret", b"").unwrap();
        assert!(key2.open(&iv, &ciphertext, &tag, b"").is_err());
    }

    #[test]
    fn test_seeded_rng_is_reproducible() {
        let a = ContentKey::generate(&mut StdRng::seed_from_u64(9));
        let b = ContentKey::generate(&mut StdRng::seed_from_u64(9));
        assert_eq!(a, b);
    }

    #[test]
    fn test_kek_derivation() {
        let shared = SharedKey([0x42; 32]);
        let k1 = shared.derive_key_encryption_key(b"context-a");
        let k2 = shared.derive_key_encryption_key(b"context-a");
        let k3 = shared.derive_key_encryption_key(b"context-b");
        assert_eq!(k1, k2);
        assert_ne!(k1, k3);
        assert!(shared.is_contributory());
        assert!(!SharedKey([0; 32]).is_contributory());
    }
}
