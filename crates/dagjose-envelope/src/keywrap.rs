//! Per-recipient key wrapping (`ECDH-ES+C20PKW`).
//!
//! The content key of an encrypted envelope is wrapped once per recipient:
//! an ephemeral X25519 key agrees a secret with the recipient's agreement
//! key, a key-encryption key is derived from it, and the content key is
//! sealed under that. Only the holder of the recipient secret can redo the
//! agreement from the ephemeral public key.

use dagjose_core::{Identity, X25519PublicKey};
use rand::RngCore;
use x25519_dalek::{PublicKey, StaticSecret};

use crate::aead::{ContentKey, Iv, SecureRng, SharedKey, TAG_LEN};
use crate::error::{DecryptionError, EncryptionError};

/// JOSE `alg` of a recipient entry.
pub const KEY_WRAP_ALG: &str = "ECDH-ES+C20PKW";

/// A content key wrapped for one recipient.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WrappedKey {
    /// Key id of the recipient (`did#fragment`).
    pub kid: String,
    /// Ephemeral public key of the sender side.
    pub epk: X25519PublicKey,
    pub iv: Iv,
    pub tag: [u8; TAG_LEN],
    /// The sealed content key.
    pub encrypted_key: Vec<u8>,
}

impl WrappedKey {
    /// Wrap `cek` for the holder of `recipient`'s agreement secret.
    pub fn wrap(
        cek: &ContentKey,
        kid: &str,
        recipient: &X25519PublicKey,
        rng: &mut dyn SecureRng,
    ) -> Result<Self, EncryptionError> {
        let mut secret = [0u8; 32];
        rng.fill_bytes(&mut secret);
        let ephemeral = StaticSecret::from(secret);
        let epk = X25519PublicKey::from(PublicKey::from(&ephemeral));

        let shared = SharedKey::from_bytes(*ephemeral.diffie_hellman(&recipient.to_dalek()).as_bytes());
        if !shared.is_contributory() {
            return Err(EncryptionError::KeyWrap {
                recipient: kid.to_owned(),
                reason: "low-order agreement key".into(),
            });
        }

        let kek = shared.derive_key_encryption_key(&context(&epk, kid));
        let iv = Iv::generate(rng);
        let (encrypted_key, tag) = kek.seal(&iv, cek.as_bytes(), &[])?;

        Ok(Self {
            kid: kid.to_owned(),
            epk,
            iv,
            tag,
            encrypted_key,
        })
    }

    /// Recover the content key with the recipient's identity.
    pub fn open(&self, identity: &Identity) -> Result<ContentKey, DecryptionError> {
        let shared = SharedKey::from_bytes(identity.diffie_hellman(&self.epk));
        if !shared.is_contributory() {
            return Err(DecryptionError::Corrupt);
        }

        let kek = shared.derive_key_encryption_key(&context(&self.epk, &self.kid));
        let key = kek.open(&self.iv, &self.encrypted_key, &self.tag, &[])?;
        let key: [u8; 32] = key.try_into().map_err(|_| DecryptionError::Corrupt)?;
        Ok(ContentKey::from_bytes(key))
    }
}

fn context(epk: &X25519PublicKey, kid: &str) -> Vec<u8> {
    let mut buf = Vec::with_capacity(32 + kid.len());
    buf.extend_from_slice(epk.as_bytes());
    buf.extend_from_slice(kid.as_bytes());
    buf
}
