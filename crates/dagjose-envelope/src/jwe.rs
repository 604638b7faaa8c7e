//! Encrypted envelopes (JWE).
//!
//! The canonical payload bytes are sealed with ChaCha20-Poly1305 under a
//! fresh content key, and the content key is wrapped once per recipient.
//! Unlike signed envelopes there is no separate payload block: the
//! ciphertext embeds the document.

use serde::{Deserialize, Serialize};
use tracing::debug;

use dagjose_core::{decode_document, encode_document, Did, Document};

use crate::aead::{ContentKey, Iv, SecureRng};
use crate::envelope::{b64url, EncryptedEnvelope};
use crate::error::{DecryptionError, EncryptionError, EnvelopeError, Result};
use crate::provider::{Decrypter, KeyWrapper};

/// JOSE `enc` for ChaCha20-Poly1305 content encryption.
pub const CONTENT_ENC: &str = "C20P";

#[derive(Debug, Serialize, Deserialize)]
struct ProtectedHeader {
    enc: String,
}

/// Encrypt a document for every recipient.
///
/// Fails as a whole if any recipient cannot be wrapped for; an envelope
/// never carries a partial recipient list.
pub fn encode_encrypted<W: KeyWrapper + ?Sized>(
    doc: &Document,
    recipients: &[Did],
    wrapper: &W,
    rng: &mut dyn SecureRng,
) -> Result<Vec<u8>> {
    if recipients.is_empty() {
        return Err(EncryptionError::NoRecipients.into());
    }

    let plaintext = encode_document(doc)?;
    let cek = ContentKey::generate(rng);

    let mut wrapped = Vec::with_capacity(recipients.len());
    for recipient in recipients {
        wrapped.push(wrapper.wrap_key(recipient, &cek, rng)?);
    }

    let protected = serde_json::to_vec(&ProtectedHeader {
        enc: CONTENT_ENC.to_owned(),
    })
    .map_err(|e| EnvelopeError::Malformed(format!("protected header: {e}")))?;

    let iv = Iv::generate(rng);
    let (ciphertext, tag) = cek.seal(&iv, &plaintext, b64url(&protected).as_bytes())?;

    EncryptedEnvelope {
        protected,
        iv,
        ciphertext,
        tag,
        recipients: wrapped,
    }
    .to_block()
}

/// Decrypt an envelope block with a local key.
pub fn decode_encrypted<D: Decrypter + ?Sized>(block: &[u8], decrypter: &D) -> Result<Document> {
    decrypt(&EncryptedEnvelope::from_block(block)?, decrypter)
}

/// Decrypt an already-parsed envelope.
///
/// Each recipient entry is tried in order; the first whose key unwraps is
/// used for the content.
pub fn decrypt<D: Decrypter + ?Sized>(
    envelope: &EncryptedEnvelope,
    decrypter: &D,
) -> Result<Document> {
    let header: ProtectedHeader = serde_json::from_slice(&envelope.protected)
        .map_err(|e| EnvelopeError::Malformed(format!("protected header: {e}")))?;
    if header.enc != CONTENT_ENC {
        return Err(DecryptionError::UnsupportedAlgorithm(header.enc).into());
    }

    let cek = envelope
        .recipients
        .iter()
        .find_map(|wrapped| match decrypter.unwrap_key(wrapped) {
            Ok(cek) => Some(cek),
            Err(e) => {
                debug!(kid = %wrapped.kid, error = %e, "recipient entry did not unwrap");
                None
            }
        })
        .ok_or(DecryptionError::NoMatchingRecipient)?;

    let aad = b64url(&envelope.protected);
    let plaintext = cek.open(&envelope.iv, &envelope.ciphertext, &envelope.tag, aad.as_bytes())?;
    Ok(decode_document(&plaintext)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use dagjose_core::{DidKeyResolver, Identity};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    use crate::envelope::{sniff, EnvelopeKind};

    fn secret() -> Document {
        Document::new().with("hello", "secret")
    }

    #[test]
    fn test_encrypt_decrypt_roundtrip() {
        let id = Identity::from_seed(&[1; 32]);
        let mut rng = StdRng::seed_from_u64(1);
        let block =
            encode_encrypted(&secret(), &[id.did().clone()], &DidKeyResolver, &mut rng).unwrap();

        assert_eq!(sniff(&block).unwrap(), EnvelopeKind::Encrypted);
        assert_eq!(decode_encrypted(&block, &id).unwrap(), secret());
    }

    #[test]
    fn test_seeded_encryption_is_reproducible() {
        let id = Identity::from_seed(&[1; 32]);
        let recipients = [id.did().clone()];
        let a = encode_encrypted(&secret(), &recipients, &DidKeyResolver, &mut StdRng::seed_from_u64(5))
            .unwrap();
        let b = encode_encrypted(&secret(), &recipients, &DidKeyResolver, &mut StdRng::seed_from_u64(5))
            .unwrap();
        let c = encode_encrypted(&secret(), &recipients, &DidKeyResolver, &mut StdRng::seed_from_u64(6))
            .unwrap();
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_any_recipient_can_decrypt() {
        let alice = Identity::from_seed(&[1; 32]);
        let bob = Identity::from_seed(&[2; 32]);
        let mut rng = StdRng::seed_from_u64(2);
        let block = encode_encrypted(
            &secret(),
            &[alice.did().clone(), bob.did().clone()],
            &DidKeyResolver,
            &mut rng,
        )
        .unwrap();

        assert_eq!(decode_encrypted(&block, &alice).unwrap(), secret());
        assert_eq!(decode_encrypted(&block, &bob).unwrap(), secret());
    }

    #[test]
    fn test_wrong_recipient_rejected() {
        let alice = Identity::from_seed(&[1; 32]);
        let eve = Identity::from_seed(&[3; 32]);
        let mut rng = StdRng::seed_from_u64(3);
        let block =
            encode_encrypted(&secret(), &[alice.did().clone()], &DidKeyResolver, &mut rng).unwrap();

        let err = decode_encrypted(&block, &eve).unwrap_err();
        assert!(matches!(
            err,
            EnvelopeError::Decryption(DecryptionError::NoMatchingRecipient)
        ));
    }

    #[test]
    fn test_empty_recipients_rejected() {
        let mut rng = StdRng::seed_from_u64(4);
        let err = encode_encrypted(&secret(), &[], &DidKeyResolver, &mut rng).unwrap_err();
        assert!(matches!(
            err,
            EnvelopeError::Encryption(EncryptionError::NoRecipients)
        ));
    }

    #[test]
    fn test_unresolvable_recipient_fails_whole_envelope() {
        let alice = Identity::from_seed(&[1; 32]);
        let stranger = Did::parse(alice.did().as_str()).unwrap();
        let resolver = dagjose_core::StaticResolver::new();
        let mut rng = StdRng::seed_from_u64(4);
        let err = encode_encrypted(&secret(), &[stranger], &resolver, &mut rng).unwrap_err();
        assert!(matches!(
            err,
            EnvelopeError::Encryption(EncryptionError::KeyWrap { .. })
        ));
    }

    #[test]
    fn test_tampered_ciphertext_is_corrupt() {
        let id = Identity::from_seed(&[1; 32]);
        let mut rng = StdRng::seed_from_u64(5);
        let block =
            encode_encrypted(&secret(), &[id.did().clone()], &DidKeyResolver, &mut rng).unwrap();

        let mut env = EncryptedEnvelope::from_block(&block).unwrap();
        env.ciphertext[0] ^= 1;
        let tampered = env.to_block().unwrap();

        let err = decode_encrypted(&tampered, &id).unwrap_err();
        assert!(matches!(
            err,
            EnvelopeError::Decryption(DecryptionError::Corrupt)
        ));
    }

    #[test]
    fn test_protected_header_is_authenticated() {
        let id = Identity::from_seed(&[1; 32]);
        let mut rng = StdRng::seed_from_u64(6);
        let block =
            encode_encrypted(&secret(), &[id.did().clone()], &DidKeyResolver, &mut rng).unwrap();

        let mut env = EncryptedEnvelope::from_block(&block).unwrap();
        env.protected = br#"{"enc":"C20P","x":1}"#.to_vec();
        let tampered = env.to_block().unwrap();
        assert!(decode_encrypted(&tampered, &id).is_err());
    }

    #[test]
    fn test_prev_inside_ciphertext() {
        let id = Identity::from_seed(&[1; 32]);
        let mut rng = StdRng::seed_from_u64(7);
        let first =
            encode_encrypted(&secret(), &[id.did().clone()], &DidKeyResolver, &mut rng).unwrap();
        let prev = dagjose_core::ContentId::compute(
            dagjose_core::Codec::DagJose,
            dagjose_core::HashAlgorithm::Sha2_256,
            &first,
        )
        .unwrap();

        let doc = Document::new().with("hello", "cool!").with_prev(prev);
        let block = encode_encrypted(&doc, &[id.did().clone()], &DidKeyResolver, &mut rng).unwrap();
        assert_eq!(decode_encrypted(&block, &id).unwrap().prev(), Some(&prev));
    }
}
