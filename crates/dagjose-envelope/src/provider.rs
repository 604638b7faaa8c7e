//! Capability providers.
//!
//! The codec never touches private keys directly. It asks a
//! [`SignatureProvider`] to sign, a [`Verifier`] to check signatures, a
//! [`KeyWrapper`] to wrap content keys for recipients, and a [`Decrypter`]
//! to unwrap them. [`Identity`] signs and decrypts; any [`Resolver`]
//! verifies and wraps, since both only need public key material.

use dagjose_core::{Did, Ed25519Signature, Identity, Resolver};

use crate::aead::{ContentKey, SecureRng};
use crate::error::{DecryptionError, EncryptionError, SigningError, VerificationError};
use crate::keywrap::WrappedKey;

/// JOSE `alg` for Ed25519 signatures.
pub const EDDSA: &str = "EdDSA";

/// Produces detached signatures on behalf of one identity.
pub trait SignatureProvider: Send + Sync {
    /// Key id placed in the protected header.
    fn key_id(&self) -> String;

    fn algorithm(&self) -> &str {
        EDDSA
    }

    fn sign(&self, message: &[u8]) -> Result<Vec<u8>, SigningError>;
}

impl SignatureProvider for Identity {
    fn key_id(&self) -> String {
        Identity::key_id(self)
    }

    fn sign(&self, message: &[u8]) -> Result<Vec<u8>, SigningError> {
        Ok(Identity::sign(self, message).as_bytes().to_vec())
    }
}

/// Checks one signature and names the signer.
pub trait Verifier {
    fn verify(
        &self,
        kid: &str,
        alg: &str,
        message: &[u8],
        signature: &[u8],
    ) -> Result<Did, VerificationError>;
}

impl<R: Resolver + ?Sized> Verifier for R {
    fn verify(
        &self,
        kid: &str,
        alg: &str,
        message: &[u8],
        signature: &[u8],
    ) -> Result<Did, VerificationError> {
        if alg != EDDSA {
            return Err(VerificationError::UnsupportedAlgorithm(alg.to_owned()));
        }

        let did =
            Did::from_key_id(kid).map_err(|e| VerificationError::MalformedHeader(e.to_string()))?;
        let keys = self
            .resolve(&did)
            .map_err(|e| VerificationError::UnresolvedSigner {
                kid: kid.to_owned(),
                reason: e.to_string(),
            })?;

        let invalid = || VerificationError::InvalidSignature {
            kid: kid.to_owned(),
        };
        let signature = Ed25519Signature::from_slice(signature).ok_or_else(invalid)?;
        if !keys.signing.verify(message, &signature) {
            return Err(invalid());
        }
        Ok(did)
    }
}

/// Wraps a content key for a recipient identifier.
pub trait KeyWrapper {
    fn wrap_key(
        &self,
        recipient: &Did,
        cek: &ContentKey,
        rng: &mut dyn SecureRng,
    ) -> Result<WrappedKey, EncryptionError>;
}

impl<R: Resolver + ?Sized> KeyWrapper for R {
    fn wrap_key(
        &self,
        recipient: &Did,
        cek: &ContentKey,
        rng: &mut dyn SecureRng,
    ) -> Result<WrappedKey, EncryptionError> {
        let keys = self.resolve(recipient).map_err(|e| EncryptionError::KeyWrap {
            recipient: recipient.to_string(),
            reason: e.to_string(),
        })?;
        WrappedKey::wrap(cek, &recipient.key_id(), &keys.agreement, rng)
    }
}

/// Unwraps a content key with a local secret.
pub trait Decrypter {
    fn unwrap_key(&self, wrapped: &WrappedKey) -> Result<ContentKey, DecryptionError>;
}

impl Decrypter for Identity {
    fn unwrap_key(&self, wrapped: &WrappedKey) -> Result<ContentKey, DecryptionError> {
        wrapped.open(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dagjose_core::{DidKeyResolver, StaticResolver};

    #[test]
    fn test_identity_signature_verifies_through_resolver() {
        let id = Identity::from_seed(&[1; 32]);
        let sig = SignatureProvider::sign(&id, b"msg").unwrap();
        let did = DidKeyResolver
            .verify(&id.key_id(), EDDSA, b"msg", &sig)
            .unwrap();
        assert_eq!(&did, id.did());
    }

    #[test]
    fn test_verify_rejects_wrong_message() {
        let id = Identity::from_seed(&[1; 32]);
        let sig = SignatureProvider::sign(&id, b"msg").unwrap();
        assert_eq!(
            DidKeyResolver.verify(&id.key_id(), EDDSA, b"other", &sig),
            Err(VerificationError::InvalidSignature { kid: id.key_id() })
        );
    }

    #[test]
    fn test_verify_rejects_unknown_algorithm() {
        let id = Identity::from_seed(&[1; 32]);
        assert_eq!(
            DidKeyResolver.verify(&id.key_id(), "ES256K", b"m", &[0; 64]),
            Err(VerificationError::UnsupportedAlgorithm("ES256K".into()))
        );
    }

    #[test]
    fn test_verify_reports_unresolved_signer() {
        let id = Identity::from_seed(&[1; 32]);
        let sig = SignatureProvider::sign(&id, b"m").unwrap();
        let err = StaticResolver::new()
            .verify(&id.key_id(), EDDSA, b"m", &sig)
            .unwrap_err();
        assert!(matches!(err, VerificationError::UnresolvedSigner { .. }));
    }

    #[test]
    fn test_verify_rejects_malformed_kid() {
        let err = DidKeyResolver
            .verify("not-a-kid", EDDSA, b"m", &[0; 64])
            .unwrap_err();
        assert!(matches!(err, VerificationError::MalformedHeader(_)));
    }
}
