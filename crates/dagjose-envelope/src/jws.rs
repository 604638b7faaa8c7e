//! Signed envelopes (JWS).
//!
//! The payload document is stored as its own dag-cbor block; the envelope
//! carries that block's CID as the JWS payload plus one detached signature
//! per signer. Signing input follows JWS:
//!
//! ```text
//! base64url(protected) || "." || base64url(payload cid bytes)
//! ```
//!
//! Because the CID commits to the payload bytes, verifying the signature
//! over the CID and checking the payload block against it covers the
//! payload exactly.

use serde::{Deserialize, Serialize};

use dagjose_core::{canonical, decode_document, ContentId, Codec, Did, Document, HashAlgorithm};

use crate::envelope::{b64url, Signature, SignedEnvelope};
use crate::error::{EnvelopeError, Result, VerificationError};
use crate::provider::{SignatureProvider, Verifier};

/// Protected header of one signature.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JwsHeader {
    pub alg: String,
    pub kid: String,
}

/// The two blocks produced by signing a document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedBlocks {
    /// dag-jose envelope block.
    pub envelope: Vec<u8>,
    /// dag-cbor payload block.
    pub payload: Vec<u8>,
    /// CID of the payload block, as declared by the envelope.
    pub link: ContentId,
}

/// A payload whose signatures all verified.
#[derive(Debug, Clone, PartialEq)]
pub struct VerifiedPayload {
    pub document: Document,
    pub link: ContentId,
    /// Signer identifiers, in signature order.
    pub signers: Vec<Did>,
}

/// Sign a document with one signer, addressing the payload with sha2-256.
pub fn encode_signed(doc: &Document, signer: &dyn SignatureProvider) -> Result<SignedBlocks> {
    encode_signed_with(doc, &[signer], HashAlgorithm::default())
}

/// Sign a document with every given signer.
pub fn encode_signed_with(
    doc: &Document,
    signers: &[&dyn SignatureProvider],
    hash: HashAlgorithm,
) -> Result<SignedBlocks> {
    let (payload, link) = canonical::document_block(doc, hash)?;
    let encoded_link = b64url(&link.to_bytes());

    let mut signatures = Vec::with_capacity(signers.len());
    for signer in signers {
        let header = JwsHeader {
            alg: signer.algorithm().to_owned(),
            kid: signer.key_id(),
        };
        let protected = serde_json::to_vec(&header)
            .map_err(|e| EnvelopeError::Malformed(format!("protected header: {e}")))?;

        let input = signing_input(&protected, &encoded_link);
        let signature = signer.sign(input.as_bytes())?;
        signatures.push(Signature {
            protected,
            signature,
        });
    }

    let envelope = SignedEnvelope { link, signatures }.to_block()?;
    Ok(SignedBlocks {
        envelope,
        payload,
        link,
    })
}

/// Decode and verify an envelope block against its payload block.
pub fn decode_signed<V: Verifier + ?Sized>(
    envelope: &[u8],
    payload: &[u8],
    verifier: &V,
) -> Result<VerifiedPayload> {
    verify_signed(&SignedEnvelope::from_block(envelope)?, payload, verifier)
}

/// Verify an already-parsed envelope against its payload block.
///
/// Fails closed: the payload must address to the declared link and every
/// signature must verify.
pub fn verify_signed<V: Verifier + ?Sized>(
    envelope: &SignedEnvelope,
    payload: &[u8],
    verifier: &V,
) -> Result<VerifiedPayload> {
    let hash = envelope
        .link
        .hash_algorithm()
        .ok_or_else(|| EnvelopeError::Malformed("unsupported link hash".into()))?;
    let actual = ContentId::compute(Codec::DagCbor, hash, payload)?;
    if actual != envelope.link {
        return Err(VerificationError::LinkMismatch {
            expected: envelope.link,
            actual,
        }
        .into());
    }

    if envelope.signatures.is_empty() {
        return Err(VerificationError::NoSignatures.into());
    }

    let encoded_link = b64url(&envelope.link.to_bytes());
    let mut signers = Vec::with_capacity(envelope.signatures.len());
    for sig in &envelope.signatures {
        let header: JwsHeader = serde_json::from_slice(&sig.protected)
            .map_err(|e| VerificationError::MalformedHeader(e.to_string()))?;
        let input = signing_input(&sig.protected, &encoded_link);
        signers.push(verifier.verify(&header.kid, &header.alg, input.as_bytes(), &sig.signature)?);
    }

    Ok(VerifiedPayload {
        document: decode_document(payload)?,
        link: envelope.link,
        signers,
    })
}

fn signing_input(protected: &[u8], encoded_link: &str) -> String {
    format!("{}.{}", b64url(protected), encoded_link)
}
