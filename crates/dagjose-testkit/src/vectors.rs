//! Golden test vectors for deterministic verification.
//!
//! Every vector is signed by [`golden_identity`]. The first one matches the
//! `{hello: "world"}` node printed by the reference IPFS run byte for byte:
//! same DID, same JWS payload, same protected header, same signature.
//! The second node links to the first node's envelope.

use dagjose_core::{Codec, ContentId, Document, HashAlgorithm};
use dagjose_envelope::{encode_signed, EnvelopeError, SignedBlocks};

use crate::fixtures::{golden_identity, hello};

/// DID of the golden identity.
pub const GOLDEN_DID: &str = "did:key:z6Mkseop8m36AhAzrt2wnimKJWRqfwrCzCRYYSoukpbd9FMq";

/// base64url of `{"alg":"EdDSA","kid":"<GOLDEN_DID>#<fragment>"}`.
pub const GOLDEN_PROTECTED: &str = "eyJhbGciOiJFZERTQSIsImtpZCI6ImRpZDprZXk6ejZNa3Nlb3A4bTM2QWhBenJ0MnduaW1LSldScWZ3ckN6Q1JZWVNvdWtwYmQ5Rk1xI3o2TWtzZW9wOG0zNkFoQXpydDJ3bmltS0pXUnFmd3JDekNSWVlTb3VrcGJkOUZNcSJ9";

/// A golden signed node.
#[derive(Debug, Clone)]
pub struct GoldenVector {
    /// Human-readable name for the vector.
    pub name: &'static str,
    /// `hello` field of the document.
    pub hello: &'static str,
    /// Envelope CID of the previous node, if any.
    pub prev: Option<&'static str>,
    /// Expected dag-cbor payload block (hex).
    pub payload_hex: &'static str,
    /// Expected payload CID.
    pub link: &'static str,
    /// Expected JWS payload (base64url of the link bytes).
    pub jws_payload: &'static str,
    /// Expected signature (base64url).
    pub signature: &'static str,
    /// Expected envelope CID.
    pub envelope: &'static str,
}

impl GoldenVector {
    /// The document this vector signs.
    pub fn document(&self) -> Result<Document, EnvelopeError> {
        let doc = hello(self.hello);
        match self.prev {
            Some(prev) => Ok(doc.with_prev(prev.parse::<ContentId>()?)),
            None => Ok(doc),
        }
    }

    /// The node as the reference run printed it in JOSE general JSON,
    /// including the decoded `link` member IPFS adds next to `payload`.
    pub fn general_json(&self) -> String {
        serde_json::json!({
            "link": { "/": self.link },
            "payload": self.jws_payload,
            "signatures": [{ "protected": GOLDEN_PROTECTED, "signature": self.signature }],
        })
        .to_string()
    }

    /// Sign the vector's document with the golden identity.
    pub fn sign(&self) -> Result<SignedBlocks, EnvelopeError> {
        encode_signed(&self.document()?, &golden_identity())
    }
}

/// Get all golden test vectors.
pub fn all_vectors() -> Vec<GoldenVector> {
    vec![
        GoldenVector {
            name: "hello world",
            hello: "world",
            prev: None,
            payload_hex: "a16568656c6c6f65776f726c64",
            link: "bafyreidykglsfhoixmivffc5uwhcgshx4j465xwqntbmu43nb2dzqwfvae",
            jws_payload: "AXESIHhRlyKdyLsRUpRdpY4jSPfiee7e0GzCynNtDoeYWLUB",
            signature: "idGMhvijDbTv2-TnEF6bRCE_ycEBZMIBMZh4EJ4u-9q_ITKxuWd4tF5wMVzXmp7m4mvFwomzT8uxkBQhZztgCg",
            envelope: "bagcqceraxraskcoeebah7opu5trao5pq5amialatnz7uf55fycfd2rwfqynq",
        },
        GoldenVector {
            name: "linked second node",
            hello: "getting the hang of this",
            prev: Some("bagcqceraxraskcoeebah7opu5trao5pq5amialatnz7uf55fycfd2rwfqynq"),
            payload_hex: "a26470726576d82a5826000185011220bc412509c420407fb9f4ece20775f0e818802c136e7f42f7a5c08a3d46c5861b6568656c6c6f781867657474696e67207468652068616e67206f662074686973",
            link: "bafyreicns5kloevg2fgwfg7cxjnbgpgv7sh73qbmb6xk4uz3dimys5bztm",
            jws_payload: "AXESIE2XVLcSptFNYpviuloTPNX8j_3ALA-urlM7GhmJdDmb",
            signature: "jVQsMvoXfSZnKFPQw4n-AF49HW4Cr38OB2P4g4paIGCDnOl-ZCSZHhBOK1XDZQZ4s4rfoZbwW6JEtZvN5rvHBA",
            envelope: "bagcqcerakarmcqx3clpqmg2bzmu3l4ksg2rkclmovscflrumutdypoxvupiq",
        },
    ]
}

/// Sign every vector and compare its payload hex and envelope CID.
///
/// Returns `(name, matches, envelope cid)` per vector.
pub fn verify_all_vectors() -> Vec<(String, bool, String)> {
    all_vectors()
        .iter()
        .map(|v| match v.sign() {
            Ok(blocks) => {
                let envelope =
                    ContentId::compute(Codec::DagJose, HashAlgorithm::Sha2_256, &blocks.envelope)
                        .map(|cid| cid.to_string())
                        .unwrap_or_default();
                let matches = hex::encode(&blocks.payload) == v.payload_hex
                    && blocks.link.to_string() == v.link
                    && envelope == v.envelope;
                (v.name.to_string(), matches, envelope)
            }
            Err(e) => (v.name.to_string(), false, e.to_string()),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use base64::engine::general_purpose::URL_SAFE_NO_PAD;
    use base64::Engine;
    use dagjose_envelope::SignedEnvelope;

    #[test]
    fn test_golden_identity_did() {
        assert_eq!(golden_identity().did().as_str(), GOLDEN_DID);
    }

    #[test]
    fn test_vectors_match() {
        for (name, matches, envelope) in verify_all_vectors() {
            assert!(matches, "vector '{name}' diverged, envelope {envelope}");
        }
    }

    #[test]
    fn test_jws_fields_match() {
        for vector in all_vectors() {
            let blocks = vector.sign().unwrap();
            let envelope = SignedEnvelope::from_block(&blocks.envelope).unwrap();
            assert_eq!(envelope.signatures.len(), 1);

            let sig = &envelope.signatures[0];
            assert_eq!(URL_SAFE_NO_PAD.encode(&sig.protected), GOLDEN_PROTECTED, "{}", vector.name);
            assert_eq!(URL_SAFE_NO_PAD.encode(&sig.signature), vector.signature, "{}", vector.name);
            assert_eq!(
                URL_SAFE_NO_PAD.encode(envelope.link.to_bytes()),
                vector.jws_payload,
                "{}",
                vector.name
            );
        }
    }

    #[test]
    fn test_general_json_parses_to_signed_block() {
        for vector in all_vectors() {
            let blocks = vector.sign().unwrap();
            let parsed = SignedEnvelope::from_general_json(&vector.general_json()).unwrap();
            assert_eq!(parsed.link.to_string(), vector.link, "{}", vector.name);
            assert_eq!(parsed.to_block().unwrap(), blocks.envelope, "{}", vector.name);
        }
    }

    #[test]
    fn test_second_vector_links_to_first() {
        let vectors = all_vectors();
        assert_eq!(vectors[1].prev, Some(vectors[0].envelope));
    }
}
