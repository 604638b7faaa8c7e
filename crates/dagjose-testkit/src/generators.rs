//! Proptest generators for property-based testing.

use std::collections::BTreeMap;

use proptest::prelude::*;

use dagjose_core::{Codec, ContentId, Document, HashAlgorithm, Identity, Value};

/// Generate a random identity.
pub fn identity() -> impl Strategy<Value = Identity> {
    any::<[u8; 32]>().prop_map(|seed| Identity::from_seed(&seed))
}

/// Generate either supported hash algorithm.
pub fn hash_algorithm() -> impl Strategy<Value = HashAlgorithm> {
    prop_oneof![Just(HashAlgorithm::Sha2_256), Just(HashAlgorithm::Blake3)]
}

/// Generate a CID of a random raw block.
pub fn content_id() -> impl Strategy<Value = ContentId> {
    (any::<[u8; 32]>(), hash_algorithm())
        .prop_filter_map("addressable block", |(data, hash)| {
            ContentId::compute(Codec::Raw, hash, &data).ok()
        })
}

/// Generate a field key. Never the reserved `prev`.
pub fn field_key() -> impl Strategy<Value = String> {
    "[a-z][a-z0-9_]{0,11}".prop_filter("reserved key", |k| k != "prev")
}

/// Generate a finite float.
pub fn finite_float() -> impl Strategy<Value = f64> {
    -1.0e12f64..1.0e12f64
}

/// Generate a nested value, at most a few levels deep.
pub fn value() -> impl Strategy<Value = Value> {
    let leaf = prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        any::<i64>().prop_map(Value::Integer),
        finite_float().prop_map(Value::Float),
        ".{0,24}".prop_map(Value::Text),
        prop::collection::vec(any::<u8>(), 0..32).prop_map(Value::Bytes),
        content_id().prop_map(Value::Link),
    ];
    leaf.prop_recursive(3, 32, 4, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..4).prop_map(Value::List),
            prop::collection::btree_map(field_key(), inner, 0..4).prop_map(Value::Map),
        ]
    })
}

/// Generate a document, with or without a back-reference.
pub fn document() -> impl Strategy<Value = Document> {
    (
        prop::collection::btree_map(field_key(), value(), 0..6),
        proptest::option::of(content_id()),
    )
        .prop_map(|(fields, prev): (BTreeMap<String, Value>, _)| Document { fields, prev })
}

/// Parameters for a signed or encrypted node.
#[derive(Debug, Clone)]
pub struct NodeParams {
    pub identity: Identity,
    pub document: Document,
    pub hash: HashAlgorithm,
    /// Seed for the encryption RNG.
    pub rng_seed: u64,
}

impl Arbitrary for NodeParams {
    type Parameters = ();
    type Strategy = BoxedStrategy<Self>;

    fn arbitrary_with(_: Self::Parameters) -> Self::Strategy {
        (identity(), document(), hash_algorithm(), any::<u64>())
            .prop_map(|(identity, document, hash, rng_seed)| NodeParams {
                identity,
                document,
                hash,
                rng_seed,
            })
            .boxed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dagjose_core::{encode_document, DidKeyResolver};
    use dagjose_envelope::{
        decode_encrypted, decode_signed, encode_encrypted, encode_signed_with, DecryptionError,
        EnvelopeError, VerificationError,
    };
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(64))]

        #[test]
        fn test_signed_roundtrip(params: NodeParams) {
            let blocks = encode_signed_with(&params.document, &[&params.identity], params.hash).unwrap();
            let verified = decode_signed(&blocks.envelope, &blocks.payload, &DidKeyResolver).unwrap();

            prop_assert_eq!(&verified.document, &params.document);
            prop_assert_eq!(verified.signers, vec![params.identity.did().clone()]);
            prop_assert_eq!(verified.link, blocks.link);
        }

        #[test]
        fn test_encrypted_roundtrip(params: NodeParams) {
            let mut rng = StdRng::seed_from_u64(params.rng_seed);
            let block = encode_encrypted(
                &params.document,
                &[params.identity.did().clone()],
                &DidKeyResolver,
                &mut rng,
            )
            .unwrap();

            let decoded = decode_encrypted(&block, &params.identity).unwrap();
            prop_assert_eq!(decoded, params.document);
        }

        #[test]
        fn test_signed_encoding_deterministic(params: NodeParams) {
            let a = encode_signed_with(&params.document, &[&params.identity], params.hash).unwrap();
            let b = encode_signed_with(&params.document, &[&params.identity], params.hash).unwrap();
            prop_assert_eq!(a, b);
        }

        #[test]
        fn test_canonical_encoding_deterministic(doc in document()) {
            // Rebuild the field map in reverse insertion order.
            let mut reversed = Document::new();
            for (k, v) in doc.fields.iter().rev() {
                reversed.insert(k.clone(), v.clone());
            }
            reversed.prev = doc.prev;

            prop_assert_eq!(encode_document(&doc).unwrap(), encode_document(&reversed).unwrap());
        }

        #[test]
        fn test_tampered_payload_rejected(
            params: NodeParams,
            index in any::<prop::sample::Index>(),
            flip in 1u8..=255,
        ) {
            let blocks = encode_signed_with(&params.document, &[&params.identity], params.hash).unwrap();
            let mut payload = blocks.payload.clone();
            let i = index.index(payload.len());
            payload[i] ^= flip;

            let err = decode_signed(&blocks.envelope, &payload, &DidKeyResolver).unwrap_err();
            prop_assert!(matches!(
                err,
                EnvelopeError::Verification(VerificationError::LinkMismatch { .. })
            ), "expected LinkMismatch, got {:?}", err);
        }

        #[test]
        fn test_wrong_recipient_rejected(params: NodeParams, outsider in identity()) {
            prop_assume!(outsider.did() != params.identity.did());

            let mut rng = StdRng::seed_from_u64(params.rng_seed);
            let block = encode_encrypted(
                &params.document,
                &[params.identity.did().clone()],
                &DidKeyResolver,
                &mut rng,
            )
            .unwrap();

            let err = decode_encrypted(&block, &outsider).unwrap_err();
            prop_assert!(matches!(
                err,
                EnvelopeError::Decryption(DecryptionError::NoMatchingRecipient)
            ));
        }
    }
}
