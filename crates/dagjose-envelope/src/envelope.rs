//! DAG-JOSE wire format.
//!
//! Envelopes are DAG-CBOR maps in JOSE general serialization, with binary
//! members stored as byte strings instead of base64url text:
//!
//! ```text
//! Signed:    { payload: <cid bytes>, signatures: [{ protected, signature }] }
//! Encrypted: { ciphertext, iv, protected, recipients: [{ encrypted_key, header }], tag }
//! ```
//!
//! The variant is recognised from its members (`payload` vs `ciphertext`),
//! the same way DAG-JOSE decoders do.

use std::collections::BTreeMap;
use std::fmt;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use serde::Serialize;

use dagjose_core::canonical::{decode_value, encode_value};
use dagjose_core::{ContentId, Value, X25519PublicKey};

use crate::aead::{Iv, TAG_LEN};
use crate::error::{EnvelopeError, Result};
use crate::keywrap::WrappedKey;

/// Which of the two envelope variants a block holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EnvelopeKind {
    Signed,
    Encrypted,
}

impl fmt::Display for EnvelopeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EnvelopeKind::Signed => f.write_str("signed"),
            EnvelopeKind::Encrypted => f.write_str("encrypted"),
        }
    }
}

/// One detached signature with its protected header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Signature {
    /// Protected header as JSON bytes.
    pub protected: Vec<u8>,
    pub signature: Vec<u8>,
}

/// A JWS envelope. The payload lives in its own block at `link`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedEnvelope {
    pub link: ContentId,
    pub signatures: Vec<Signature>,
}

/// A JWE envelope. The payload is embedded as ciphertext.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncryptedEnvelope {
    /// Protected header as JSON bytes.
    pub protected: Vec<u8>,
    pub iv: Iv,
    pub ciphertext: Vec<u8>,
    pub tag: [u8; TAG_LEN],
    pub recipients: Vec<WrappedKey>,
}

/// Either envelope variant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Envelope {
    Signed(SignedEnvelope),
    Encrypted(EncryptedEnvelope),
}

impl Envelope {
    /// Decode a block of either variant.
    pub fn from_block(bytes: &[u8]) -> Result<Self> {
        let map = decode_map(bytes)?;
        match kind_of(&map)? {
            EnvelopeKind::Signed => Ok(Envelope::Signed(SignedEnvelope::from_map(&map)?)),
            EnvelopeKind::Encrypted => Ok(Envelope::Encrypted(EncryptedEnvelope::from_map(&map)?)),
        }
    }

    pub fn to_block(&self) -> Result<Vec<u8>> {
        match self {
            Envelope::Signed(env) => env.to_block(),
            Envelope::Encrypted(env) => env.to_block(),
        }
    }

    pub fn kind(&self) -> EnvelopeKind {
        match self {
            Envelope::Signed(_) => EnvelopeKind::Signed,
            Envelope::Encrypted(_) => EnvelopeKind::Encrypted,
        }
    }
}

/// Identify the envelope variant of a block without interpreting it further.
pub fn sniff(bytes: &[u8]) -> Result<EnvelopeKind> {
    kind_of(&decode_map(bytes)?)
}

impl SignedEnvelope {
    pub fn to_block(&self) -> Result<Vec<u8>> {
        let signatures = self
            .signatures
            .iter()
            .map(|sig| {
                let mut entry = BTreeMap::new();
                entry.insert("protected".to_owned(), Value::Bytes(sig.protected.clone()));
                entry.insert("signature".to_owned(), Value::Bytes(sig.signature.clone()));
                Value::Map(entry)
            })
            .collect();

        let mut map = BTreeMap::new();
        map.insert("payload".to_owned(), Value::Bytes(self.link.to_bytes()));
        map.insert("signatures".to_owned(), Value::List(signatures));
        Ok(encode_value(&Value::Map(map))?)
    }

    pub fn from_block(bytes: &[u8]) -> Result<Self> {
        let map = decode_map(bytes)?;
        match kind_of(&map)? {
            EnvelopeKind::Signed => Self::from_map(&map),
            EnvelopeKind::Encrypted => Err(malformed("expected a signed envelope")),
        }
    }

    fn from_map(map: &BTreeMap<String, Value>) -> Result<Self> {
        let link = ContentId::from_bytes(bytes_field(map, "payload")?)?;

        let mut signatures = Vec::new();
        for entry in list_field(map, "signatures")? {
            let entry = entry
                .as_map()
                .ok_or_else(|| malformed("signature entry is not a map"))?;
            signatures.push(Signature {
                protected: bytes_field(entry, "protected")?.to_vec(),
                signature: bytes_field(entry, "signature")?.to_vec(),
            });
        }

        Ok(Self { link, signatures })
    }
}

impl EncryptedEnvelope {
    pub fn to_block(&self) -> Result<Vec<u8>> {
        let recipients = self.recipients.iter().map(recipient_to_value).collect();

        let mut map = BTreeMap::new();
        map.insert("ciphertext".to_owned(), Value::Bytes(self.ciphertext.clone()));
        map.insert("iv".to_owned(), Value::Bytes(self.iv.as_bytes().to_vec()));
        map.insert("protected".to_owned(), Value::Bytes(self.protected.clone()));
        map.insert("recipients".to_owned(), Value::List(recipients));
        map.insert("tag".to_owned(), Value::Bytes(self.tag.to_vec()));
        Ok(encode_value(&Value::Map(map))?)
    }

    pub fn from_block(bytes: &[u8]) -> Result<Self> {
        let map = decode_map(bytes)?;
        match kind_of(&map)? {
            EnvelopeKind::Encrypted => Self::from_map(&map),
            EnvelopeKind::Signed => Err(malformed("expected an encrypted envelope")),
        }
    }

    fn from_map(map: &BTreeMap<String, Value>) -> Result<Self> {
        let iv = Iv::from_slice(bytes_field(map, "iv")?).ok_or_else(|| malformed("iv length"))?;
        let tag = bytes_field(map, "tag")?
            .try_into()
            .map_err(|_| malformed("tag length"))?;

        let recipients = list_field(map, "recipients")?
            .iter()
            .map(recipient_from_value)
            .collect::<Result<_>>()?;

        Ok(Self {
            protected: bytes_field(map, "protected")?.to_vec(),
            iv,
            ciphertext: bytes_field(map, "ciphertext")?.to_vec(),
            tag,
            recipients,
        })
    }
}

/// Recipient entry: `{ encrypted_key, header: { alg, epk, iv, kid, tag } }`.
///
/// Header members are JOSE text values (base64url for binary ones).
fn recipient_to_value(wrapped: &WrappedKey) -> Value {
    let mut epk = BTreeMap::new();
    epk.insert("crv".to_owned(), Value::from("X25519"));
    epk.insert("kty".to_owned(), Value::from("OKP"));
    epk.insert("x".to_owned(), Value::Text(b64url(wrapped.epk.as_bytes())));

    let mut header = BTreeMap::new();
    header.insert("alg".to_owned(), Value::from(crate::keywrap::KEY_WRAP_ALG));
    header.insert("epk".to_owned(), Value::Map(epk));
    header.insert("iv".to_owned(), Value::Text(b64url(wrapped.iv.as_bytes())));
    header.insert("kid".to_owned(), Value::Text(wrapped.kid.clone()));
    header.insert("tag".to_owned(), Value::Text(b64url(&wrapped.tag)));

    let mut entry = BTreeMap::new();
    entry.insert("encrypted_key".to_owned(), Value::Bytes(wrapped.encrypted_key.clone()));
    entry.insert("header".to_owned(), Value::Map(header));
    Value::Map(entry)
}

fn recipient_from_value(value: &Value) -> Result<WrappedKey> {
    let entry = value
        .as_map()
        .ok_or_else(|| malformed("recipient entry is not a map"))?;
    let header = entry
        .get("header")
        .and_then(Value::as_map)
        .ok_or_else(|| malformed("recipient header"))?;

    let alg = text_field(header, "alg")?;
    if alg != crate::keywrap::KEY_WRAP_ALG {
        return Err(crate::error::DecryptionError::UnsupportedAlgorithm(alg.to_owned()).into());
    }

    let epk = header
        .get("epk")
        .and_then(Value::as_map)
        .ok_or_else(|| malformed("recipient epk"))?;
    let x: [u8; 32] = b64url_decode(text_field(epk, "x")?)?
        .try_into()
        .map_err(|_| malformed("epk length"))?;

    let iv = Iv::from_slice(&b64url_decode(text_field(header, "iv")?)?)
        .ok_or_else(|| malformed("recipient iv length"))?;
    let tag = b64url_decode(text_field(header, "tag")?)?
        .try_into()
        .map_err(|_| malformed("recipient tag length"))?;

    Ok(WrappedKey {
        kid: text_field(header, "kid")?.to_owned(),
        epk: X25519PublicKey(x),
        iv,
        tag,
        encrypted_key: bytes_field(entry, "encrypted_key")?.to_vec(),
    })
}

fn decode_map(bytes: &[u8]) -> Result<BTreeMap<String, Value>> {
    match decode_value(bytes)? {
        Value::Map(map) => Ok(map),
        other => Err(malformed(&format!("expected map, got {}", other.kind()))),
    }
}

fn kind_of(map: &BTreeMap<String, Value>) -> Result<EnvelopeKind> {
    if map.contains_key("payload") && map.contains_key("signatures") {
        Ok(EnvelopeKind::Signed)
    } else if map.contains_key("ciphertext") {
        Ok(EnvelopeKind::Encrypted)
    } else {
        Err(EnvelopeError::UnknownFormat)
    }
}

fn bytes_field<'a>(map: &'a BTreeMap<String, Value>, key: &str) -> Result<&'a [u8]> {
    map.get(key)
        .and_then(Value::as_bytes)
        .ok_or_else(|| malformed(&format!("missing or non-bytes member {key}")))
}

fn text_field<'a>(map: &'a BTreeMap<String, Value>, key: &str) -> Result<&'a str> {
    map.get(key)
        .and_then(Value::as_text)
        .ok_or_else(|| malformed(&format!("missing or non-text member {key}")))
}

fn list_field<'a>(map: &'a BTreeMap<String, Value>, key: &str) -> Result<&'a [Value]> {
    map.get(key)
        .and_then(Value::as_list)
        .ok_or_else(|| malformed(&format!("missing or non-list member {key}")))
}

fn malformed(reason: &str) -> EnvelopeError {
    EnvelopeError::Malformed(reason.to_owned())
}

pub(crate) fn b64url(bytes: &[u8]) -> String {
    URL_SAFE_NO_PAD.encode(bytes)
}

pub(crate) fn b64url_decode(s: &str) -> Result<Vec<u8>> {
    URL_SAFE_NO_PAD
        .decode(s)
        .map_err(|e| malformed(&format!("base64url: {e}")))
}
