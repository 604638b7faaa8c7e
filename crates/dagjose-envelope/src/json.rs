//! JOSE general JSON serialization.
//!
//! The same envelopes as [`crate::envelope`], but as the JSON objects JOSE
//! libraries exchange: binary members are base64url text without padding.
//!
//! ```text
//! { "payload": "AXESI...", "signatures": [{ "protected": "eyJ...", "signature": "..." }] }
//! ```
//!
//! Parsing picks the variant from the `payload` or `ciphertext` member. A
//! `link` member, as some encoders add next to `payload`, is ignored; the
//! link is always derived from the payload itself.

use serde::{Deserialize, Serialize};

use dagjose_core::{ContentId, X25519PublicKey};

use crate::aead::Iv;
use crate::envelope::{b64url, b64url_decode, EncryptedEnvelope, Envelope, Signature, SignedEnvelope};
use crate::error::{DecryptionError, EnvelopeError, Result};
use crate::keywrap::{WrappedKey, KEY_WRAP_ALG};

#[derive(Serialize, Deserialize)]
struct JsonSignature {
    protected: String,
    signature: String,
}

#[derive(Serialize, Deserialize)]
struct JsonJws {
    payload: String,
    signatures: Vec<JsonSignature>,
}

#[derive(Serialize, Deserialize)]
struct JsonEpk {
    crv: String,
    kty: String,
    x: String,
}

#[derive(Serialize, Deserialize)]
struct JsonRecipientHeader {
    alg: String,
    epk: JsonEpk,
    iv: String,
    kid: String,
    tag: String,
}

#[derive(Serialize, Deserialize)]
struct JsonRecipient {
    encrypted_key: String,
    header: JsonRecipientHeader,
}

#[derive(Serialize, Deserialize)]
struct JsonJwe {
    protected: String,
    iv: String,
    ciphertext: String,
    tag: String,
    recipients: Vec<JsonRecipient>,
}

impl Envelope {
    /// Parse a general JSON JWS or JWE.
    pub fn from_general_json(json: &str) -> Result<Self> {
        let value: serde_json::Value = serde_json::from_str(json).map_err(json_error)?;
        let object = value
            .as_object()
            .ok_or_else(|| EnvelopeError::Malformed("expected a json object".into()))?;

        if object.contains_key("payload") {
            Ok(Envelope::Signed(SignedEnvelope::from_json_value(value)?))
        } else if object.contains_key("ciphertext") {
            Ok(Envelope::Encrypted(EncryptedEnvelope::from_json_value(value)?))
        } else {
            Err(EnvelopeError::UnknownFormat)
        }
    }

    pub fn to_general_json(&self) -> Result<String> {
        match self {
            Envelope::Signed(env) => env.to_general_json(),
            Envelope::Encrypted(env) => env.to_general_json(),
        }
    }
}

impl SignedEnvelope {
    pub fn from_general_json(json: &str) -> Result<Self> {
        Self::from_json_value(serde_json::from_str(json).map_err(json_error)?)
    }

    pub fn to_general_json(&self) -> Result<String> {
        let jws = JsonJws {
            payload: b64url(&self.link.to_bytes()),
            signatures: self
                .signatures
                .iter()
                .map(|sig| JsonSignature {
                    protected: b64url(&sig.protected),
                    signature: b64url(&sig.signature),
                })
                .collect(),
        };
        serde_json::to_string(&jws).map_err(json_error)
    }

    fn from_json_value(value: serde_json::Value) -> Result<Self> {
        let jws: JsonJws = serde_json::from_value(value).map_err(json_error)?;
        let link = ContentId::from_bytes(&b64url_decode(&jws.payload)?)?;

        let signatures = jws
            .signatures
            .into_iter()
            .map(|sig| {
                Ok(Signature {
                    protected: b64url_decode(&sig.protected)?,
                    signature: b64url_decode(&sig.signature)?,
                })
            })
            .collect::<Result<_>>()?;

        Ok(Self { link, signatures })
    }
}

impl EncryptedEnvelope {
    pub fn from_general_json(json: &str) -> Result<Self> {
        Self::from_json_value(serde_json::from_str(json).map_err(json_error)?)
    }

    pub fn to_general_json(&self) -> Result<String> {
        let jwe = JsonJwe {
            protected: b64url(&self.protected),
            iv: b64url(self.iv.as_bytes()),
            ciphertext: b64url(&self.ciphertext),
            tag: b64url(&self.tag),
            recipients: self
                .recipients
                .iter()
                .map(|wrapped| JsonRecipient {
                    encrypted_key: b64url(&wrapped.encrypted_key),
                    header: JsonRecipientHeader {
                        alg: KEY_WRAP_ALG.to_owned(),
                        epk: JsonEpk {
                            crv: "X25519".to_owned(),
                            kty: "OKP".to_owned(),
                            x: b64url(wrapped.epk.as_bytes()),
                        },
                        iv: b64url(wrapped.iv.as_bytes()),
                        kid: wrapped.kid.clone(),
                        tag: b64url(&wrapped.tag),
                    },
                })
                .collect(),
        };
        serde_json::to_string(&jwe).map_err(json_error)
    }

    fn from_json_value(value: serde_json::Value) -> Result<Self> {
        let jwe: JsonJwe = serde_json::from_value(value).map_err(json_error)?;

        let recipients = jwe
            .recipients
            .into_iter()
            .map(recipient_from_json)
            .collect::<Result<_>>()?;

        Ok(Self {
            protected: b64url_decode(&jwe.protected)?,
            iv: Iv::from_slice(&b64url_decode(&jwe.iv)?).ok_or_else(|| malformed("iv length"))?,
            ciphertext: b64url_decode(&jwe.ciphertext)?,
            tag: b64url_decode(&jwe.tag)?
                .try_into()
                .map_err(|_| malformed("tag length"))?,
            recipients,
        })
    }
}

fn recipient_from_json(recipient: JsonRecipient) -> Result<WrappedKey> {
    let header = recipient.header;
    if header.alg != KEY_WRAP_ALG {
        return Err(DecryptionError::UnsupportedAlgorithm(header.alg).into());
    }

    let x: [u8; 32] = b64url_decode(&header.epk.x)?
        .try_into()
        .map_err(|_| malformed("epk length"))?;

    Ok(WrappedKey {
        kid: header.kid,
        epk: X25519PublicKey(x),
        iv: Iv::from_slice(&b64url_decode(&header.iv)?)
            .ok_or_else(|| malformed("recipient iv length"))?,
        tag: b64url_decode(&header.tag)?
            .try_into()
            .map_err(|_| malformed("recipient tag length"))?,
        encrypted_key: b64url_decode(&recipient.encrypted_key)?,
    })
}

fn json_error(e: serde_json::Error) -> EnvelopeError {
    EnvelopeError::Malformed(format!("json: {e}"))
}

fn malformed(reason: &str) -> EnvelopeError {
    EnvelopeError::Malformed(reason.to_owned())
}
