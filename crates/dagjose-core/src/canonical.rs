//! Canonical DAG-CBOR encoding.
//!
//! Structurally equal values always encode to identical bytes:
//! - Map keys sorted by encoded byte comparison (length first, then bytewise)
//! - Integers use the smallest valid encoding
//! - Definite lengths only
//! - Floats are always 64-bit and must be finite
//! - Links are tag 42 over `0x00 || cid_bytes`
//!
//! Decoding is strict: input whose re-encoding differs from the original
//! bytes is rejected, so a block can only ever have one valid form and
//! therefore one content id.

use std::collections::BTreeMap;

use ciborium::value::Value as Cbor;

use crate::cid::{Codec, ContentId, HashAlgorithm};
use crate::document::{Document, Value, PREV_KEY};
use crate::error::{EncodingError, Result};

/// Maximum nesting depth accepted when encoding or decoding.
pub const MAX_DEPTH: usize = 64;

/// CBOR tag for IPLD links.
const LINK_TAG: u64 = 42;

/// Encode a document to canonical DAG-CBOR bytes.
pub fn encode_document(doc: &Document) -> Result<Vec<u8>> {
    if doc.fields.contains_key(PREV_KEY) {
        return Err(EncodingError::ReservedKey);
    }

    let prev = doc.prev.map(Value::Link);
    let mut entries: Vec<(&str, &Value)> =
        doc.fields.iter().map(|(k, v)| (k.as_str(), v)).collect();
    if let Some(prev) = &prev {
        entries.push((PREV_KEY, prev));
    }

    let mut buf = Vec::new();
    encode_map(&mut buf, &entries, 1)?;
    Ok(buf)
}

/// Decode a document from canonical DAG-CBOR bytes.
pub fn decode_document(bytes: &[u8]) -> Result<Document> {
    let mut fields = match decode_value(bytes)? {
        Value::Map(fields) => fields,
        other => {
            return Err(EncodingError::Decoding(format!(
                "expected map, got {}",
                other.kind()
            )))
        }
    };

    let prev = match fields.remove(PREV_KEY) {
        Some(Value::Link(cid)) => Some(cid),
        Some(other) => return Err(EncodingError::InvalidPrev(other.kind().into())),
        None => None,
    };

    Ok(Document { fields, prev })
}

/// Encode a document and address it as a dag-cbor block.
pub fn document_block(doc: &Document, hash: HashAlgorithm) -> Result<(Vec<u8>, ContentId)> {
    let bytes = encode_document(doc)?;
    let cid = ContentId::compute(Codec::DagCbor, hash, &bytes)?;
    Ok((bytes, cid))
}

/// Encode any value to canonical DAG-CBOR bytes.
pub fn encode_value(value: &Value) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    encode_value_to(&mut buf, value, 0)?;
    Ok(buf)
}

/// Decode a value, rejecting anything not in canonical form.
pub fn decode_value(bytes: &[u8]) -> Result<Value> {
    let raw: Cbor =
        ciborium::from_reader(bytes).map_err(|e| EncodingError::Decoding(e.to_string()))?;
    let value = from_cbor(raw, 0)?;

    if encode_value(&value)? != bytes {
        return Err(EncodingError::NonCanonical);
    }
    Ok(value)
}

fn encode_value_to(buf: &mut Vec<u8>, value: &Value, depth: usize) -> Result<()> {
    if depth > MAX_DEPTH {
        return Err(EncodingError::TooDeep(MAX_DEPTH));
    }

    match value {
        Value::Null => buf.push(0xf6),
        Value::Bool(b) => buf.push(if *b { 0xf5 } else { 0xf4 }),
        Value::Integer(n) => encode_integer(buf, *n),
        Value::Float(f) => {
            if !f.is_finite() {
                return Err(EncodingError::NonFiniteFloat(f.to_string()));
            }
            buf.push(0xfb);
            buf.extend_from_slice(&f.to_be_bytes());
        }
        Value::Text(s) => encode_text(buf, s),
        Value::Bytes(b) => encode_bytes(buf, b),
        Value::List(items) => {
            encode_uint(buf, 4, items.len() as u64);
            for item in items {
                encode_value_to(buf, item, depth + 1)?;
            }
        }
        Value::Map(map) => {
            let entries: Vec<(&str, &Value)> = map.iter().map(|(k, v)| (k.as_str(), v)).collect();
            encode_map(buf, &entries, depth + 1)?;
        }
        Value::Link(cid) => encode_link(buf, cid),
    }
    Ok(())
}

/// Encode a signed integer (major types 0 and 1).
fn encode_integer(buf: &mut Vec<u8>, n: i64) {
    if n >= 0 {
        encode_uint(buf, 0, n as u64);
    } else {
        // CBOR encodes -1 as 0, -2 as 1, etc.
        encode_uint(buf, 1, (-1 - n) as u64);
    }
}

/// Encode an unsigned integer with the given major type.
fn encode_uint(buf: &mut Vec<u8>, major: u8, n: u64) {
    let mt = major << 5;
    if n < 24 {
        buf.push(mt | (n as u8));
    } else if n <= 0xff {
        buf.push(mt | 24);
        buf.push(n as u8);
    } else if n <= 0xffff {
        buf.push(mt | 25);
        buf.extend_from_slice(&(n as u16).to_be_bytes());
    } else if n <= 0xffff_ffff {
        buf.push(mt | 26);
        buf.extend_from_slice(&(n as u32).to_be_bytes());
    } else {
        buf.push(mt | 27);
        buf.extend_from_slice(&n.to_be_bytes());
    }
}

fn encode_bytes(buf: &mut Vec<u8>, bytes: &[u8]) {
    encode_uint(buf, 2, bytes.len() as u64);
    buf.extend_from_slice(bytes);
}

fn encode_text(buf: &mut Vec<u8>, s: &str) {
    encode_uint(buf, 3, s.len() as u64);
    buf.extend_from_slice(s.as_bytes());
}

fn encode_link(buf: &mut Vec<u8>, cid: &ContentId) {
    let cid_bytes = cid.to_bytes();
    encode_uint(buf, 6, LINK_TAG);
    encode_uint(buf, 2, cid_bytes.len() as u64 + 1);
    // multibase identity prefix required by DAG-CBOR
    buf.push(0x00);
    buf.extend_from_slice(&cid_bytes);
}

/// Encode a text-keyed map canonically (major type 5).
fn encode_map(buf: &mut Vec<u8>, entries: &[(&str, &Value)], depth: usize) -> Result<()> {
    let mut keyed: Vec<(Vec<u8>, &Value)> = entries
        .iter()
        .map(|(k, v)| {
            let mut key_buf = Vec::with_capacity(k.len() + 1);
            encode_text(&mut key_buf, k);
            (key_buf, *v)
        })
        .collect();

    // Shorter encoded keys sort first since the header carries the length.
    keyed.sort_by(|a, b| a.0.cmp(&b.0));

    encode_uint(buf, 5, keyed.len() as u64);
    for (key_bytes, value) in keyed {
        buf.extend_from_slice(&key_bytes);
        encode_value_to(buf, value, depth)?;
    }
    Ok(())
}

fn from_cbor(raw: Cbor, depth: usize) -> Result<Value> {
    if depth > MAX_DEPTH {
        return Err(EncodingError::TooDeep(MAX_DEPTH));
    }

    Ok(match raw {
        Cbor::Null => Value::Null,
        Cbor::Bool(b) => Value::Bool(b),
        Cbor::Integer(i) => {
            let n = i128::from(i);
            Value::Integer(i64::try_from(n).map_err(|_| EncodingError::IntegerOutOfRange(n))?)
        }
        Cbor::Float(f) => Value::Float(f),
        Cbor::Text(s) => Value::Text(s),
        Cbor::Bytes(b) => Value::Bytes(b),
        Cbor::Array(items) => Value::List(
            items
                .into_iter()
                .map(|item| from_cbor(item, depth + 1))
                .collect::<Result<_>>()?,
        ),
        Cbor::Map(entries) => {
            let mut map = BTreeMap::new();
            for (k, v) in entries {
                let Cbor::Text(key) = k else {
                    return Err(EncodingError::NonTextKey);
                };
                map.insert(key, from_cbor(v, depth + 1)?);
            }
            Value::Map(map)
        }
        Cbor::Tag(LINK_TAG, inner) => match *inner {
            Cbor::Bytes(b) if b.first() == Some(&0x00) => {
                Value::Link(ContentId::from_bytes(&b[1..])?)
            }
            _ => return Err(EncodingError::InvalidCid("malformed link".into())),
        },
        Cbor::Tag(tag, _) => return Err(EncodingError::Unsupported(format!("tag {tag}"))),
        other => return Err(EncodingError::Unsupported(format!("{other:?}"))),
    })
}
