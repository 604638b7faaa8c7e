//! Payload documents.
//!
//! A [`Document`] is a string-keyed map of [`Value`]s plus an explicit,
//! optional back-reference to the previous node of its chain. The
//! back-reference is encoded under the reserved `prev` key, which is why
//! that key may not appear in [`Document::fields`].

use std::collections::BTreeMap;

use serde::Serialize;

use crate::cid::ContentId;

/// Key under which the back-reference is encoded.
pub const PREV_KEY: &str = "prev";

/// A structured value inside a document.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
    Null,
    Bool(bool),
    Integer(i64),
    Float(f64),
    Text(String),
    Bytes(#[serde(with = "bytes_as_hex")] Vec<u8>),
    List(Vec<Value>),
    Map(BTreeMap<String, Value>),
    Link(ContentId),
}

impl Value {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_link(&self) -> Option<&ContentId> {
        match self {
            Value::Link(cid) => Some(cid),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Value::Bytes(b) => Some(b),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&BTreeMap<String, Value>> {
        match self {
            Value::Map(m) => Some(m),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(items) => Some(items),
            _ => None,
        }
    }

    /// Short type name for diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Integer(_) => "integer",
            Value::Float(_) => "float",
            Value::Text(_) => "text",
            Value::Bytes(_) => "bytes",
            Value::List(_) => "list",
            Value::Map(_) => "map",
            Value::Link(_) => "link",
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_owned())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Integer(n)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Float(n)
    }
}

impl From<Vec<u8>> for Value {
    fn from(b: Vec<u8>) -> Self {
        Value::Bytes(b)
    }
}

impl From<ContentId> for Value {
    fn from(cid: ContentId) -> Self {
        Value::Link(cid)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::List(items)
    }
}

impl From<BTreeMap<String, Value>> for Value {
    fn from(map: BTreeMap<String, Value>) -> Self {
        Value::Map(map)
    }
}

/// A chain payload: fields plus an optional link to the previous node.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Document {
    pub fields: BTreeMap<String, Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prev: Option<ContentId>,
}

impl Document {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a field (builder style).
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(key.into(), value.into());
        self
    }

    /// Set the back-reference (builder style).
    pub fn with_prev(mut self, prev: ContentId) -> Self {
        self.prev = Some(prev);
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.fields.insert(key.into(), value.into())
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    pub fn prev(&self) -> Option<&ContentId> {
        self.prev.as_ref()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty() && self.prev.is_none()
    }
}

mod bytes_as_hex {
    use serde::Serializer;

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&hex::encode(bytes))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cid::{Codec, HashAlgorithm};

    #[test]
    fn test_builder() {
        let prev = ContentId::compute(Codec::DagJose, HashAlgorithm::Sha2_256, b"p").unwrap();
        let doc = Document::new()
            .with("hello", "world")
            .with("n", 3i64)
            .with_prev(prev);

        assert_eq!(doc.get("hello").and_then(Value::as_text), Some("world"));
        assert_eq!(doc.get("n"), Some(&Value::Integer(3)));
        assert_eq!(doc.prev(), Some(&prev));
        assert!(!doc.is_empty());
    }

    #[test]
    fn test_json_view() {
        let doc = Document::new().with("hello", "world").with("raw", vec![0xde, 0xad]);
        let json = serde_json::to_value(&doc).unwrap();
        assert_eq!(json["fields"]["hello"], "world");
        assert_eq!(json["fields"]["raw"], "dead");
        assert!(json.get("prev").is_none());
    }
}
