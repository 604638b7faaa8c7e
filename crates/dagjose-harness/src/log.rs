//! The ordered record of one harness run.

use std::fmt;

use serde::Serialize;

use dagjose_core::{ContentId, Did, Document};

/// One observable value.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum LogValue {
    Cid(ContentId),
    Document(Document),
    Signers(Vec<Did>),
    Flag(bool),
    Text(String),
}

impl fmt::Display for LogValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogValue::Cid(cid) => write!(f, "{cid}"),
            LogValue::Document(doc) => match serde_json::to_string(doc) {
                Ok(json) => f.write_str(&json),
                Err(_) => write!(f, "{doc:?}"),
            },
            LogValue::Signers(signers) => {
                let names: Vec<_> = signers.iter().map(Did::as_str).collect();
                write!(f, "[{}]", names.join(", "))
            }
            LogValue::Flag(flag) => write!(f, "{flag}"),
            LogValue::Text(text) => f.write_str(text),
        }
    }
}

/// A labelled value.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LogEntry {
    pub label: String,
    pub value: LogValue,
}

impl fmt::Display for LogEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} = {}", self.label, self.value)
    }
}

/// Ordered `(label, value)` pairs from one run. Comparison is structural
/// over the whole sequence.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct TestLog {
    entries: Vec<LogEntry>,
}

impl TestLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, label: impl Into<String>, value: LogValue) {
        self.entries.push(LogEntry {
            label: label.into(),
            value,
        });
    }

    pub fn entries(&self) -> &[LogEntry] {
        &self.entries
    }

    pub fn get(&self, label: &str) -> Option<&LogValue> {
        self.entries
            .iter()
            .find(|e| e.label == label)
            .map(|e| &e.value)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
