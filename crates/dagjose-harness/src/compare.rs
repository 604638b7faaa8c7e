//! Structural comparison of two run logs.

use std::fmt;

use serde::Serialize;

use crate::error::{HarnessError, Result};
use crate::log::{LogEntry, TestLog};

/// The first position at which two logs differ. An entry is `None` when
/// that log ended early.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Mismatch {
    pub index: usize,
    pub left: Option<LogEntry>,
    pub right: Option<LogEntry>,
}

/// Two logs that are not equal, kept whole for diagnosis.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Divergence {
    pub left: TestLog,
    pub right: TestLog,
    pub first_mismatch: Mismatch,
}

impl fmt::Display for Divergence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let side = |entry: &Option<LogEntry>| match entry {
            Some(entry) => entry.to_string(),
            None => "<end of log>".to_owned(),
        };
        write!(
            f,
            "logs diverge at entry {}\n  left:  {}\n  right: {}",
            self.first_mismatch.index,
            side(&self.first_mismatch.left),
            side(&self.first_mismatch.right),
        )
    }
}

/// Outcome of comparing two runs.
#[derive(Debug, Clone, PartialEq)]
pub enum Verdict {
    Pass,
    Divergence(Box<Divergence>),
}

impl Verdict {
    pub fn is_pass(&self) -> bool {
        matches!(self, Verdict::Pass)
    }

    /// Turn a divergence into [`HarnessError::Divergence`].
    pub fn into_result(self) -> Result<()> {
        match self {
            Verdict::Pass => Ok(()),
            Verdict::Divergence(d) => Err(HarnessError::Divergence(d)),
        }
    }
}

/// Compare two logs entry by entry.
pub fn compare(left: TestLog, right: TestLog) -> Verdict {
    let len = left.len().max(right.len());
    let index = (0..len).find(|&i| left.entries().get(i) != right.entries().get(i));

    match index {
        None => Verdict::Pass,
        Some(index) => {
            let first_mismatch = Mismatch {
                index,
                left: left.entries().get(index).cloned(),
                right: right.entries().get(index).cloned(),
            };
            Verdict::Divergence(Box::new(Divergence {
                left,
                right,
                first_mismatch,
            }))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::log::LogValue;

    fn log(values: &[&str]) -> TestLog {
        let mut log = TestLog::new();
        for (i, v) in values.iter().enumerate() {
            log.record(format!("step{i}"), LogValue::Text((*v).to_owned()));
        }
        log
    }

    #[test]
    fn test_equal_logs_pass() {
        assert!(compare(log(&["a", "b"]), log(&["a", "b"])).is_pass());
        assert!(compare(TestLog::new(), TestLog::new()).is_pass());
    }

    #[test]
    fn test_first_mismatch_reported() {
        let Verdict::Divergence(d) = compare(log(&["a", "b", "c"]), log(&["a", "x", "y"])) else {
            panic!("expected divergence");
        };
        assert_eq!(d.first_mismatch.index, 1);
        assert_eq!(d.first_mismatch.left.as_ref().unwrap().value, LogValue::Text("b".into()));
        assert_eq!(d.first_mismatch.right.as_ref().unwrap().value, LogValue::Text("x".into()));
        // Both full logs are kept.
        assert_eq!(d.left.len(), 3);
        assert_eq!(d.right.len(), 3);
    }

    #[test]
    fn test_shorter_log_diverges() {
        let Verdict::Divergence(d) = compare(log(&["a"]), log(&["a", "b"])) else {
            panic!("expected divergence");
        };
        assert_eq!(d.first_mismatch.index, 1);
        assert!(d.first_mismatch.left.is_none());
        assert!(d.to_string().contains("<end of log>"));
    }

    #[test]
    fn test_into_result() {
        assert!(compare(log(&["a"]), log(&["a"])).into_result().is_ok());
        assert!(matches!(
            compare(log(&["a"]), log(&["b"])).into_result(),
            Err(HarnessError::Divergence(_))
        ));
    }
}
