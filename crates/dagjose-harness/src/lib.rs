//! # dagjose-harness
//!
//! Differential testing of store backends.
//!
//! The same fixed script (sign two linked documents, verify them, encrypt
//! two linked documents, decrypt them, walk both chains) runs once per
//! backend. Every observable value goes into a [`TestLog`], and the two logs
//! must be structurally equal. This is an equivalence oracle: a
//! [`Verdict::Divergence`] says the backends are not interchangeable, not
//! which one is wrong.
//!
//! ```rust,no_run
//! use dagjose_harness::{BackendSpec, Harness, HarnessConfig};
//!
//! # async fn example() -> dagjose_harness::Result<()> {
//! let config = HarnessConfig::default();
//! let verdict = Harness::from_config(&config)
//!     .run_pair(&BackendSpec::memory(), &BackendSpec::sqlite(None), false)
//!     .await?;
//! assert!(verdict.is_pass());
//! # Ok(())
//! # }
//! ```

pub mod backend;
pub mod compare;
pub mod config;
pub mod error;
pub mod harness;
pub mod log;

pub use backend::{BackendKind, BackendSpec};
pub use compare::{compare, Divergence, Mismatch, Verdict};
pub use config::HarnessConfig;
pub use error::{HarnessError, Result};
pub use harness::Harness;
pub use log::{LogEntry, LogValue, TestLog};
