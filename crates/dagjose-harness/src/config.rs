//! Harness configuration, optionally loaded from TOML.
//!
//! ```toml
//! seed_phrase = "me secret string to provide entropy"
//! rng_seed = 7
//! parallel = true
//!
//! [left]
//! kind = "memory"
//!
//! [right]
//! kind = "http"
//! url = "http://127.0.0.1:5001"
//! timeout_ms = 10000
//! hash = "sha2-256"
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use dagjose_core::Identity;

use crate::backend::BackendSpec;
use crate::error::{HarnessError, Result};

/// Passphrase the default identity is derived from.
pub const DEFAULT_SEED_PHRASE: &str = "me secret string to provide entropy";

/// Seed for the encryption RNG of every run.
pub const DEFAULT_RNG_SEED: u64 = 7;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HarnessConfig {
    pub left: BackendSpec,
    pub right: BackendSpec,
    /// SHA-256 of this phrase seeds the identity.
    pub seed_phrase: String,
    pub rng_seed: u64,
    /// Run both backends concurrently.
    pub parallel: bool,
    pub pin: bool,
    pub max_depth: Option<usize>,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            left: BackendSpec::memory(),
            right: BackendSpec::sqlite(None),
            seed_phrase: DEFAULT_SEED_PHRASE.to_owned(),
            rng_seed: DEFAULT_RNG_SEED,
            parallel: false,
            pin: true,
            max_depth: None,
        }
    }
}

impl HarnessConfig {
    pub fn from_toml(s: &str) -> Result<Self> {
        toml::from_str(s).map_err(|e| HarnessError::Config(e.to_string()))
    }

    /// Load from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| HarnessError::Config(format!("failed to read {}: {e}", path.display())))?;
        Self::from_toml(&text)
    }

    pub fn identity(&self) -> Identity {
        Identity::from_passphrase(&self.seed_phrase)
    }
}
