//! Store backends the harness can run against.

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use dagjose_core::HashAlgorithm;
use dagjose_store::{HttpStore, HttpStoreConfig, MemoryStore, SqliteStore, Store};

use crate::error::{HarnessError, Result};

/// Which store implementation to open.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum BackendKind {
    Memory,
    /// SQLite file, or a private in-memory database when `path` is unset.
    Sqlite { path: Option<PathBuf> },
    /// An IPFS daemon's RPC API.
    Http(HttpStoreConfig),
}

/// A backend plus the hash algorithm every block is written with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackendSpec {
    #[serde(flatten)]
    pub kind: BackendKind,
    #[serde(default)]
    pub hash: HashAlgorithm,
}

impl BackendSpec {
    pub fn memory() -> Self {
        Self {
            kind: BackendKind::Memory,
            hash: HashAlgorithm::default(),
        }
    }

    pub fn sqlite(path: Option<PathBuf>) -> Self {
        Self {
            kind: BackendKind::Sqlite { path },
            hash: HashAlgorithm::default(),
        }
    }

    pub fn http(config: HttpStoreConfig) -> Self {
        Self {
            kind: BackendKind::Http(config),
            hash: HashAlgorithm::default(),
        }
    }

    pub fn with_hash(mut self, hash: HashAlgorithm) -> Self {
        self.hash = hash;
        self
    }

    /// Open a fresh handle. Dropping it releases the backend.
    pub fn open(&self) -> Result<Arc<dyn Store>> {
        debug!(backend = %self, "opening backend");
        let store: Arc<dyn Store> = match &self.kind {
            BackendKind::Memory => Arc::new(MemoryStore::new()),
            BackendKind::Sqlite { path: Some(path) } => {
                Arc::new(SqliteStore::open(path).map_err(|e| self.error(e))?)
            }
            BackendKind::Sqlite { path: None } => {
                Arc::new(SqliteStore::open_memory().map_err(|e| self.error(e))?)
            }
            BackendKind::Http(config) => {
                Arc::new(HttpStore::new(config).map_err(|e| self.error(e))?)
            }
        };
        Ok(store)
    }

    fn error(&self, source: dagjose_store::StoreError) -> HarnessError {
        HarnessError::Backend {
            backend: self.to_string(),
            source,
        }
    }
}

impl Default for BackendSpec {
    fn default() -> Self {
        Self::memory()
    }
}

impl fmt::Display for BackendSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            BackendKind::Memory => write!(f, "memory")?,
            BackendKind::Sqlite { path: Some(path) } => write!(f, "sqlite:{}", path.display())?,
            BackendKind::Sqlite { path: None } => write!(f, "sqlite::memory:")?,
            BackendKind::Http(config) => write!(f, "http:{}", config.url)?,
        }
        write!(f, "/{}", self.hash)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        assert_eq!(BackendSpec::memory().to_string(), "memory/sha2-256");
        assert_eq!(
            BackendSpec::sqlite(None)
                .with_hash(HashAlgorithm::Blake3)
                .to_string(),
            "sqlite::memory:/blake3"
        );
    }

    #[test]
    fn test_toml_shapes() {
        let spec: BackendSpec = toml::from_str("kind = \"memory\"").unwrap();
        assert_eq!(spec, BackendSpec::memory());

        let spec: BackendSpec =
            toml::from_str("kind = \"sqlite\"\npath = \"blocks.db\"\nhash = \"blake3\"").unwrap();
        assert_eq!(
            spec,
            BackendSpec::sqlite(Some("blocks.db".into())).with_hash(HashAlgorithm::Blake3)
        );

        let spec: BackendSpec =
            toml::from_str("kind = \"http\"\nurl = \"http://10.0.0.1:5001\"").unwrap();
        assert_eq!(spec, BackendSpec::http(HttpStoreConfig::new("http://10.0.0.1:5001")));
    }

    #[tokio::test]
    async fn test_open_local_backends() {
        for spec in [BackendSpec::memory(), BackendSpec::sqlite(None)] {
            let store = spec.open().unwrap();
            let cid = store
                .put(b"x", dagjose_core::Codec::Raw, spec.hash)
                .await
                .unwrap();
            assert!(store.has(&cid).await.unwrap());
        }
    }
}
