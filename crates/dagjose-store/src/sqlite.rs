//! SQLite implementation of the Store trait.
//!
//! The local persistent backend. It uses rusqlite with bundled SQLite,
//! wrapped in async via `tokio::task::spawn_blocking`.

use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use rusqlite::{params, Connection, OptionalExtension};
use tracing::debug;

use dagjose_core::{Codec, ContentId, HashAlgorithm};

use crate::error::{Result, StoreError};
use crate::migration::{self, now_millis};
use crate::traits::Store;

/// How long a statement waits on another connection's write lock.
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// SQLite-based store implementation.
///
/// Thread-safe via internal Mutex. Every operation runs on the blocking
/// pool and holds the connection for exactly one statement group, so a
/// cancelled caller never leaves a half-applied write behind.
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    /// Open a SQLite database at the given path.
    ///
    /// Creates the file and runs migrations if needed. Several stores may
    /// open the same file; writers wait up to five seconds for each other.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let mut conn = Connection::open(path)?;
        conn.busy_timeout(BUSY_TIMEOUT)?;
        migration::migrate(&mut conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Open an in-memory SQLite database.
    pub fn open_memory() -> Result<Self> {
        let mut conn = Connection::open_in_memory()?;
        migration::migrate(&mut conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Run a blocking operation on the connection off the async runtime.
    async fn with_conn<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let conn = self.conn.clone();

        tokio::task::spawn_blocking(move || {
            let conn = conn.lock().map_err(|e| {
                StoreError::Database(rusqlite::Error::SqliteFailure(
                    rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_LOCKED),
                    Some(format!("mutex poisoned: {}", e)),
                ))
            })?;
            f(&conn)
        })
        .await
        .map_err(|e| {
            StoreError::Database(rusqlite::Error::SqliteFailure(
                rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_ERROR),
                Some(format!("spawn_blocking failed: {}", e)),
            ))
        })?
    }
}

#[async_trait]
impl Store for SqliteStore {
    async fn put(&self, data: &[u8], codec: Codec, hash: HashAlgorithm) -> Result<ContentId> {
        let cid = ContentId::compute(codec, hash, data)?;
        let data = data.to_vec();

        self.with_conn(move |conn| {
            let inserted = conn.execute(
                "INSERT OR IGNORE INTO blocks (cid, codec, data, pinned, stored_at)
                 VALUES (?1, ?2, ?3, 0, ?4)",
                params![cid.to_bytes(), codec.code() as i64, data, now_millis()],
            )?;
            debug!(%cid, inserted, "sqlite put");
            Ok(cid)
        })
        .await
    }

    async fn get(&self, cid: &ContentId) -> Result<Bytes> {
        let cid = *cid;

        self.with_conn(move |conn| {
            let data: Option<Vec<u8>> = conn
                .query_row(
                    "SELECT data FROM blocks WHERE cid = ?1",
                    params![cid.to_bytes()],
                    |row| row.get(0),
                )
                .optional()?;
            data.map(Bytes::from).ok_or(StoreError::NotFound(cid))
        })
        .await
    }

    async fn has(&self, cid: &ContentId) -> Result<bool> {
        let cid = *cid;

        self.with_conn(move |conn| {
            let count: i64 = conn.query_row(
                "SELECT COUNT(*) FROM blocks WHERE cid = ?1",
                params![cid.to_bytes()],
                |row| row.get(0),
            )?;
            Ok(count > 0)
        })
        .await
    }

    async fn pin(&self, cid: &ContentId) -> Result<()> {
        let cid = *cid;

        self.with_conn(move |conn| {
            let updated = conn.execute(
                "UPDATE blocks SET pinned = 1 WHERE cid = ?1",
                params![cid.to_bytes()],
            )?;
            if updated == 0 {
                return Err(StoreError::NotFound(cid));
            }
            Ok(())
        })
        .await
    }

    async fn is_pinned(&self, cid: &ContentId) -> Result<bool> {
        let cid = *cid;

        self.with_conn(move |conn| {
            let pinned: Option<i64> = conn
                .query_row(
                    "SELECT pinned FROM blocks WHERE cid = ?1",
                    params![cid.to_bytes()],
                    |row| row.get(0),
                )
                .optional()?;
            Ok(pinned == Some(1))
        })
        .await
    }
}
