//! IPFS HTTP RPC implementation of the Store trait.
//!
//! Talks to a Kubo-compatible daemon over `/api/v0`:
//!
//! | Operation   | Endpoint                                          |
//! |-------------|---------------------------------------------------|
//! | `put`       | `block/put?cid-codec=..&mhtype=..` (multipart)    |
//! | `get`       | `block/get?arg=<cid>`                             |
//! | `has`       | `block/stat?arg=<cid>`                            |
//! | `pin`       | `pin/add?arg=<cid>`                               |
//! | `is_pinned` | `pin/ls?arg=<cid>`                                |
//!
//! The daemon is not trusted: a CID it returns must match the locally
//! computed one, and fetched bytes must hash to the requested CID.

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, Response};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use dagjose_core::{Codec, ContentId, HashAlgorithm};

use crate::error::{Result, StoreError};
use crate::traits::Store;

/// Connection settings for [`HttpStore`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpStoreConfig {
    /// Base URL of the RPC API, without `/api/v0`.
    pub url: String,
    /// Per-request timeout in milliseconds.
    pub timeout_ms: u64,
}

impl Default for HttpStoreConfig {
    fn default() -> Self {
        Self {
            url: "http://127.0.0.1:5001".into(),
            timeout_ms: 30_000,
        }
    }
}

impl HttpStoreConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Self::default()
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout_ms = timeout.as_millis() as u64;
        self
    }
}

/// Remote block store backed by an IPFS daemon.
pub struct HttpStore {
    client: Client,
    api: String,
}

#[derive(Debug, Deserialize)]
struct BlockPutResponse {
    #[serde(rename = "Key")]
    key: String,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    #[serde(rename = "Message")]
    message: String,
}

impl HttpStore {
    /// Build a client. No request is made until the first operation.
    pub fn new(config: &HttpStoreConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .map_err(|e| StoreError::Http(format!("failed to build client: {e}")))?;

        Ok(Self {
            client,
            api: format!("{}/api/v0", config.url.trim_end_matches('/')),
        })
    }

    async fn call(&self, endpoint: &str, query: &[(&str, String)], form: Option<Form>) -> Result<Response> {
        let mut request = self
            .client
            .post(format!("{}/{}", self.api, endpoint))
            .query(query);
        if let Some(form) = form {
            request = request.multipart(form);
        }

        request.send().await.map_err(|e| {
            if e.is_connect() || e.is_timeout() {
                StoreError::Unavailable(format!("{endpoint}: {e}"))
            } else {
                StoreError::Http(format!("{endpoint}: {e}"))
            }
        })
    }

    /// Map an unsuccessful response to an error. Daemons report a missing
    /// block as a 500 whose message mentions "not found".
    async fn failure(endpoint: &str, response: Response, cid: Option<ContentId>) -> StoreError {
        let status = response.status();
        let message = match response.json::<ApiError>().await {
            Ok(body) => body.message,
            Err(_) => status.to_string(),
        };

        match cid {
            Some(cid) if message.contains("not found") => StoreError::NotFound(cid),
            _ => StoreError::Http(format!("{endpoint} returned {status}: {message}")),
        }
    }
}

fn arg(cid: &ContentId) -> (&'static str, String) {
    ("arg", cid.to_string())
}

fn offline() -> (&'static str, String) {
    ("offline", "true".to_owned())
}

#[async_trait]
impl Store for HttpStore {
    async fn put(&self, data: &[u8], codec: Codec, hash: HashAlgorithm) -> Result<ContentId> {
        let expected = ContentId::compute(codec, hash, data)?;

        let form = Form::new().part("file", Part::bytes(data.to_vec()).file_name("block"));
        let query = [
            ("cid-codec", codec.name().to_owned()),
            ("mhtype", hash.name().to_owned()),
            ("pin", "false".to_owned()),
        ];
        let response = self.call("block/put", &query, Some(form)).await?;
        if !response.status().is_success() {
            return Err(Self::failure("block/put", response, None).await);
        }

        let body: BlockPutResponse = response
            .json()
            .await
            .map_err(|e| StoreError::Http(format!("block/put: {e}")))?;
        let actual: ContentId = body.key.parse()?;

        if actual != expected {
            warn!(%expected, %actual, "daemon addressed block differently");
            return Err(StoreError::CidMismatch { expected, actual });
        }
        debug!(cid = %actual, len = data.len(), "http put");
        Ok(actual)
    }

    async fn get(&self, cid: &ContentId) -> Result<Bytes> {
        let response = self
            .call("block/get", &[arg(cid), offline()], None)
            .await?;
        if !response.status().is_success() {
            return Err(Self::failure("block/get", response, Some(*cid)).await);
        }

        let data = response
            .bytes()
            .await
            .map_err(|e| StoreError::Http(format!("block/get: {e}")))?;
        if !cid.verify(&data) {
            return Err(StoreError::InvalidData(format!(
                "block returned for {cid} does not match its cid"
            )));
        }
        Ok(data)
    }

    async fn has(&self, cid: &ContentId) -> Result<bool> {
        let response = self
            .call("block/stat", &[arg(cid), offline()], None)
            .await?;
        if response.status().is_success() {
            return Ok(true);
        }
        match Self::failure("block/stat", response, Some(*cid)).await {
            StoreError::NotFound(_) => Ok(false),
            other => Err(other),
        }
    }

    async fn pin(&self, cid: &ContentId) -> Result<()> {
        let response = self.call("pin/add", &[arg(cid), offline()], None).await?;
        if !response.status().is_success() {
            return Err(Self::failure("pin/add", response, Some(*cid)).await);
        }
        Ok(())
    }

    async fn is_pinned(&self, cid: &ContentId) -> Result<bool> {
        let response = self.call("pin/ls", &[arg(cid), offline()], None).await?;
        if response.status().is_success() {
            return Ok(true);
        }
        match Self::failure("pin/ls", response, Some(*cid)).await {
            StoreError::Http(message) if message.contains("not pinned") => Ok(false),
            StoreError::NotFound(_) => Ok(false),
            other => Err(other),
        }
    }
}
