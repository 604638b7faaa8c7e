//! In-process fake of the IPFS block RPC API.
//!
//! Serves the handful of `/api/v0` endpoints [`dagjose_store::HttpStore`]
//! uses, on an ephemeral localhost port. A [`Behaviour`] other than
//! `Honest` makes it misbehave in ways the client must catch.

use std::collections::{HashMap, HashSet};
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use axum::extract::{Multipart, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use serde_json::json;
use tokio::task::JoinHandle;

use dagjose_core::{Codec, ContentId, HashAlgorithm};

/// How the fake daemon treats requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Behaviour {
    #[default]
    Honest,
    /// Ignore `mhtype` and always hash with this algorithm.
    ForceHash(HashAlgorithm),
    /// Append a byte to every block returned by `block/get`.
    CorruptReads,
}

#[derive(Default)]
struct Daemon {
    behaviour: Behaviour,
    blocks: Mutex<HashMap<String, Vec<u8>>>,
    pins: Mutex<HashSet<String>>,
}

type Shared = Arc<Daemon>;
type Params = Query<HashMap<String, String>>;

/// A running fake daemon. Shut down on drop.
pub struct FakeIpfs {
    addr: SocketAddr,
    daemon: Shared,
    task: JoinHandle<()>,
}

impl FakeIpfs {
    /// Start an honest daemon.
    pub async fn spawn() -> std::io::Result<Self> {
        Self::spawn_with(Behaviour::Honest).await
    }

    pub async fn spawn_with(behaviour: Behaviour) -> std::io::Result<Self> {
        let daemon = Arc::new(Daemon {
            behaviour,
            ..Daemon::default()
        });

        let app = Router::new()
            .route("/api/v0/block/put", post(block_put))
            .route("/api/v0/block/get", post(block_get))
            .route("/api/v0/block/stat", post(block_stat))
            .route("/api/v0/pin/add", post(pin_add))
            .route("/api/v0/pin/ls", post(pin_ls))
            .with_state(daemon.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        let task = tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        Ok(Self { addr, daemon, task })
    }

    /// Base URL to hand to `HttpStoreConfig`.
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn block_count(&self) -> usize {
        self.daemon.blocks.lock().map(|b| b.len()).unwrap_or(0)
    }

    pub fn is_pinned(&self, cid: &ContentId) -> bool {
        self.daemon
            .pins
            .lock()
            .map(|p| p.contains(&cid.to_string()))
            .unwrap_or(false)
    }
}

impl Drop for FakeIpfs {
    fn drop(&mut self) {
        self.task.abort();
    }
}

fn api_error(message: String) -> Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({ "Message": message, "Code": 0, "Type": "error" })),
    )
        .into_response()
}

fn not_found(cid: &str) -> Response {
    api_error(format!(
        "block was not found locally (offline): ipld: could not find {cid}"
    ))
}

fn codec_from_name(name: &str) -> Option<Codec> {
    [Codec::Raw, Codec::DagCbor, Codec::DagJose]
        .into_iter()
        .find(|c| c.name() == name)
}

async fn block_put(State(daemon): State<Shared>, Query(params): Params, mut multipart: Multipart) -> Response {
    let mut data = None;
    while let Ok(Some(field)) = multipart.next_field().await {
        match field.bytes().await {
            Ok(bytes) => data = Some(bytes.to_vec()),
            Err(e) => return api_error(e.to_string()),
        }
    }
    let Some(data) = data else {
        return api_error("file argument 'data' is required".into());
    };

    let codec = params
        .get("cid-codec")
        .map(String::as_str)
        .map_or(Some(Codec::Raw), codec_from_name);
    let hash = match daemon.behaviour {
        Behaviour::ForceHash(hash) => Ok(hash),
        _ => params
            .get("mhtype")
            .map_or(Ok(HashAlgorithm::Sha2_256), |s| s.parse()),
    };
    let (Some(codec), Ok(hash)) = (codec, hash) else {
        return api_error("unsupported codec or hash".into());
    };

    let cid = match ContentId::compute(codec, hash, &data) {
        Ok(cid) => cid.to_string(),
        Err(e) => return api_error(e.to_string()),
    };
    let size = data.len();
    if let Ok(mut blocks) = daemon.blocks.lock() {
        blocks.insert(cid.clone(), data);
    }
    Json(json!({ "Key": cid, "Size": size })).into_response()
}

async fn block_get(State(daemon): State<Shared>, Query(params): Params) -> Response {
    let cid = params.get("arg").cloned().unwrap_or_default();
    let block = daemon.blocks.lock().ok().and_then(|b| b.get(&cid).cloned());
    match block {
        Some(mut data) => {
            if daemon.behaviour == Behaviour::CorruptReads {
                data.push(0);
            }
            data.into_response()
        }
        None => not_found(&cid),
    }
}

async fn block_stat(State(daemon): State<Shared>, Query(params): Params) -> Response {
    let cid = params.get("arg").cloned().unwrap_or_default();
    let size = daemon.blocks.lock().ok().and_then(|b| b.get(&cid).map(Vec::len));
    match size {
        Some(size) => Json(json!({ "Key": cid, "Size": size })).into_response(),
        None => not_found(&cid),
    }
}

async fn pin_add(State(daemon): State<Shared>, Query(params): Params) -> Response {
    let cid = params.get("arg").cloned().unwrap_or_default();
    let present = daemon
        .blocks
        .lock()
        .map(|b| b.contains_key(&cid))
        .unwrap_or(false);
    if !present {
        return not_found(&cid);
    }
    if let Ok(mut pins) = daemon.pins.lock() {
        pins.insert(cid.clone());
    }
    Json(json!({ "Pins": [cid] })).into_response()
}

async fn pin_ls(State(daemon): State<Shared>, Query(params): Params) -> Response {
    let cid = params.get("arg").cloned().unwrap_or_default();
    let pinned = daemon
        .pins
        .lock()
        .map(|p| p.contains(&cid))
        .unwrap_or(false);
    if pinned {
        Json(json!({ "Keys": { cid: { "Type": "recursive" } } })).into_response()
    } else {
        api_error(format!("path '{cid}' is not pinned"))
    }
}
