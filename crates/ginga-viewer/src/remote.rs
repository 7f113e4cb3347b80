//! JSON-RPC client for a viewer process listening on `host:port`.
//!
//! Every call is an HTTP `POST /` carrying a JSON-RPC 2.0 request. The viewer
//! answers with either a `result` or an `error` object.

use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use ginga_core::config::ViewerConfig;
use ginga_core::models::ChannelName;
use ginga_core::{ActorError, Result};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::debug;

use crate::fits::HduPayload;
use crate::viewer::{ChannelHandle, Viewer};

#[derive(Debug, Serialize)]
struct RpcRequest<'a> {
    jsonrpc: &'static str,
    id: u64,
    method: &'a str,
    params: Value,
}

#[derive(Debug, Deserialize)]
struct RpcResponse {
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<RpcErrorBody>,
}

#[derive(Debug, Deserialize)]
struct RpcErrorBody {
    #[serde(default)]
    code: i64,
    message: String,
}

/// Why a call failed: the viewer said no, or we never got an answer.
#[derive(Debug)]
enum CallError {
    Rejected { code: i64, message: String },
    Transport(String),
}

impl From<CallError> for ActorError {
    fn from(err: CallError) -> Self {
        match err {
            CallError::Rejected { code, message } => {
                ActorError::Viewer(format!("rpc error {code}: {message}"))
            }
            CallError::Transport(message) => ActorError::Viewer(message),
        }
    }
}

/// Remote viewer reached over HTTP.
///
/// No request timeout is configured: a viewer that stops answering stalls
/// the caller.
pub struct RemoteViewer {
    client: reqwest::Client,
    url: String,
    next_id: AtomicU64,
}

impl RemoteViewer {
    /// Client for the viewer's JSON-RPC endpoint at `http://host:port/`.
    pub fn new(host: &str, port: u16) -> Self {
        Self {
            client: reqwest::Client::new(),
            url: format!("http://{host}:{port}/"),
            next_id: AtomicU64::new(1),
        }
    }

    pub fn from_config(config: &ViewerConfig) -> Self {
        Self::new(&config.host, config.port)
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    async fn call(&self, method: &str, params: Value) -> std::result::Result<Value, CallError> {
        let request = RpcRequest {
            jsonrpc: "2.0",
            id: self.next_id.fetch_add(1, Ordering::Relaxed),
            method,
            params,
        };
        debug!(method, id = request.id, url = %self.url, "viewer rpc");

        let response = self
            .client
            .post(&self.url)
            .json(&request)
            .send()
            .await
            .map_err(|e| CallError::Transport(format!("{method}: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(CallError::Transport(format!("{method}: HTTP {status} - {body}")));
        }

        let body: RpcResponse = response
            .json()
            .await
            .map_err(|e| CallError::Transport(format!("{method}: invalid response: {e}")))?;

        match (body.error, body.result) {
            (Some(error), _) => Err(CallError::Rejected {
                code: error.code,
                message: error.message,
            }),
            (None, result) => Ok(result.unwrap_or(Value::Null)),
        }
    }
}

#[async_trait]
impl Viewer for RemoteViewer {
    async fn channel(&self, name: &ChannelName) -> Result<ChannelHandle> {
        match self.call("channel", json!({ "name": name })).await {
            Ok(_) => Ok(ChannelHandle { name: name.clone() }),
            Err(CallError::Rejected { message, .. }) => {
                Err(ActorError::ChannelUnavailable(format!("{name}: {message}")))
            }
            Err(transport) => Err(transport.into()),
        }
    }

    async fn add_channel(&self, name: &ChannelName) -> Result<()> {
        self.call("add_channel", json!({ "name": name })).await?;
        Ok(())
    }

    async fn load_hdu(&self, channel: &ChannelHandle, label: &str, hdu: &HduPayload) -> Result<()> {
        let params = json!({
            "channel": channel.name,
            "label": label,
            "path": hdu.path,
            "hdu": hdu.hdu,
            "header": hdu.header,
        });
        self.call("load_hdu", params).await?;
        Ok(())
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
