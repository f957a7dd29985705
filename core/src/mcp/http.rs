//! MCP Streamable HTTP transport: each JSON-RPC call is one POST to the
//! server's endpoint. Session continuation via `Mcp-Session-Id` is carried
//! if the server sets it, but SSE streaming responses are not implemented —
//! only the single-JSON-object response shape is read.

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use reqwest::Client;
use serde_json::Value;

use super::protocol::{initialize_params, initialized_notification, JsonRpcRequest, JsonRpcResponse};

#[derive(Debug, thiserror::Error)]
pub enum McpTransportError {
    #[error("http request to mcp server failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("malformed response from mcp server: {0}")]
    Decode(String),
    #[error("mcp server returned an error: {0}")]
    Remote(String),
    #[error("mcp initialize failed: {0}")]
    Initialize(String),
}

pub struct HttpTransport {
    client: Client,
    url: String,
    next_id: AtomicI64,
    session_id: Mutex<Option<String>>,
}

impl HttpTransport {
    pub async fn connect(
        url: &str,
        client_name: &str,
        timeout: Duration,
    ) -> Result<Self, McpTransportError> {
        let client = Client::builder().timeout(timeout).build()?;
        let transport = Self {
            client,
            url: url.to_string(),
            next_id: AtomicI64::new(1),
            session_id: Mutex::new(None),
        };
        let init_result = transport
            .request("initialize", initialize_params(client_name))
            .await
            .map_err(|e| McpTransportError::Initialize(e.to_string()))?;
        if let Some(err) = init_result.get("error") {
            return Err(McpTransportError::Initialize(err.to_string()));
        }
        transport
            .post_notification(initialized_notification())
            .await
            .map_err(|e| McpTransportError::Initialize(e.to_string()))?;
        Ok(transport)
    }

    pub async fn request(&self, method: &str, params: Value) -> Result<Value, McpTransportError> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let req = JsonRpcRequest::new(id, method, params);

        let mut builder = self
            .client
            .post(&self.url)
            .header("Content-Type", "application/json")
            .header("Accept", "application/json, text/event-stream");
        if let Some(sid) = self.session_id.lock().unwrap().clone() {
            builder = builder.header("Mcp-Session-Id", sid);
        }

        let resp = builder.json(&req).send().await?;
        if let Some(sid) = resp.headers().get("Mcp-Session-Id") {
            if let Ok(sid) = sid.to_str() {
                *self.session_id.lock().unwrap() = Some(sid.to_string());
            }
        }
        let body: JsonRpcResponse = resp
            .json()
            .await
            .map_err(|e| McpTransportError::Decode(e.to_string()))?;

        if let Some(err) = body.error {
            return Err(McpTransportError::Remote(err.message));
        }
        body.result
            .ok_or_else(|| McpTransportError::Decode("missing result".to_string()))
    }

    async fn post_notification(
        &self,
        note: super::protocol::JsonRpcNotification,
    ) -> Result<(), McpTransportError> {
        let mut builder = self
            .client
            .post(&self.url)
            .header("Content-Type", "application/json");
        if let Some(sid) = self.session_id.lock().unwrap().clone() {
            builder = builder.header("Mcp-Session-Id", sid);
        }
        builder.json(&note).send().await?;
        Ok(())
    }
}
