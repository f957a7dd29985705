//! MCP stdio transport: spawns a server process, speaks newline-delimited
//! JSON-RPC over its stdin/stdout, and completes the initialize handshake.

use std::collections::HashMap;
use std::process::Stdio as StdStdio;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::{oneshot, Mutex};
use tokio::task::JoinHandle;

use serde_json::Value;

use super::protocol::{
    initialize_params, initialized_notification, JsonRpcNotification, JsonRpcRequest,
    JsonRpcResponse,
};

#[derive(Debug, thiserror::Error)]
pub enum McpTransportError {
    #[error("failed to spawn mcp server: {0}")]
    Spawn(std::io::Error),
    #[error("io error talking to mcp server: {0}")]
    Io(std::io::Error),
    #[error("mcp server closed the connection")]
    Closed,
    #[error("timed out waiting for a response from the mcp server")]
    Timeout,
    #[error("mcp initialize failed: {0}")]
    Initialize(String),
}

type PendingMap = Arc<Mutex<HashMap<i64, oneshot::Sender<JsonRpcResponse>>>>;

/// A live connection to one MCP server over stdio.
pub struct StdioTransport {
    stdin: Mutex<tokio::process::ChildStdin>,
    pending: PendingMap,
    next_id: AtomicI64,
    timeout: Duration,
    _child: Child,
    _reader_task: JoinHandle<()>,
}

impl StdioTransport {
    /// Spawns `command args…`, wires up the reader task, and performs the
    /// MCP initialize handshake before returning. `timeout` bounds every
    /// subsequent request, including the handshake itself.
    pub async fn spawn(
        command: &str,
        args: &[String],
        env: &HashMap<String, String>,
        client_name: &str,
        timeout: Duration,
    ) -> Result<Self, McpTransportError> {
        let mut cmd = Command::new(command);
        cmd.args(args)
            .envs(env)
            .stdin(StdStdio::piped())
            .stdout(StdStdio::piped())
            .stderr(StdStdio::null());

        let mut child = cmd.spawn().map_err(McpTransportError::Spawn)?;
        let stdin = child.stdin.take().expect("piped stdin");
        let stdout = child.stdout.take().expect("piped stdout");

        let pending: PendingMap = Arc::new(Mutex::new(HashMap::new()));
        let reader_pending = Arc::clone(&pending);
        let reader_task = tokio::spawn(async move {
            let mut lines = BufReader::new(stdout).lines();
            loop {
                match lines.next_line().await {
                    Ok(Some(line)) => {
                        if line.trim().is_empty() {
                            continue;
                        }
                        let Ok(resp) = serde_json::from_str::<JsonRpcResponse>(&line) else {
                            continue;
                        };
                        if let Some(id) = resp.id.as_i64() {
                            if let Some(tx) = reader_pending.lock().await.remove(&id) {
                                let _ = tx.send(resp);
                            }
                        }
                    }
                    Ok(None) | Err(_) => break,
                }
            }
        });

        let transport = Self {
            stdin: Mutex::new(stdin),
            pending,
            next_id: AtomicI64::new(1),
            timeout,
            _child: child,
            _reader_task: reader_task,
        };

        let init_result = transport
            .request("initialize", initialize_params(client_name))
            .await
            .map_err(|e| McpTransportError::Initialize(e.to_string()))?;
        if let Some(err) = init_result.get("error") {
            return Err(McpTransportError::Initialize(err.to_string()));
        }
        transport
            .notify(initialized_notification())
            .await
            .map_err(|e| McpTransportError::Initialize(e.to_string()))?;

        Ok(transport)
    }

    pub async fn request(&self, method: &str, params: Value) -> Result<Value, McpTransportError> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let (tx, rx) = oneshot::channel();
        self.pending.lock().await.insert(id, tx);

        let req = JsonRpcRequest::new(id, method, params);
        self.write_line(&req).await?;

        let resp = tokio::time::timeout(self.timeout, rx)
            .await
            .map_err(|_| McpTransportError::Timeout)?
            .map_err(|_| McpTransportError::Closed)?;

        if let Some(err) = resp.error {
            return Err(McpTransportError::Initialize(err.message));
        }
        resp.result.ok_or(McpTransportError::Closed)
    }

    async fn notify(&self, note: JsonRpcNotification) -> Result<(), McpTransportError> {
        self.write_line(&note).await
    }

    async fn write_line<T: serde::Serialize>(&self, msg: &T) -> Result<(), McpTransportError> {
        let mut line = serde_json::to_string(msg).map_err(|e| {
            McpTransportError::Io(std::io::Error::new(std::io::ErrorKind::InvalidData, e))
        })?;
        line.push('\n');
        let mut stdin = self.stdin.lock().await;
        stdin
            .write_all(line.as_bytes())
            .await
            .map_err(McpTransportError::Io)?;
        stdin.flush().await.map_err(McpTransportError::Io)
    }
}
