//! JSON-RPC 2.0 message shapes for MCP, and parsers from raw results to the
//! tool types the rest of the crate works with.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::tools::{ToolCallContent, ToolSourceError, ToolSpec};

pub const PROTOCOL_VERSION: &str = "2025-11-25";

#[derive(Debug, Serialize)]
pub struct JsonRpcRequest {
    pub jsonrpc: &'static str,
    pub id: Value,
    pub method: String,
    pub params: Value,
}

impl JsonRpcRequest {
    pub fn new(id: impl Into<Value>, method: impl Into<String>, params: Value) -> Self {
        Self {
            jsonrpc: "2.0",
            id: id.into(),
            method: method.into(),
            params,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct JsonRpcNotification {
    pub jsonrpc: &'static str,
    pub method: String,
    pub params: Value,
}

impl JsonRpcNotification {
    pub fn new(method: impl Into<String>, params: Value) -> Self {
        Self {
            jsonrpc: "2.0",
            method: method.into(),
            params,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct JsonRpcError {
    pub message: String,
    #[serde(default)]
    pub code: i64,
}

#[derive(Debug, Deserialize)]
pub struct JsonRpcResponse {
    #[serde(default)]
    pub id: Value,
    #[serde(default)]
    pub result: Option<Value>,
    #[serde(default)]
    pub error: Option<JsonRpcError>,
}

pub fn initialize_params(client_name: &str) -> Value {
    serde_json::json!({
        "protocolVersion": PROTOCOL_VERSION,
        "capabilities": { "tools": {} },
        "clientInfo": {
            "name": client_name,
            "version": env!("CARGO_PKG_VERSION"),
        }
    })
}

pub fn initialized_notification() -> JsonRpcNotification {
    JsonRpcNotification::new("notifications/initialized", serde_json::json!({}))
}

/// Parses a `tools/list` result into the registry's tool spec type.
pub fn parse_list_tools_result(result: Value) -> Result<Vec<ToolSpec>, ToolSourceError> {
    let tools = result
        .get("tools")
        .and_then(|v| v.as_array())
        .ok_or_else(|| ToolSourceError::Transport("no tools array in tools/list response".into()))?;
    let mut specs = Vec::with_capacity(tools.len());
    for t in tools {
        let name = t
            .get("name")
            .and_then(|v| v.as_str())
            .ok_or_else(|| ToolSourceError::Transport("tool entry missing name".into()))?
            .to_string();
        let description = t.get("description").and_then(|v| v.as_str()).map(String::from);
        let input_schema = t.get("inputSchema").cloned().unwrap_or(serde_json::json!({}));
        specs.push(ToolSpec {
            name,
            description,
            input_schema,
            output_schema: None,
        });
    }
    Ok(specs)
}

/// Parses a `tools/call` result into the text content the dialog stores.
pub fn parse_call_tool_result(result: Value) -> Result<ToolCallContent, ToolSourceError> {
    let is_error = result.get("isError").and_then(|v| v.as_bool()).unwrap_or(false);
    let content = result.get("content").and_then(|v| v.as_array());

    let mut text_parts = Vec::new();
    if let Some(blocks) = content {
        for block in blocks {
            if block.get("type").and_then(|v| v.as_str()) == Some("text") {
                if let Some(t) = block.get("text").and_then(|v| v.as_str()) {
                    text_parts.push(t.to_string());
                }
            }
        }
    }
    let mut text = text_parts.join("\n").trim().to_string();
    if text.is_empty() {
        if let Some(structured) = result.get("structuredContent") {
            text = serde_json::to_string(structured).unwrap_or_default();
        }
    }

    if is_error {
        return Err(ToolSourceError::Transport(if text.is_empty() {
            "tool returned an error".to_string()
        } else {
            text
        }));
    }
    Ok(ToolCallContent { text })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_tool_list_with_schema() {
        let result = serde_json::json!({
            "tools": [
                { "name": "search", "description": "web search", "inputSchema": {"type": "object"} }
            ]
        });
        let specs = parse_list_tools_result(result).unwrap();
        assert_eq!(specs.len(), 1);
        assert_eq!(specs[0].name, "search");
    }

    #[test]
    fn error_result_becomes_transport_error() {
        let result = serde_json::json!({
            "isError": true,
            "content": [{"type": "text", "text": "boom"}]
        });
        let err = parse_call_tool_result(result).unwrap_err();
        assert!(matches!(err, ToolSourceError::Transport(msg) if msg == "boom"));
    }
}
