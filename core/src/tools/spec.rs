//! Tool specification, call context, and result types shared by built-in
//! tools, MCP-backed tools, and the tool registry.

use serde_json::Value;
use store::Message;
use thiserror::Error;

/// Tool specification, aligned with MCP's `tools/list` result shape.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct ToolSpec {
    pub name: String,
    pub description: Option<String>,
    pub input_schema: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_schema: Option<Value>,
}

/// Successful result of one tool call.
#[derive(Debug, Clone)]
pub struct ToolCallContent {
    pub text: String,
}

/// Errors from calling a built-in tool, an MCP tool, or the registry.
#[derive(Debug, Error)]
pub enum ToolSourceError {
    #[error("tool not found: {0}")]
    NotFound(String),
    #[error("invalid arguments: {0}")]
    InvalidInput(String),
    #[error("transport error: {0}")]
    Transport(String),
    #[error("json-rpc error: {0}")]
    JsonRpc(String),
}

/// Per-call context passed to a tool alongside its arguments.
#[derive(Debug, Clone, Default)]
pub struct ToolCallContext {
    /// Messages in the dialog so far, most recent last.
    pub recent_messages: Vec<Message>,
    /// Working folder file tools resolve relative paths under.
    pub working_folder: Option<std::sync::Arc<std::path::PathBuf>>,
}

impl ToolCallContext {
    pub fn new(recent_messages: Vec<Message>) -> Self {
        Self {
            recent_messages,
            working_folder: None,
        }
    }

    pub fn with_working_folder(mut self, working_folder: std::sync::Arc<std::path::PathBuf>) -> Self {
        self.working_folder = Some(working_folder);
        self
    }
}
