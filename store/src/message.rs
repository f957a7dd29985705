//! Message / Block / Dialog data model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque, store-assigned message id. Ordering by id approximates ordering
/// by creation time since ids are assigned monotonically by the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct MessageId(pub i64);

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for MessageId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse::<i64>().map(MessageId)
    }
}

/// Role of the message within a dialog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Assistant,
    ToolResult,
}

/// Type of fragment a `Block` carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockType {
    Content,
    ToolCall,
    Thinking,
}

/// Modality of a block's content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Modality {
    Text,
    Image,
    Audio,
    Video,
}

/// A typed fragment of a message.
///
/// For `block_type == ToolCall`, `content` is the JSON-encoded
/// `{"name": ..., "parameters": ...}` payload and `id` is the tool-call
/// correlation id that the matching `tool_result` block must repeat.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Block {
    pub block_type: BlockType,
    pub modality: Modality,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_result_error: Option<bool>,
}

impl Block {
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            block_type: BlockType::Content,
            modality: Modality::Text,
            mime_type: None,
            id: None,
            content: content.into(),
            tool_result_error: None,
        }
    }

    pub fn thinking(content: impl Into<String>) -> Self {
        Self {
            block_type: BlockType::Thinking,
            modality: Modality::Text,
            mime_type: None,
            id: None,
            content: content.into(),
            tool_result_error: None,
        }
    }

    pub fn tool_call(id: impl Into<String>, name: &str, parameters: serde_json::Value) -> Self {
        let payload = serde_json::json!({ "name": name, "parameters": parameters });
        Self {
            block_type: BlockType::ToolCall,
            modality: Modality::Text,
            mime_type: None,
            id: Some(id.into()),
            content: payload.to_string(),
            tool_result_error: None,
        }
    }

    pub fn tool_result(id: impl Into<String>, content: impl Into<String>, is_error: bool) -> Self {
        Self {
            block_type: BlockType::Content,
            modality: Modality::Text,
            mime_type: None,
            id: Some(id.into()),
            content: content.into(),
            tool_result_error: Some(is_error),
        }
    }

    /// Parses a `tool_call` block's content back into `(name, parameters)`.
    pub fn parse_tool_call(&self) -> Option<(String, serde_json::Value)> {
        if self.block_type != BlockType::ToolCall {
            return None;
        }
        let value: serde_json::Value = serde_json::from_str(&self.content).ok()?;
        let name = value.get("name")?.as_str()?.to_string();
        let parameters = value.get("parameters").cloned().unwrap_or(serde_json::Value::Null);
        Some((name, parameters))
    }
}

/// The atomic persisted unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: Option<MessageId>,
    pub parent_id: Option<MessageId>,
    pub role: Role,
    pub blocks: Vec<Block>,
    pub created_at: DateTime<Utc>,
    /// `"subagent:<name>:<run_id>"` for subagent-produced messages; empty
    /// string for the primary dialog.
    pub label: String,
}

impl Message {
    pub fn new(role: Role, blocks: Vec<Block>) -> Self {
        Self {
            id: None,
            parent_id: None,
            role,
            blocks,
            created_at: Utc::now(),
            label: String::new(),
        }
    }

    pub fn user(text: impl Into<String>) -> Self {
        Self::new(Role::User, vec![Block::text(text)])
    }

    pub fn assistant(blocks: Vec<Block>) -> Self {
        Self::new(Role::Assistant, blocks)
    }

    pub fn tool_result(blocks: Vec<Block>) -> Self {
        Self::new(Role::ToolResult, blocks)
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    pub fn with_parent(mut self, parent_id: MessageId) -> Self {
        self.parent_id = Some(parent_id);
        self
    }

    /// All `tool_call` blocks in textual order.
    pub fn tool_calls(&self) -> Vec<&Block> {
        self.blocks.iter().filter(|b| b.block_type == BlockType::ToolCall).collect()
    }

    /// Concatenated text of all `content`/text blocks, for display/streaming.
    pub fn text_content(&self) -> String {
        self.blocks
            .iter()
            .filter(|b| b.block_type == BlockType::Content && b.modality == Modality::Text)
            .map(|b| b.content.as_str())
            .collect::<Vec<_>>()
            .join("")
    }
}

/// A time-ordered sequence of messages, root to leaf.
pub type Dialog = Vec<Message>;

/// `subagent:<name>:<run_id>` label for a sub-dialog.
pub fn subagent_label(name: &str, run_id: &str) -> String {
    format!("subagent:{}:{}", name, run_id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tool_call_round_trips_name_and_parameters() {
        let block = Block::tool_call("call-1", "read", serde_json::json!({"path": "a.rs"}));
        let (name, params) = block.parse_tool_call().unwrap();
        assert_eq!(name, "read");
        assert_eq!(params["path"], "a.rs");
    }

    #[test]
    fn text_content_joins_only_content_text_blocks() {
        let msg = Message::assistant(vec![
            Block::thinking("pondering"),
            Block::text("hello "),
            Block::tool_call("c1", "read", serde_json::json!({})),
            Block::text("world"),
        ]);
        assert_eq!(msg.text_content(), "hello world");
    }

    #[test]
    fn subagent_label_format() {
        assert_eq!(subagent_label("summarizer", "run-1"), "subagent:summarizer:run-1");
    }
}
