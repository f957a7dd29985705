//! Subagent lifecycle event, posted by a running subagent to the event bus.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle phase a `SubagentEvent` reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubagentEventType {
    SubagentStart,
    ToolCall,
    ToolResult,
    ThoughtTrace,
    SubagentEnd,
}

/// One structured record emitted by a running subagent.
///
/// Matches the shape in the data model: every field but `subagent_name`,
/// `subagent_run_id`, `timestamp`, and `type` is optional, since different
/// event types populate different subsets.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubagentEvent {
    pub subagent_name: String,
    pub subagent_run_id: String,
    pub timestamp: DateTime<Utc>,
    #[serde(rename = "type")]
    pub event_type: SubagentEventType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reasoning_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_usage: Option<TokenUsage>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct TokenUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

impl SubagentEvent {
    pub fn start(subagent_name: impl Into<String>, run_id: impl Into<String>) -> Self {
        Self {
            subagent_name: subagent_name.into(),
            subagent_run_id: run_id.into(),
            timestamp: Utc::now(),
            event_type: SubagentEventType::SubagentStart,
            tool_name: None,
            tool_call_id: None,
            payload: None,
            reasoning_type: None,
            token_usage: None,
        }
    }

    pub fn end(
        subagent_name: impl Into<String>,
        run_id: impl Into<String>,
        token_usage: Option<TokenUsage>,
    ) -> Self {
        Self {
            subagent_name: subagent_name.into(),
            subagent_run_id: run_id.into(),
            timestamp: Utc::now(),
            event_type: SubagentEventType::SubagentEnd,
            tool_name: None,
            tool_call_id: None,
            payload: None,
            reasoning_type: None,
            token_usage,
        }
    }

    pub fn tool_call(
        subagent_name: impl Into<String>,
        run_id: impl Into<String>,
        tool_name: impl Into<String>,
        tool_call_id: impl Into<String>,
        payload: serde_json::Value,
    ) -> Self {
        Self {
            subagent_name: subagent_name.into(),
            subagent_run_id: run_id.into(),
            timestamp: Utc::now(),
            event_type: SubagentEventType::ToolCall,
            tool_name: Some(tool_name.into()),
            tool_call_id: Some(tool_call_id.into()),
            payload: Some(payload),
            reasoning_type: None,
            token_usage: None,
        }
    }

    pub fn tool_result(
        subagent_name: impl Into<String>,
        run_id: impl Into<String>,
        tool_name: impl Into<String>,
        tool_call_id: impl Into<String>,
        payload: serde_json::Value,
    ) -> Self {
        Self {
            subagent_name: subagent_name.into(),
            subagent_run_id: run_id.into(),
            timestamp: Utc::now(),
            event_type: SubagentEventType::ToolResult,
            tool_name: Some(tool_name.into()),
            tool_call_id: Some(tool_call_id.into()),
            payload: Some(payload),
            reasoning_type: None,
            token_usage: None,
        }
    }

    /// One-line `[name/run] type ...` summary for `concise` rendering.
    pub fn to_concise_line(&self) -> String {
        let head = format!("[{}/{}]", self.subagent_name, self.subagent_run_id);
        match self.event_type {
            SubagentEventType::SubagentStart => format!("{} start", head),
            SubagentEventType::SubagentEnd => {
                let usage = self
                    .token_usage
                    .map(|u| format!(" tokens={}", u.total_tokens))
                    .unwrap_or_default();
                format!("{} end{}", head, usage)
            }
            SubagentEventType::ToolCall => format!(
                "{} tool_call {}",
                head,
                self.tool_name.as_deref().unwrap_or("?")
            ),
            SubagentEventType::ToolResult => format!(
                "{} tool_result {}",
                head,
                self.tool_name.as_deref().unwrap_or("?")
            ),
            SubagentEventType::ThoughtTrace => format!("{} thought", head),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn start_event_has_no_payload() {
        let ev = SubagentEvent::start("summarizer", "run-1");
        assert_eq!(ev.event_type, SubagentEventType::SubagentStart);
        assert!(ev.payload.is_none());
    }

    #[test]
    fn concise_line_includes_name_and_run_id() {
        let ev = SubagentEvent::start("summarizer", "run-1");
        let line = ev.to_concise_line();
        assert!(line.contains("summarizer"));
        assert!(line.contains("run-1"));
        assert!(line.contains("start"));
    }

    #[test]
    fn round_trips_through_json() {
        let ev = SubagentEvent::tool_call("s", "r1", "read", "call-1", serde_json::json!({"path": "a"}));
        let json = serde_json::to_string(&ev).unwrap();
        let back: SubagentEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(back.tool_name.as_deref(), Some("read"));
        assert_eq!(back.event_type, SubagentEventType::ToolCall);
    }
}
