//! End-to-end exercises of a full turn through the real tool registry, a
//! real (in-memory) store, and the generation loop's safety valves.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use config::GenerationDefaults;
use cpe_core::pipeline::{run_turn, GenerateError, Generator, PipelineError, MAX_TOOL_LOOP_ITERATIONS};
use cpe_core::tools::{BashTool, ToolCallContent, ToolCallContext, ToolRegistry, ToolSourceError, ToolSpec};
use store::{Block, ConversationStore, MemStore, Message};
use tokio_util::sync::CancellationToken;

struct ScriptedGenerator {
    replies: Mutex<Vec<Message>>,
}

#[async_trait]
impl Generator for ScriptedGenerator {
    async fn generate(
        &self,
        _dialog: &[Message],
        _system_prompt: &str,
        _tools: &[ToolSpec],
        _opts: &GenerationDefaults,
    ) -> Result<Message, GenerateError> {
        Ok(self.replies.lock().unwrap().remove(0))
    }
}

/// Always replies with a fresh call to a tool that never terminates the
/// loop, to exercise the runaway-loop cap.
struct LoopingGenerator {
    calls: AtomicUsize,
}

#[async_trait]
impl Generator for LoopingGenerator {
    async fn generate(
        &self,
        _dialog: &[Message],
        _system_prompt: &str,
        _tools: &[ToolSpec],
        _opts: &GenerationDefaults,
    ) -> Result<Message, GenerateError> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(Message::assistant(vec![Block::tool_call(
            format!("call-{n}"),
            "echo",
            serde_json::json!({"n": n}),
        )]))
    }
}

struct EchoTool;

#[async_trait]
impl cpe_core::tools::Tool for EchoTool {
    fn name(&self) -> &str {
        "echo"
    }
    fn spec(&self) -> ToolSpec {
        ToolSpec { name: "echo".to_string(), description: None, input_schema: serde_json::json!({}), output_schema: None }
    }
    async fn call(&self, args: serde_json::Value, _ctx: Option<&ToolCallContext>) -> Result<ToolCallContent, ToolSourceError> {
        Ok(ToolCallContent { text: args.to_string() })
    }
}

#[tokio::test]
async fn runaway_tool_loop_is_capped() {
    let store = MemStore::new();
    let generator = LoopingGenerator { calls: AtomicUsize::new(0) };
    let mut registry = ToolRegistry::new();
    registry.register(Arc::new(EchoTool)).unwrap();
    let mut printer = |_: &Message| {};

    let err = run_turn(
        &generator,
        &registry,
        Some(&store),
        "sys",
        &[],
        Message::user("go"),
        None,
        "",
        &GenerationDefaults::default(),
        None,
        None,
        None,
        &mut printer,
    )
    .await
    .unwrap_err();

    assert!(matches!(err, PipelineError::ToolLoopDepthExceeded));
    assert_eq!(generator.calls.load(Ordering::SeqCst), MAX_TOOL_LOOP_ITERATIONS as usize);
}

#[tokio::test]
async fn generation_cancellation_before_first_call_stops_the_turn() {
    let store = MemStore::new();
    let generator = ScriptedGenerator {
        replies: Mutex::new(vec![Message::assistant(vec![Block::text("should never run")])]),
    };
    let registry = ToolRegistry::new();
    let gen_cancel = CancellationToken::new();
    gen_cancel.cancel();
    let mut printer = |_: &Message| {};

    let err = run_turn(
        &generator,
        &registry,
        Some(&store),
        "sys",
        &[],
        Message::user("go"),
        None,
        "",
        &GenerationDefaults::default(),
        Some(&gen_cancel),
        None,
        None,
        &mut printer,
    )
    .await
    .unwrap_err();

    assert!(matches!(err, PipelineError::Canceled));
    // The user message was saved before the cancellation check fires on the
    // first loop iteration.
    let all = store.list_messages(store::ListOptions::default()).await.unwrap();
    assert_eq!(all.len(), 1);
    assert_eq!(all[0].role, store::Role::User);
}

#[tokio::test]
async fn save_cancellation_preserves_the_already_saved_prefix() {
    let store = MemStore::new();
    let generator = ScriptedGenerator {
        replies: Mutex::new(vec![Message::assistant(vec![Block::text("hi")])]),
    };
    let registry = ToolRegistry::new();
    let save_cancel = CancellationToken::new();
    // Cancels only once the turn is underway, so the user message saves
    // fine but the assistant reply's save is refused.
    let mut printer = |m: &Message| {
        if m.role == store::Role::User {
            save_cancel.cancel();
        }
    };

    let err = run_turn(
        &generator,
        &registry,
        Some(&store),
        "sys",
        &[],
        Message::user("go"),
        None,
        "",
        &GenerationDefaults::default(),
        None,
        Some(&save_cancel),
        None,
        &mut printer,
    )
    .await
    .unwrap_err();

    assert!(matches!(err, PipelineError::Canceled));
    let all = store.list_messages(store::ListOptions::default()).await.unwrap();
    assert_eq!(all.len(), 1);
    assert_eq!(all[0].role, store::Role::User);
}

#[tokio::test]
async fn bash_tool_runs_through_the_registry_and_the_turn_completes() {
    let dir = tempfile::tempdir().unwrap();
    let store = MemStore::new();
    let call = Block::tool_call("c1", "bash", serde_json::json!({"command": "echo hi"}));
    let generator = ScriptedGenerator {
        replies: Mutex::new(vec![
            Message::assistant(vec![call]),
            Message::assistant(vec![Block::text("done")]),
        ]),
    };
    let mut registry = ToolRegistry::new();
    registry.register(Arc::new(BashTool::new(Arc::new(dir.path().to_path_buf())))).unwrap();
    let mut printer = |_: &Message| {};

    let outcome = run_turn(
        &generator,
        &registry,
        Some(&store),
        "sys",
        &[],
        Message::user("run echo"),
        None,
        "",
        &GenerationDefaults::default(),
        None,
        None,
        None,
        &mut printer,
    )
    .await
    .unwrap();

    // user, assistant (tool call), tool_result, assistant (done)
    assert_eq!(outcome.saved.len(), 4);
    assert_eq!(outcome.saved[2].role, store::Role::ToolResult);
    assert_eq!(outcome.saved[2].blocks[0].tool_result_error, Some(false));
    assert!(outcome.saved[2].blocks[0].content.contains("hi"));
}
