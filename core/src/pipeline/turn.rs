//! The tool-loop / saving / printing middleware chain for one user turn.

use eventbus::EventBusClient;
use serde_json::Value;
use store::{Block, BlockType, ConversationStore, Message, MessageId, Role};
use stream_event::SubagentEvent;
use tokio_util::sync::CancellationToken;

use config::GenerationDefaults;

use crate::tools::ToolRegistry;

use super::generator::{GenerateError, Generator};
use super::MAX_TOOL_LOOP_ITERATIONS;

/// Where per-tool-dispatch events get posted during a turn's loop. Only
/// present for a subagent's own turn — the root turn has no subagent
/// identity to report events under.
pub struct EventContext<'a> {
    pub bus: &'a EventBusClient,
    pub subagent_name: &'a str,
    pub run_id: &'a str,
}

#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error(transparent)]
    Generate(#[from] GenerateError),
    #[error(transparent)]
    Store(#[from] store::StoreError),
    #[error("tool loop exceeded {MAX_TOOL_LOOP_ITERATIONS} iterations without resolving")]
    ToolLoopDepthExceeded,
    #[error("generation canceled")]
    Canceled,
}

/// What one turn ended with.
pub struct PipelineOutcome {
    /// Every message saved this turn, in save order, starting with the
    /// user message.
    pub saved: Vec<Message>,
    /// Set when the loop ended because the terminator tool was called
    /// (subagent structured output): `(tool_name, parameters)`.
    pub terminator_call: Option<(String, Value)>,
}

/// Called with each message as it is produced, for streaming text to
/// stdout and ids to stderr; this crate leaves the actual I/O to the
/// caller (the CLI).
pub type Printer<'a> = dyn FnMut(&Message) + Send + 'a;

/// Runs one user turn to completion (or until cancellation / the safety
/// cap / a terminator tool call).
///
/// `history` is the already-saved context (root to leaf, not including
/// `user_message`); `store` is `None` for an incognito turn, in which case
/// nothing is persisted and returned ids stay `None`.
#[allow(clippy::too_many_arguments)]
pub async fn run_turn(
    generator: &dyn Generator,
    registry: &ToolRegistry,
    store: Option<&dyn ConversationStore>,
    system_prompt: &str,
    history: &[Message],
    user_message: Message,
    parent_id: Option<MessageId>,
    label: &str,
    opts: &GenerationDefaults,
    gen_cancel: Option<&CancellationToken>,
    save_cancel: Option<&CancellationToken>,
    events: Option<&EventContext<'_>>,
    printer: &mut Printer<'_>,
) -> Result<PipelineOutcome, PipelineError> {
    let mut dialog: Vec<Message> = history.to_vec();
    let mut saved = Vec::new();
    let mut last_parent = parent_id;

    // Failure to save the user message fails the turn outright; failure to
    // save anything after it is a warning, not an abort, so the chain keeps
    // growing from the last message that did save.
    let user_message =
        save_first(store, user_message, &mut last_parent, label, save_cancel, printer).await?;
    dialog.push(user_message.clone());
    saved.push(user_message);

    for _ in 0..MAX_TOOL_LOOP_ITERATIONS {
        if gen_cancel.is_some_and(CancellationToken::is_cancelled) {
            return Err(PipelineError::Canceled);
        }

        let tool_specs = registry.specs();
        let assistant_message = generator
            .generate(&dialog, system_prompt, &tool_specs, opts)
            .await?;
        let assistant_message =
            save_rest(store, assistant_message, &mut last_parent, label, save_cancel, printer)
                .await?;
        dialog.push(assistant_message.clone());
        saved.push(assistant_message.clone());

        if let Some(ctx) = events {
            for block in assistant_message.blocks.iter().filter(|b| b.block_type == BlockType::Thinking) {
                let mut event = SubagentEvent::start(ctx.subagent_name, ctx.run_id);
                event.event_type = stream_event::SubagentEventType::ThoughtTrace;
                event.payload = Some(Value::String(block.content.clone()));
                let _ = ctx.bus.post(&event).await;
            }
        }

        let tool_calls = assistant_message.tool_calls();
        if tool_calls.is_empty() {
            return Ok(PipelineOutcome { saved, terminator_call: None });
        }

        let mut results = Vec::with_capacity(tool_calls.len());
        let mut terminator: Option<(String, Value)> = None;
        for call in tool_calls {
            let Some((name, params)) = call.parse_tool_call() else {
                continue;
            };
            if registry.is_terminator(&name) {
                terminator = Some((name, params));
                break;
            }
            let call_id = call.id.clone().unwrap_or_default();
            if let Some(ctx) = events {
                let event = SubagentEvent::tool_call(ctx.subagent_name, ctx.run_id, &name, &call_id, params.clone());
                let _ = ctx.bus.post(&event).await;
            }
            let outcome = registry.call(&name, params, None).await;
            if let Some(ctx) = events {
                let payload = serde_json::json!({ "content": outcome.content, "is_error": outcome.is_error });
                let event = SubagentEvent::tool_result(ctx.subagent_name, ctx.run_id, &name, &call_id, payload);
                let _ = ctx.bus.post(&event).await;
            }
            results.push(Block::tool_result(call_id, outcome.content, outcome.is_error));
        }

        if let Some(call) = terminator {
            return Ok(PipelineOutcome { saved, terminator_call: Some(call) });
        }

        let tool_result_message = Message::tool_result(results);
        let tool_result_message = save_rest(
            store,
            tool_result_message,
            &mut last_parent,
            label,
            save_cancel,
            printer,
        )
        .await?;
        dialog.push(tool_result_message.clone());
        saved.push(tool_result_message);
    }

    Err(PipelineError::ToolLoopDepthExceeded)
}

/// Saves the user message that opens the turn. A storage failure here
/// fails the whole turn: there is nothing downstream to chain from yet.
async fn save_first(
    store: Option<&dyn ConversationStore>,
    message: Message,
    last_parent: &mut Option<MessageId>,
    label: &str,
    save_cancel: Option<&CancellationToken>,
    printer: &mut Printer<'_>,
) -> Result<Message, PipelineError> {
    let Some(store) = store else {
        printer(&message);
        return Ok(message);
    };
    if save_cancel.is_some_and(CancellationToken::is_cancelled) {
        return Err(PipelineError::Canceled);
    }
    let saved = store.save_message(message, *last_parent, label).await?;
    *last_parent = saved.id;
    printer(&saved);
    Ok(saved)
}

/// Saves an assistant or tool_result message produced after the turn is
/// already underway. Unlike [`save_first`], a storage failure here does
/// not abort the turn: the message is dropped (it never got an id) and the
/// chain keeps growing from the last message that did save successfully.
async fn save_rest(
    store: Option<&dyn ConversationStore>,
    message: Message,
    last_parent: &mut Option<MessageId>,
    label: &str,
    save_cancel: Option<&CancellationToken>,
    printer: &mut Printer<'_>,
) -> Result<Message, PipelineError> {
    let Some(store) = store else {
        printer(&message);
        return Ok(message);
    };
    if save_cancel.is_some_and(CancellationToken::is_cancelled) {
        return Err(PipelineError::Canceled);
    }
    match store.save_message(message.clone(), *last_parent, label).await {
        Ok(saved) => {
            *last_parent = saved.id;
            printer(&saved);
            Ok(saved)
        }
        Err(err) => {
            tracing::warn!(error = %err, "failed to save message, chain continues from last saved parent");
            printer(&message);
            Ok(message)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use store::MemStore;

    struct ScriptedGenerator {
        replies: std::sync::Mutex<Vec<Message>>,
    }

    #[async_trait]
    impl Generator for ScriptedGenerator {
        async fn generate(
            &self,
            _dialog: &[Message],
            _system_prompt: &str,
            _tools: &[crate::tools::ToolSpec],
            _opts: &GenerationDefaults,
        ) -> Result<Message, GenerateError> {
            Ok(self.replies.lock().unwrap().remove(0))
        }
    }

    #[tokio::test]
    async fn turn_without_tool_calls_produces_user_and_assistant() {
        let store = MemStore::new();
        let generator = ScriptedGenerator {
            replies: std::sync::Mutex::new(vec![Message::assistant(vec![Block::text("hi")])]),
        };
        let registry = ToolRegistry::new();
        let mut lines = Vec::new();
        let mut printer = |m: &Message| lines.push(m.role);

        let outcome = run_turn(
            &generator,
            &registry,
            Some(&store),
            "be helpful",
            &[],
            Message::user("hello"),
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

        assert_eq!(outcome.saved.len(), 2);
        assert!(outcome.terminator_call.is_none());
        assert!(outcome.saved[1].id.is_some());
    }

    #[tokio::test]
    async fn terminator_tool_call_stops_the_loop_and_is_surfaced() {
        let store = MemStore::new();
        let call = Block::tool_call("call-1", "final_answer", serde_json::json!({"score": 42}));
        let generator = ScriptedGenerator {
            replies: std::sync::Mutex::new(vec![Message::assistant(vec![call])]),
        };
        let mut registry = ToolRegistry::new();
        registry
            .register_terminator(crate::tools::ToolSpec {
                name: "final_answer".to_string(),
                description: None,
                input_schema: serde_json::json!({}),
                output_schema: None,
            })
            .unwrap();
        let mut printer = |_: &Message| {};

        let outcome = run_turn(
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
        .unwrap();

        let (name, params) = outcome.terminator_call.unwrap();
        assert_eq!(name, "final_answer");
        assert_eq!(params["score"], 42);
        // Only the user message and the assistant message with the
        // terminator call were saved; no tool_result was appended.
        assert_eq!(outcome.saved.len(), 2);
    }

    #[tokio::test]
    async fn unknown_tool_call_synthesizes_an_error_result_and_continues() {
        let store = MemStore::new();
        let call = Block::tool_call("call-1", "does_not_exist", serde_json::json!({}));
        let generator = ScriptedGenerator {
            replies: std::sync::Mutex::new(vec![
                Message::assistant(vec![call]),
                Message::assistant(vec![Block::text("done")]),
            ]),
        };
        let registry = ToolRegistry::new();
        let mut printer = |_: &Message| {};

        let outcome = run_turn(
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
        .unwrap();

        // user, assistant (tool call), tool_result (is_error), assistant (done)
        assert_eq!(outcome.saved.len(), 4);
        assert_eq!(outcome.saved[2].role, Role::ToolResult);
        assert_eq!(outcome.saved[2].blocks[0].tool_result_error, Some(true));
    }
}
