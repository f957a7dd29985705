//! `cpe [prompt]`: resolves config, assembles the tool registry (built-ins,
//! MCP servers, subagents), and runs one generation turn.

use std::io::{IsTerminal, Read};
use std::sync::Arc;

use clap::Args;
use cpe_core::mcp::McpTransportManager;
use cpe_core::pipeline::run_turn;
use eventbus::{EventBusClient, EventBusServer, EventRenderer, RenderMode};
use store::{auto_continue_parent, ConversationStore, Message, MessageId, Role, SqliteStore};
use tokio_util::sync::CancellationToken;

use crate::commands::{load_effective_config, read_config_file, GenArgs};
use crate::{build_generator, built_in_registry, register_subagents, to_core_config, CliError};

#[derive(Args, Debug, Clone)]
pub struct RootArgs {
    #[command(flatten)]
    pub gen: GenArgs,

    /// Prompt text; words are joined with spaces and combined with any
    /// piped stdin.
    #[arg(trailing_var_arg = true)]
    pub prompt: Vec<String>,

    /// Continue an existing dialog from this message id instead of
    /// auto-continuing from the most recent assistant/tool-result message.
    #[arg(long = "continue", value_name = "ID")]
    pub continue_id: Option<String>,

    /// Start a fresh conversation, ignoring any prior history.
    #[arg(long)]
    pub new: bool,
}

fn build_user_text(prompt: &[String]) -> Result<String, CliError> {
    let mut text = prompt.join(" ");
    if !std::io::stdin().is_terminal() {
        let mut piped = String::new();
        std::io::stdin().read_to_string(&mut piped)?;
        let piped = piped.trim_end();
        if !piped.is_empty() {
            if !text.is_empty() {
                text.push('\n');
            }
            text.push_str(piped);
        }
    }
    Ok(text)
}

pub async fn run(args: RootArgs) -> Result<(), CliError> {
    let effective = load_effective_config(&args.gen)?;
    let text = build_user_text(&args.prompt)?;
    if text.trim().is_empty() {
        return Err(CliError::Resolve(config::ResolveError::EmptyInput));
    }

    let store: Option<Arc<dyn ConversationStore>> = if effective.incognito {
        None
    } else {
        Some(Arc::new(SqliteStore::new(&effective.conversation_storage_path)?))
    };

    let parent_id: Option<MessageId> = if let Some(id) = &args.continue_id {
        Some(id.parse().map_err(|_| CliError::Usage(format!("invalid --continue id: {id}")))?)
    } else if args.new {
        None
    } else if let Some(store) = &store {
        auto_continue_parent(store.as_ref()).await?
    } else {
        None
    };

    let history = match (&store, parent_id) {
        (Some(store), Some(id)) => store.get_dialog_for_message(id).await?,
        _ => Vec::new(),
    };

    let system_prompt = match &effective.system_prompt_path {
        Some(p) => std::fs::read_to_string(p)?,
        None => String::new(),
    };

    let working_folder = Arc::new(std::env::current_dir()?);
    let mut registry = built_in_registry(working_folder.clone(), args.gen.allow_shell);

    let renderer = Arc::new(EventRenderer::stderr(RenderMode::Concise));
    let bus_server = EventBusServer::start(renderer).await?;
    let event_bus = EventBusClient::new(bus_server.url());

    let mcp_manager = if effective.mcp_servers.is_empty() {
        None
    } else {
        let configs = to_core_config(&effective.mcp_servers);
        let manager = McpTransportManager::connect_all(&configs, "cpe").await?;
        manager.register_into(&mut registry).await?;
        Some(manager)
    };

    let (raw_content, config_path) = read_config_file(args.gen.config.as_deref())?;
    let parsed = config::parse_file(&raw_content)
        .map_err(|e| config::ResolveError::MalformedConfig(config_path.display().to_string(), e))?;
    register_subagents(
        &mut registry,
        &parsed,
        working_folder.clone(),
        store.clone(),
        Some(event_bus.clone()),
        args.gen.allow_shell,
    )?;

    let generator = build_generator(&effective.model, &effective.credential)?;

    let gen_cancel = CancellationToken::new();
    let save_cancel = CancellationToken::new();
    {
        let gen_cancel = gen_cancel.clone();
        let save_cancel = save_cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_err() {
                return;
            }
            gen_cancel.cancel();
            eprintln!("cpe: canceling generation; press Ctrl-C again to also stop saving");
            if tokio::signal::ctrl_c().await.is_err() {
                return;
            }
            save_cancel.cancel();
        });
    }

    let user_message = Message::user(text);
    let mut printer = |msg: &Message| {
        if msg.role == Role::Assistant {
            let content = msg.text_content();
            if !content.is_empty() {
                println!("{content}");
            }
        }
        if let Some(id) = msg.id {
            eprintln!("[{:?} {}]", msg.role, id);
        }
    };

    let outcome = run_turn(
        generator.as_ref(),
        &registry,
        store.as_deref(),
        &system_prompt,
        &history,
        user_message,
        parent_id,
        "",
        &effective.generation_defaults,
        Some(&gen_cancel),
        Some(&save_cancel),
        None,
        &mut printer,
    )
    .await;

    drop(mcp_manager);
    bus_server.shutdown().await;

    outcome?;
    Ok(())
}
