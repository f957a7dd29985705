//! `cpe` binary: one-shot tool-augmented generation turn by default, or an
//! introspection subcommand (`conversation`, `model`, `mcp`, `config`, `auth`).

use clap::{Parser, Subcommand};
use cli::commands::{auth, config_cmd, conversation, mcp, model, root};
use cli::CliError;

#[derive(Parser, Debug)]
#[command(name = "cpe", about = "Tool-augmented generation loop over a forest-structured conversation store")]
struct TopArgs {
    #[command(subcommand)]
    cmd: Option<Command>,

    #[command(flatten)]
    root: root::RootArgs,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Inspect or edit the saved conversation forest.
    Conversation(conversation::ConversationArgs),
    /// Inspect models named in the config file.
    Model(model::ModelArgs),
    /// Inspect or call configured MCP servers directly.
    Mcp(mcp::McpArgs),
    /// Add or remove models from the config file.
    Config(config_cmd::ConfigArgs),
    /// Manage OAuth credentials for supported providers.
    Auth(auth::AuthArgs),
}

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        eprintln!("cpe: {err}");
        std::process::exit(err.exit_code());
    }
}

async fn run() -> Result<(), CliError> {
    config::load_and_apply("cpe", None::<&std::path::Path>).ok();
    cli::logging::init().map_err(|e| CliError::Usage(e.to_string()))?;

    let args = TopArgs::parse();
    match args.cmd {
        Some(Command::Conversation(a)) => conversation::run(a).await,
        Some(Command::Model(a)) => model::run(a).await,
        Some(Command::Mcp(a)) => mcp::run(a).await,
        Some(Command::Config(a)) => config_cmd::run(a).await,
        Some(Command::Auth(a)) => auth::run(a).await,
        None => root::run(args.root).await,
    }
}
