//! `auth login|refresh|logout|status`: thin CLI surface over OAuth flows.
//!
//! Redirect-URL handling, keyring storage, and the credential-file format
//! are out of scope; these commands validate the named provider supports
//! OAuth and report that token storage lives outside this build.

use clap::{Args, Subcommand};
use model_spec_core::Provider;

use crate::CliError;

#[derive(Args, Debug, Clone)]
pub struct AuthArgs {
    #[command(subcommand)]
    pub cmd: AuthCommand,
}

#[derive(Subcommand, Debug, Clone)]
pub enum AuthCommand {
    Login { provider: String },
    Refresh { provider: String },
    Logout { provider: String },
    Status,
}

fn parse_provider(name: &str) -> Provider {
    match name {
        "openai" | "open_ai" => Provider::OpenAi,
        "anthropic" => Provider::Anthropic,
        "openai_compatible" | "openai-compatible" => Provider::OpenAiCompatible,
        other => Provider::Other(other.to_string()),
    }
}

pub async fn run(args: AuthArgs) -> Result<(), CliError> {
    match args.cmd {
        AuthCommand::Login { provider } | AuthCommand::Refresh { provider } | AuthCommand::Logout { provider } => {
            let p = parse_provider(&provider);
            if !p.capabilities().supports_oauth {
                return Err(CliError::Usage(format!("provider {provider} does not support oauth")));
            }
            println!("cpe: oauth token storage is handled outside this build; no action taken for {provider}");
        }
        AuthCommand::Status => {
            println!("cpe: credential store is external to this build; nothing to report");
        }
    }
    Ok(())
}
