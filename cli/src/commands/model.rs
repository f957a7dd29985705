//! `model list|info|system-prompt`: introspection over the models section
//! of the config file, without resolving any single model as "the" model.

use std::path::PathBuf;

use clap::{Args, Subcommand};

use crate::commands::read_config_file;
use crate::CliError;

#[derive(Args, Debug, Clone)]
pub struct ModelArgs {
    #[command(subcommand)]
    pub cmd: ModelCommand,

    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand, Debug, Clone)]
pub enum ModelCommand {
    /// List every model reference the config file names.
    List,
    /// Show one model's resolved provider, id, and limits.
    Info { r#ref: String },
    /// Print the system prompt file configured for one model, if any.
    SystemPrompt { r#ref: String },
}

pub async fn run(args: ModelArgs) -> Result<(), CliError> {
    let (content, path) = read_config_file(args.config.as_deref())?;
    let file = config::parse_file(&content)
        .map_err(|e| config::ResolveError::MalformedConfig(path.display().to_string(), e))?;

    match args.cmd {
        ModelCommand::List => {
            let mut names: Vec<&String> = file.models.keys().collect();
            names.sort();
            for name in names {
                println!("{name}");
            }
        }
        ModelCommand::Info { r#ref } => {
            let entry = file
                .models
                .get(&r#ref)
                .ok_or_else(|| CliError::Resolve(config::ResolveError::UnknownModel(r#ref.clone())))?;
            println!("reference: {}", r#ref);
            println!("provider: {:?}", entry.provider);
            println!("model_id: {}", entry.model_id);
            println!("context_limit: {}", entry.context_limit);
            println!("output_limit: {}", entry.output_limit);
            if let Some(base_url) = &entry.base_url {
                println!("base_url: {base_url}");
            }
        }
        ModelCommand::SystemPrompt { r#ref } => {
            let entry = file
                .models
                .get(&r#ref)
                .ok_or_else(|| CliError::Resolve(config::ResolveError::UnknownModel(r#ref.clone())))?;
            match &entry.system_prompt_path {
                Some(p) => println!("{}", std::fs::read_to_string(p)?),
                None => println!("(no system prompt configured for {})", r#ref),
            }
        }
    }
    Ok(())
}
