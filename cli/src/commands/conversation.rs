//! `conversation list|print|delete`: operates directly on the conversation
//! store, independent of any model resolution.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use clap::{Args, Subcommand};
use store::{ConversationStore, ListOptions, Message, SqliteStore};

use crate::commands::{read_config_file, storage_path};
use crate::CliError;

#[derive(Args, Debug, Clone)]
pub struct ConversationArgs {
    #[command(subcommand)]
    pub cmd: ConversationCommand,

    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand, Debug, Clone)]
pub enum ConversationCommand {
    /// List every top-level conversation, newest root first.
    List,
    /// Print the full dialog ending at the given message id.
    Print { id: String },
    /// Delete a message; refuses if it has children unless --cascade is given.
    Delete {
        id: String,
        #[arg(long)]
        cascade: bool,
    },
}

fn snippet(text: &str, max: usize) -> String {
    let mut s: String = text.chars().take(max).collect();
    if text.chars().count() > max {
        s.push_str("...");
    }
    s
}

fn print_line(m: &Message) {
    let ts = m.created_at.format("%Y-%m-%d %H:%M");
    let text = m.text_content();
    let id = m.id.map(|i| i.0).unwrap_or(0);
    println!("{id} ({ts}) [{:?}] {}", m.role, snippet(&text, 50));
}

/// The latest timestamp anywhere in `id`'s subtree (including `id` itself),
/// memoized since siblings' subtrees overlap in nothing but are each walked
/// once per ancestor during sorting.
fn max_descendant_ts(
    id: i64,
    own_ts: DateTime<Utc>,
    by_parent: &HashMap<i64, Vec<&Message>>,
    cache: &mut HashMap<i64, DateTime<Utc>>,
) -> DateTime<Utc> {
    if let Some(cached) = cache.get(&id) {
        return *cached;
    }
    let mut latest = own_ts;
    if let Some(children) = by_parent.get(&id) {
        for child in children {
            let Some(child_id) = child.id else { continue };
            let child_latest = max_descendant_ts(child_id.0, child.created_at, by_parent, cache);
            if child_latest > latest {
                latest = child_latest;
            }
        }
    }
    cache.insert(id, latest);
    latest
}

fn print_subtree(node: &Message, by_parent: &HashMap<i64, Vec<&Message>>) {
    let Some(id) = node.id else { return };
    if let Some(children) = by_parent.get(&id.0) {
        for child in children {
            print_line(child);
            print_subtree(child, by_parent);
        }
    }
}

pub async fn run(args: ConversationArgs) -> Result<(), CliError> {
    let (content, path) = read_config_file(args.config.as_deref())?;
    let file = config::parse_file(&content)
        .map_err(|e| config::ResolveError::MalformedConfig(path.display().to_string(), e))?;
    let dir = path.parent().map(Path::to_path_buf).unwrap_or_else(|| PathBuf::from("."));
    let db_path = storage_path(&file, &dir)?;
    let store = SqliteStore::new(&db_path)?;

    match args.cmd {
        ConversationCommand::List => {
            let messages = store.list_messages(ListOptions::default()).await?;

            let mut roots: Vec<&Message> = messages.iter().filter(|m| m.parent_id.is_none()).collect();
            roots.sort_by(|a, b| b.created_at.cmp(&a.created_at));

            let mut by_parent: HashMap<i64, Vec<&Message>> = HashMap::new();
            for m in &messages {
                if let Some(pid) = m.parent_id {
                    by_parent.entry(pid.0).or_default().push(m);
                }
            }
            let mut ts_cache: HashMap<i64, DateTime<Utc>> = HashMap::new();
            for m in &messages {
                let id = m.id.map(|i| i.0).unwrap_or(0);
                max_descendant_ts(id, m.created_at, &by_parent, &mut ts_cache);
            }
            for children in by_parent.values_mut() {
                children.sort_by_key(|m| {
                    let id = m.id.map(|i| i.0).unwrap_or(0);
                    ts_cache[&id]
                });
            }

            for root in roots {
                print_line(root);
                print_subtree(root, &by_parent);
            }
        }
        ConversationCommand::Print { id } => {
            let id = id.parse().map_err(|_| CliError::Usage(format!("invalid message id: {id}")))?;
            let dialog = store.get_dialog_for_message(id).await?;
            for m in &dialog {
                println!("--- {:?} ---", m.role);
                println!("{}", m.text_content());
            }
        }
        ConversationCommand::Delete { id, cascade } => {
            let id = id.parse().map_err(|_| CliError::Usage(format!("invalid message id: {id}")))?;
            if cascade {
                store.delete_message_recursive(id).await?;
            } else {
                store.delete_message(id).await?;
            }
        }
    }
    Ok(())
}
