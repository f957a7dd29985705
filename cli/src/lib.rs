//! Command implementations, config/error plumbing, and logging setup for
//! the `cpe` binary. Kept as a library so integration tests can drive the
//! commands directly.

pub mod commands;
mod error;
pub mod logging;
mod mcp_config;
mod provider;
mod subagents;
mod tool_setup;

pub use error::CliError;
pub use mcp_config::to_core_config;
pub use provider::build_generator;
pub use subagents::register_subagents;
pub use tool_setup::built_in_registry;
