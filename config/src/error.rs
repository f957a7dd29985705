//! Errors from config loading and resolution.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum LoadError {
    #[error("xdg config path: {0}")]
    XdgPath(String),
    #[error("read xdg config: {0}")]
    XdgRead(std::io::Error),
    #[error("parse xdg toml: {0}")]
    XdgParse(#[from] toml::de::Error),
    #[error("read .env: {0}")]
    DotenvRead(std::io::Error),
}

/// Errors surfaced while resolving an `EffectiveConfig`. Exit code 2 at the
/// CLI boundary, per the unknown-model/invalid-input class of failure.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum ResolveError {
    #[error("config file {0} is unreadable: {1}")]
    UnreadableConfig(String, std::io::Error),
    #[error("config file {0} is malformed: {1}")]
    MalformedConfig(String, String),
    #[error("unknown model reference: {0}")]
    UnknownModel(String),
    #[error("invalid timeout string: {0}")]
    InvalidTimeout(String),
    #[error(
        "model {model} names an oauth credential but provider {provider} does not support oauth"
    )]
    UnsupportedOauth { model: String, provider: String },
    #[error("schema path for subagent {subagent} is missing or malformed: {path}")]
    BadSchemaPath { subagent: String, path: String },
    #[error("unsupported tilde form: {0}")]
    UnsupportedTilde(String),
    #[error("duplicate resolved path: {0}")]
    DuplicatePath(String),
    #[error("local module path {0} has no manifest marker file")]
    MissingModuleManifest(String),
    #[error("mcp server {server} sets both enabledTools and disabledTools")]
    ConflictingToolFilters { server: String },
    #[error("empty input")]
    EmptyInput,
}
