//! Top-level CLI error: wraps every library error with `#[from]` and maps
//! each to one of the three documented exit codes.

#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error(transparent)]
    Load(#[from] config::LoadError),
    #[error(transparent)]
    Resolve(#[from] config::ResolveError),
    #[error(transparent)]
    Store(#[from] store::StoreError),
    #[error(transparent)]
    Pipeline(#[from] cpe_core::pipeline::PipelineError),
    #[error(transparent)]
    Generate(#[from] cpe_core::pipeline::GenerateError),
    #[error(transparent)]
    Mcp(#[from] cpe_core::mcp::McpError),
    #[error(transparent)]
    EventBus(#[from] eventbus::EventBusError),
    #[error(transparent)]
    Registry(#[from] cpe_core::tools::RegistryError),
    #[error("{0}")]
    Usage(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl CliError {
    /// `2` for configuration/validation errors, `1` for anything else.
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::Load(_) | CliError::Resolve(_) | CliError::Usage(_) => 2,
            _ => 1,
        }
    }
}
