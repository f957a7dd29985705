//! Built-in tools, the tool registry, and the path-safety helper they share.

mod bash;
mod file;
mod path;
mod registry;
mod spec;
mod r#trait;

pub use bash::BashTool;
pub use file::{
    CreateDirTool, DeleteDirTool, DeleteFileTool, EditFileTool, GlobTool, ListDirTool,
    MoveDirTool, MoveFileTool, ReadFileTool, WriteFileTool,
};
pub use path::resolve_path_under;
pub use registry::{RegistryError, ToolOutcome, ToolRegistry};
pub use spec::{ToolCallContent, ToolCallContext, ToolSourceError, ToolSpec};
pub use r#trait::Tool;
