//! Assembles the built-in tool registry for one working folder.

use std::path::PathBuf;
use std::sync::Arc;

use cpe_core::tools::{
    BashTool, CreateDirTool, DeleteDirTool, DeleteFileTool, EditFileTool, GlobTool, ListDirTool,
    MoveDirTool, MoveFileTool, ReadFileTool, ToolRegistry, WriteFileTool,
};

/// Registers every built-in file/folder tool rooted at `working_folder`,
/// plus `bash` when `allow_shell` is set. Registration can only fail on a
/// duplicate name, which cannot happen here since each built-in has a
/// distinct name.
pub fn built_in_registry(working_folder: Arc<PathBuf>, allow_shell: bool) -> ToolRegistry {
    let mut registry = ToolRegistry::new();
    registry.register(Arc::new(ReadFileTool::new(working_folder.clone()))).unwrap();
    registry.register(Arc::new(WriteFileTool::new(working_folder.clone()))).unwrap();
    registry.register(Arc::new(EditFileTool::new(working_folder.clone()))).unwrap();
    registry.register(Arc::new(DeleteFileTool::new(working_folder.clone()))).unwrap();
    registry.register(Arc::new(MoveFileTool::new(working_folder.clone()))).unwrap();
    registry.register(Arc::new(CreateDirTool::new(working_folder.clone()))).unwrap();
    registry.register(Arc::new(DeleteDirTool::new(working_folder.clone()))).unwrap();
    registry.register(Arc::new(MoveDirTool::new(working_folder.clone()))).unwrap();
    registry.register(Arc::new(ListDirTool::new(working_folder.clone()))).unwrap();
    registry.register(Arc::new(GlobTool::new(working_folder.clone()))).unwrap();
    if allow_shell {
        registry.register(Arc::new(BashTool::new(working_folder))).unwrap();
    }
    registry
}
