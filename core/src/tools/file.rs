//! Built-in file and folder tools: view, create, edit, delete, move, and
//! list/glob under the working folder. Every path parameter is resolved
//! through [`resolve_path_under`] so a tool call can never touch anything
//! outside it.

use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use glob::Pattern;
use serde_json::{json, Value};
use walkdir::WalkDir;

use super::path::resolve_path_under;
use super::spec::{ToolCallContent, ToolCallContext, ToolSourceError, ToolSpec};
use super::r#trait::Tool;

const DEFAULT_READ_LIMIT: usize = 2000;
const MAX_LINE_LENGTH: usize = 2000;
const LS_LIMIT: usize = 200;

const IGNORE_DIRS: &[&str] = &[
    "node_modules", "__pycache__", ".git", "dist", "build", "target", "vendor", ".venv",
];

fn str_arg<'a>(args: &'a Value, key: &str) -> Result<&'a str, ToolSourceError> {
    args.get(key)
        .and_then(|v| v.as_str())
        .ok_or_else(|| ToolSourceError::InvalidInput(format!("missing {key}")))
}

/// Reads text content of a file under the working folder.
pub struct ReadFileTool {
    working_folder: Arc<std::path::PathBuf>,
}

impl ReadFileTool {
    pub fn new(working_folder: Arc<std::path::PathBuf>) -> Self {
        Self { working_folder }
    }
}

#[async_trait]
impl Tool for ReadFileTool {
    fn name(&self) -> &str {
        "view_file"
    }

    fn spec(&self) -> ToolSpec {
        ToolSpec {
            name: "view_file".to_string(),
            description: Some(
                "Read a file's text content. Path is relative to the working folder. \
                 Optional 0-based offset and limit (default 2000 lines)."
                    .to_string(),
            ),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "path": { "type": "string" },
                    "offset": { "type": "integer", "minimum": 0 },
                    "limit": { "type": "integer", "minimum": 1, "default": 2000 }
                },
                "required": ["path"]
            }),
            output_schema: None,
        }
    }

    async fn call(
        &self,
        args: Value,
        _ctx: Option<&ToolCallContext>,
    ) -> Result<ToolCallContent, ToolSourceError> {
        let path = resolve_path_under(&self.working_folder, str_arg(&args, "path")?)?;
        if !path.exists() {
            return Err(ToolSourceError::InvalidInput(format!(
                "file not found: {}",
                path.display()
            )));
        }
        if path.is_dir() {
            return Err(ToolSourceError::InvalidInput(format!(
                "is a directory, not a file: {}",
                path.display()
            )));
        }
        let content = std::fs::read_to_string(&path)
            .map_err(|e| ToolSourceError::Transport(format!("failed to read file: {e}")))?;

        let offset = args.get("offset").and_then(|v| v.as_u64()).unwrap_or(0) as usize;
        let limit = args
            .get("limit")
            .and_then(|v| v.as_u64())
            .map(|n| n as usize)
            .unwrap_or(DEFAULT_READ_LIMIT);

        let lines: Vec<&str> = content.split('\n').collect();
        let total = lines.len();
        let start = offset.min(total);
        let end = (start + limit).min(total);

        let mut out = String::new();
        for (i, line) in lines[start..end].iter().enumerate() {
            let line_num = start + i + 1;
            let truncated = if line.len() > MAX_LINE_LENGTH {
                format!("{}...", &line[..MAX_LINE_LENGTH])
            } else {
                (*line).to_string()
            };
            out.push_str(&format!("  {line_num}\t{truncated}\n"));
        }
        Ok(ToolCallContent { text: out })
    }
}

/// Creates a new file with given content; fails if the file already exists.
pub struct WriteFileTool {
    working_folder: Arc<std::path::PathBuf>,
}

impl WriteFileTool {
    pub fn new(working_folder: Arc<std::path::PathBuf>) -> Self {
        Self { working_folder }
    }
}

#[async_trait]
impl Tool for WriteFileTool {
    fn name(&self) -> &str {
        "create_file"
    }

    fn spec(&self) -> ToolSpec {
        ToolSpec {
            name: "create_file".to_string(),
            description: Some(
                "Create a new file with text content, creating parent directories as needed. \
                 Fails if the file already exists."
                    .to_string(),
            ),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "path": { "type": "string" },
                    "content": { "type": "string" }
                },
                "required": ["path", "content"]
            }),
            output_schema: None,
        }
    }

    async fn call(
        &self,
        args: Value,
        _ctx: Option<&ToolCallContext>,
    ) -> Result<ToolCallContent, ToolSourceError> {
        let path = resolve_path_under(&self.working_folder, str_arg(&args, "path")?)?;
        let content = str_arg(&args, "content")?;
        if path.exists() {
            return Err(ToolSourceError::InvalidInput(format!(
                "file already exists: {}",
                path.display()
            )));
        }
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| ToolSourceError::Transport(format!("failed to create parent dir: {e}")))?;
        }
        std::fs::write(&path, content)
            .map_err(|e| ToolSourceError::Transport(format!("failed to write file: {e}")))?;
        Ok(ToolCallContent { text: "ok".to_string() })
    }
}

/// Replaces one exact occurrence of `old` with `new` in an existing file.
pub struct EditFileTool {
    working_folder: Arc<std::path::PathBuf>,
}

impl EditFileTool {
    pub fn new(working_folder: Arc<std::path::PathBuf>) -> Self {
        Self { working_folder }
    }
}

#[async_trait]
impl Tool for EditFileTool {
    fn name(&self) -> &str {
        "edit_file"
    }

    fn spec(&self) -> ToolSpec {
        ToolSpec {
            name: "edit_file".to_string(),
            description: Some(
                "Replace an exact substring in an existing file. Fails if old_text is absent \
                 or appears more than once, unless replace_all is set."
                    .to_string(),
            ),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "path": { "type": "string" },
                    "old_text": { "type": "string" },
                    "new_text": { "type": "string" },
                    "replace_all": { "type": "boolean", "default": false }
                },
                "required": ["path", "old_text", "new_text"]
            }),
            output_schema: None,
        }
    }

    async fn call(
        &self,
        args: Value,
        _ctx: Option<&ToolCallContext>,
    ) -> Result<ToolCallContent, ToolSourceError> {
        let path = resolve_path_under(&self.working_folder, str_arg(&args, "path")?)?;
        let old_text = str_arg(&args, "old_text")?;
        let new_text = str_arg(&args, "new_text")?;
        let replace_all = args.get("replace_all").and_then(|v| v.as_bool()).unwrap_or(false);

        let content = std::fs::read_to_string(&path)
            .map_err(|e| ToolSourceError::InvalidInput(format!("failed to read file: {e}")))?;
        let occurrences = content.matches(old_text).count();
        if occurrences == 0 {
            return Err(ToolSourceError::InvalidInput(
                "old_text not found in file".to_string(),
            ));
        }
        if occurrences > 1 && !replace_all {
            return Err(ToolSourceError::InvalidInput(format!(
                "old_text occurs {occurrences} times; pass replace_all or narrow old_text"
            )));
        }
        let updated = if replace_all {
            content.replace(old_text, new_text)
        } else {
            content.replacen(old_text, new_text, 1)
        };
        std::fs::write(&path, updated)
            .map_err(|e| ToolSourceError::Transport(format!("failed to write file: {e}")))?;
        Ok(ToolCallContent { text: "ok".to_string() })
    }
}

/// Deletes a single file.
pub struct DeleteFileTool {
    working_folder: Arc<std::path::PathBuf>,
}

impl DeleteFileTool {
    pub fn new(working_folder: Arc<std::path::PathBuf>) -> Self {
        Self { working_folder }
    }
}

#[async_trait]
impl Tool for DeleteFileTool {
    fn name(&self) -> &str {
        "delete_file"
    }

    fn spec(&self) -> ToolSpec {
        ToolSpec {
            name: "delete_file".to_string(),
            description: Some("Delete a single file under the working folder.".to_string()),
            input_schema: json!({
                "type": "object",
                "properties": { "path": { "type": "string" } },
                "required": ["path"]
            }),
            output_schema: None,
        }
    }

    async fn call(
        &self,
        args: Value,
        _ctx: Option<&ToolCallContext>,
    ) -> Result<ToolCallContent, ToolSourceError> {
        let path = resolve_path_under(&self.working_folder, str_arg(&args, "path")?)?;
        if path.is_dir() {
            return Err(ToolSourceError::InvalidInput(format!(
                "is a directory, use delete_dir: {}",
                path.display()
            )));
        }
        std::fs::remove_file(&path)
            .map_err(|e| ToolSourceError::Transport(format!("failed to delete file: {e}")))?;
        Ok(ToolCallContent { text: "ok".to_string() })
    }
}

/// Moves or renames a single file.
pub struct MoveFileTool {
    working_folder: Arc<std::path::PathBuf>,
}

impl MoveFileTool {
    pub fn new(working_folder: Arc<std::path::PathBuf>) -> Self {
        Self { working_folder }
    }
}

#[async_trait]
impl Tool for MoveFileTool {
    fn name(&self) -> &str {
        "move_file"
    }

    fn spec(&self) -> ToolSpec {
        ToolSpec {
            name: "move_file".to_string(),
            description: Some("Move or rename a file under the working folder.".to_string()),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "from": { "type": "string" },
                    "to": { "type": "string" }
                },
                "required": ["from", "to"]
            }),
            output_schema: None,
        }
    }

    async fn call(
        &self,
        args: Value,
        _ctx: Option<&ToolCallContext>,
    ) -> Result<ToolCallContent, ToolSourceError> {
        let from = resolve_path_under(&self.working_folder, str_arg(&args, "from")?)?;
        let to = resolve_path_under(&self.working_folder, str_arg(&args, "to")?)?;
        if from.is_dir() {
            return Err(ToolSourceError::InvalidInput(format!(
                "is a directory, use move_dir: {}",
                from.display()
            )));
        }
        if let Some(parent) = to.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| ToolSourceError::Transport(format!("failed to create parent dir: {e}")))?;
        }
        std::fs::rename(&from, &to)
            .map_err(|e| ToolSourceError::Transport(format!("failed to move file: {e}")))?;
        Ok(ToolCallContent { text: "ok".to_string() })
    }
}

/// Creates a directory, including parents.
pub struct CreateDirTool {
    working_folder: Arc<std::path::PathBuf>,
}

impl CreateDirTool {
    pub fn new(working_folder: Arc<std::path::PathBuf>) -> Self {
        Self { working_folder }
    }
}

#[async_trait]
impl Tool for CreateDirTool {
    fn name(&self) -> &str {
        "create_dir"
    }

    fn spec(&self) -> ToolSpec {
        ToolSpec {
            name: "create_dir".to_string(),
            description: Some("Create a directory under the working folder, including parents.".to_string()),
            input_schema: json!({
                "type": "object",
                "properties": { "path": { "type": "string" } },
                "required": ["path"]
            }),
            output_schema: None,
        }
    }

    async fn call(
        &self,
        args: Value,
        _ctx: Option<&ToolCallContext>,
    ) -> Result<ToolCallContent, ToolSourceError> {
        let path = resolve_path_under(&self.working_folder, str_arg(&args, "path")?)?;
        std::fs::create_dir_all(&path)
            .map_err(|e| ToolSourceError::Transport(format!("failed to create directory: {e}")))?;
        Ok(ToolCallContent { text: "ok".to_string() })
    }
}

/// Deletes a directory and everything under it.
pub struct DeleteDirTool {
    working_folder: Arc<std::path::PathBuf>,
}

impl DeleteDirTool {
    pub fn new(working_folder: Arc<std::path::PathBuf>) -> Self {
        Self { working_folder }
    }
}

#[async_trait]
impl Tool for DeleteDirTool {
    fn name(&self) -> &str {
        "delete_dir"
    }

    fn spec(&self) -> ToolSpec {
        ToolSpec {
            name: "delete_dir".to_string(),
            description: Some("Recursively delete a directory under the working folder.".to_string()),
            input_schema: json!({
                "type": "object",
                "properties": { "path": { "type": "string" } },
                "required": ["path"]
            }),
            output_schema: None,
        }
    }

    async fn call(
        &self,
        args: Value,
        _ctx: Option<&ToolCallContext>,
    ) -> Result<ToolCallContent, ToolSourceError> {
        let path = resolve_path_under(&self.working_folder, str_arg(&args, "path")?)?;
        if path == *self.working_folder {
            return Err(ToolSourceError::InvalidInput(
                "refusing to delete the working folder itself".to_string(),
            ));
        }
        if !path.is_dir() {
            return Err(ToolSourceError::InvalidInput(format!(
                "not a directory: {}",
                path.display()
            )));
        }
        std::fs::remove_dir_all(&path)
            .map_err(|e| ToolSourceError::Transport(format!("failed to delete directory: {e}")))?;
        Ok(ToolCallContent { text: "ok".to_string() })
    }
}

/// Moves or renames a directory.
pub struct MoveDirTool {
    working_folder: Arc<std::path::PathBuf>,
}

impl MoveDirTool {
    pub fn new(working_folder: Arc<std::path::PathBuf>) -> Self {
        Self { working_folder }
    }
}

#[async_trait]
impl Tool for MoveDirTool {
    fn name(&self) -> &str {
        "move_dir"
    }

    fn spec(&self) -> ToolSpec {
        ToolSpec {
            name: "move_dir".to_string(),
            description: Some("Move or rename a directory under the working folder.".to_string()),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "from": { "type": "string" },
                    "to": { "type": "string" }
                },
                "required": ["from", "to"]
            }),
            output_schema: None,
        }
    }

    async fn call(
        &self,
        args: Value,
        _ctx: Option<&ToolCallContext>,
    ) -> Result<ToolCallContent, ToolSourceError> {
        let from = resolve_path_under(&self.working_folder, str_arg(&args, "from")?)?;
        let to = resolve_path_under(&self.working_folder, str_arg(&args, "to")?)?;
        if !from.is_dir() {
            return Err(ToolSourceError::InvalidInput(format!(
                "not a directory: {}",
                from.display()
            )));
        }
        if let Some(parent) = to.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| ToolSourceError::Transport(format!("failed to create parent dir: {e}")))?;
        }
        std::fs::rename(&from, &to)
            .map_err(|e| ToolSourceError::Transport(format!("failed to move directory: {e}")))?;
        Ok(ToolCallContent { text: "ok".to_string() })
    }
}

/// Lists files as a tree under the working folder, skipping common
/// build/dependency directories and capping output at [`LS_LIMIT`] entries.
pub struct ListDirTool {
    working_folder: Arc<std::path::PathBuf>,
}

impl ListDirTool {
    pub fn new(working_folder: Arc<std::path::PathBuf>) -> Self {
        Self { working_folder }
    }
}

#[async_trait]
impl Tool for ListDirTool {
    fn name(&self) -> &str {
        "list_dir"
    }

    fn spec(&self) -> ToolSpec {
        ToolSpec {
            name: "list_dir".to_string(),
            description: Some(
                "List files and directories as a tree. Path defaults to the working folder root."
                    .to_string(),
            ),
            input_schema: json!({
                "type": "object",
                "properties": { "path": { "type": "string" } }
            }),
            output_schema: None,
        }
    }

    async fn call(
        &self,
        args: Value,
        _ctx: Option<&ToolCallContext>,
    ) -> Result<ToolCallContent, ToolSourceError> {
        let path_param = args.get("path").and_then(|v| v.as_str()).unwrap_or(".");
        let path_param = if path_param.trim().is_empty() { "." } else { path_param };
        let search_root = resolve_path_under(&self.working_folder, path_param)?;
        if !search_root.is_dir() {
            return Err(ToolSourceError::InvalidInput(format!(
                "not a directory: {}",
                search_root.display()
            )));
        }

        let mut files: Vec<String> = Vec::new();
        let mut truncated = false;
        for entry in WalkDir::new(&search_root).follow_links(false).into_iter().filter_entry(|e| {
            e.depth() == 0 || !(e.file_type().is_dir() && IGNORE_DIRS.contains(&e.file_name().to_string_lossy().as_ref()))
        }) {
            let entry = match entry {
                Ok(e) => e,
                Err(_) => continue,
            };
            if !entry.file_type().is_file() {
                continue;
            }
            let Ok(rel) = entry.path().strip_prefix(&search_root) else {
                continue;
            };
            files.push(rel.to_string_lossy().replace('\\', "/"));
            if files.len() >= LS_LIMIT {
                truncated = true;
                break;
            }
        }
        files.sort();

        let mut dirs: HashSet<String> = HashSet::from([".".to_string()]);
        let mut files_by_dir: HashMap<String, Vec<String>> = HashMap::new();
        for file in &files {
            let dir = match Path::new(file).parent() {
                Some(p) if p.as_os_str().is_empty() => ".".to_string(),
                Some(p) => p.to_string_lossy().replace('\\', "/"),
                None => ".".to_string(),
            };
            let parts: Vec<&str> = if dir == "." { vec![] } else { dir.split('/').collect() };
            for i in 1..=parts.len() {
                dirs.insert(parts[..i].join("/"));
            }
            let filename = Path::new(file).file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default();
            files_by_dir.entry(dir).or_default().push(filename);
        }

        fn render(dir: &str, depth: usize, dirs: &HashSet<String>, files_by_dir: &HashMap<String, Vec<String>>) -> String {
            let indent = "  ".repeat(depth);
            let mut out = String::new();
            if depth > 0 {
                let name = dir.rsplit('/').next().unwrap_or(dir);
                out.push_str(&format!("{indent}{name}/\n"));
            }
            let child_indent = "  ".repeat(depth + 1);
            let mut children: Vec<&str> = dirs
                .iter()
                .map(String::as_str)
                .filter(|d| {
                    let parent = d.rfind('/').map(|i| &d[..i]).unwrap_or(".");
                    parent == dir && *d != dir
                })
                .collect();
            children.sort();
            for child in children {
                out.push_str(&render(child, depth + 1, dirs, files_by_dir));
            }
            let mut entries: Vec<&str> = files_by_dir.get(dir).map(|v| v.iter().map(String::as_str).collect()).unwrap_or_default();
            entries.sort();
            for f in entries {
                out.push_str(&format!("{child_indent}{f}\n"));
            }
            out
        }

        let mut out = format!("{}/\n", search_root.display());
        out.push_str(&render(".", 0, &dirs, &files_by_dir));
        if truncated {
            out.push_str(&format!("\n(truncated: showing first {LS_LIMIT} files)\n"));
        }
        Ok(ToolCallContent { text: out })
    }
}

/// Lists files under the working folder matching a glob pattern.
pub struct GlobTool {
    working_folder: Arc<std::path::PathBuf>,
}

impl GlobTool {
    pub fn new(working_folder: Arc<std::path::PathBuf>) -> Self {
        Self { working_folder }
    }
}

#[async_trait]
impl Tool for GlobTool {
    fn name(&self) -> &str {
        "glob"
    }

    fn spec(&self) -> ToolSpec {
        ToolSpec {
            name: "glob".to_string(),
            description: Some(
                "List files under the working folder matching a glob pattern, e.g. '**/*.rs'."
                    .to_string(),
            ),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "pattern": { "type": "string" },
                    "path": { "type": "string" }
                },
                "required": ["pattern"]
            }),
            output_schema: None,
        }
    }

    async fn call(
        &self,
        args: Value,
        _ctx: Option<&ToolCallContext>,
    ) -> Result<ToolCallContent, ToolSourceError> {
        let pattern_str = str_arg(&args, "pattern")?.trim();
        if pattern_str.is_empty() {
            return Err(ToolSourceError::InvalidInput("pattern must be non-empty".to_string()));
        }
        let path_param = args.get("path").and_then(|v| v.as_str()).unwrap_or(".");
        let path_param = if path_param.trim().is_empty() { "." } else { path_param };
        let search_root = resolve_path_under(&self.working_folder, path_param)?;
        if !search_root.is_dir() {
            return Err(ToolSourceError::InvalidInput(format!(
                "not a directory: {}",
                search_root.display()
            )));
        }
        let pattern = Pattern::new(pattern_str)
            .map_err(|e| ToolSourceError::InvalidInput(format!("invalid glob pattern: {e}")))?;

        let mut matched: Vec<String> = WalkDir::new(&search_root)
            .follow_links(false)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
            .filter_map(|e| {
                let rel = e.path().strip_prefix(&search_root).ok()?;
                let rel_str = rel.to_string_lossy().replace('\\', "/");
                pattern.matches(&rel_str).then_some(rel_str)
            })
            .collect();
        matched.sort();
        matched.dedup();
        Ok(ToolCallContent { text: matched.join("\n") })
    }
}
