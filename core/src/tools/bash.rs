//! Shell execution tool. Registered only when the caller has explicitly
//! opted in (the CLI's `--allow-shell` flag), since it runs arbitrary
//! commands in the process environment.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};

use super::spec::{ToolCallContent, ToolCallContext, ToolSourceError};
use super::r#trait::Tool;

const DEFAULT_TIMEOUT_MS: u64 = 120_000;

/// Runs a single shell command and returns combined stdout/stderr.
///
/// Defaults to the working folder when no `workdir` argument is given.
pub struct BashTool {
    working_folder: Arc<std::path::PathBuf>,
}

impl BashTool {
    pub fn new(working_folder: Arc<std::path::PathBuf>) -> Self {
        Self { working_folder }
    }
}

#[async_trait]
impl Tool for BashTool {
    fn name(&self) -> &str {
        "bash"
    }

    fn spec(&self) -> super::spec::ToolSpec {
        super::spec::ToolSpec {
            name: "bash".to_string(),
            description: Some(
                "Executes a shell command in a subprocess, with optional workdir and timeout. \
                 Use for git, npm, cargo, and similar; prefer the file tools for reading, \
                 writing, or searching files. Runs via `sh -c` on Unix, `cmd /C` on Windows. \
                 Returns combined stdout and stderr."
                    .to_string(),
            ),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "command": { "type": "string", "description": "The shell command to run." },
                    "workdir": {
                        "type": "string",
                        "description": "Directory to run in, relative to the working folder. Omit to use the working folder."
                    },
                    "timeout": {
                        "type": "integer",
                        "description": "Timeout in milliseconds (default 120000). 0 disables the timeout.",
                        "default": 120000
                    }
                },
                "required": ["command"]
            }),
            output_schema: None,
        }
    }

    async fn call(
        &self,
        args: Value,
        _ctx: Option<&ToolCallContext>,
    ) -> Result<ToolCallContent, ToolSourceError> {
        let command = args
            .get("command")
            .and_then(|v| v.as_str())
            .ok_or_else(|| ToolSourceError::InvalidInput("missing command".to_string()))?;
        let timeout_ms = args.get("timeout").and_then(|v| v.as_u64()).unwrap_or(DEFAULT_TIMEOUT_MS);

        let workdir = match args.get("workdir").and_then(|v| v.as_str()) {
            Some(rel) => super::path::resolve_path_under(&self.working_folder, rel)?,
            None => self.working_folder.as_ref().clone(),
        };

        let output = run_shell_command(command, &workdir, timeout_ms).await?;

        let text = if output.stderr.is_empty() {
            output.stdout
        } else if output.stdout.is_empty() {
            format!("stderr:\n{}", output.stderr)
        } else {
            format!("stdout:\n{}\nstderr:\n{}", output.stdout, output.stderr)
        };
        Ok(ToolCallContent { text })
    }
}

struct ShellOutput {
    stdout: String,
    stderr: String,
}

#[cfg(unix)]
async fn run_shell_command(
    command: &str,
    workdir: &std::path::Path,
    timeout_ms: u64,
) -> Result<ShellOutput, ToolSourceError> {
    let mut cmd = tokio::process::Command::new("sh");
    cmd.arg("-c").arg(command).current_dir(workdir);
    run_with_timeout(cmd, timeout_ms).await
}

#[cfg(windows)]
async fn run_shell_command(
    command: &str,
    workdir: &std::path::Path,
    timeout_ms: u64,
) -> Result<ShellOutput, ToolSourceError> {
    let mut cmd = tokio::process::Command::new("cmd");
    cmd.args(["/C", command]).current_dir(workdir);
    run_with_timeout(cmd, timeout_ms).await
}

async fn run_with_timeout(
    mut cmd: tokio::process::Command,
    timeout_ms: u64,
) -> Result<ShellOutput, ToolSourceError> {
    let output = if timeout_ms == 0 {
        cmd.output()
            .await
            .map_err(|e| ToolSourceError::Transport(format!("failed to run command: {e}")))?
    } else {
        tokio::time::timeout(std::time::Duration::from_millis(timeout_ms), cmd.output())
            .await
            .map_err(|_| ToolSourceError::Transport("command timed out".to_string()))?
            .map_err(|e| ToolSourceError::Transport(format!("failed to run command: {e}")))?
    };
    Ok(ShellOutput {
        stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
        stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn runs_a_simple_command_and_captures_stdout() {
        let dir = tempfile::tempdir().unwrap();
        let tool = BashTool::new(Arc::new(dir.path().to_path_buf()));
        let result = tool
            .call(json!({ "command": "echo hello" }), None)
            .await
            .unwrap();
        assert!(result.text.contains("hello"));
    }

    #[tokio::test]
    async fn missing_command_is_invalid_input() {
        let dir = tempfile::tempdir().unwrap();
        let tool = BashTool::new(Arc::new(dir.path().to_path_buf()));
        let err = tool.call(json!({}), None).await.unwrap_err();
        assert!(matches!(err, ToolSourceError::InvalidInput(_)));
    }
}
