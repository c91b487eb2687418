/// Notebook execution through a Jupyter subprocess
use async_trait::async_trait;
use std::path::Path;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;

use crate::config::NotebooksConfig;
use crate::errors::{PipelineError, PipelineResult};
use crate::logger::{self, LogTag};

/// Runs one notebook to completion
#[async_trait]
pub trait NotebookExecutor: Send + Sync {
    /// `PipelineError::Notebook` on a failed cell, timeout or spawn error
    async fn execute(&self, path: &Path, timeout: Duration) -> PipelineResult<()>;
}

/// `jupyter nbconvert --execute` in the notebook's directory
///
/// The executed notebook goes to stdout and is discarded, so sources are
/// never rewritten. The child is killed when the timeout fires.
pub struct JupyterExecutor {
    command: String,
    kernel: String,
}

impl JupyterExecutor {
    pub fn new(config: &NotebooksConfig) -> Self {
        Self {
            command: config.jupyter_command.clone(),
            kernel: config.kernel.clone(),
        }
    }

    fn build_command(&self, path: &Path, timeout: Duration) -> Command {
        let dir = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        let file_name = path.file_name().unwrap_or(path.as_os_str());

        let mut command = Command::new(&self.command);
        command
            .arg("nbconvert")
            .args(["--to", "notebook", "--execute", "--stdout"])
            .arg(format!("--ExecutePreprocessor.timeout={}", timeout.as_secs()))
            .arg(format!("--ExecutePreprocessor.kernel_name={}", self.kernel))
            .arg(file_name)
            .current_dir(dir)
            .env("PYTHONWARNINGS", "ignore::UserWarning:multiprocessing.resource_tracker")
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        command
    }
}

fn stderr_tail(stderr: &[u8], max_lines: usize) -> String {
    let text = String::from_utf8_lossy(stderr);
    let lines: Vec<&str> = text.lines().collect();
    lines[lines.len().saturating_sub(max_lines)..].join("\n")
}

#[async_trait]
impl NotebookExecutor for JupyterExecutor {
    async fn execute(&self, path: &Path, timeout: Duration) -> PipelineResult<()> {
        let child = self.build_command(path, timeout).spawn().map_err(|e| {
            PipelineError::Notebook(format!("Could not start {}: {}", self.command, e))
        })?;

        // Dropping the child on timeout kills it
        let output = match tokio::time::timeout(timeout, child.wait_with_output()).await {
            Ok(result) => result?,
            Err(_) => {
                return Err(PipelineError::Notebook(format!(
                    "Timed out after {}s",
                    timeout.as_secs()
                )))
            }
        };

        if output.status.success() {
            return Ok(());
        }

        let tail = stderr_tail(&output.stderr, 20);
        logger::debug(
            LogTag::Notebooks,
            &format!("{} stderr:\n{}", path.display(), tail),
        );
        Err(PipelineError::Notebook(format!(
            "Exited with {}: {}",
            output.status,
            tail.lines().last().unwrap_or("no output")
        )))
    }
}
