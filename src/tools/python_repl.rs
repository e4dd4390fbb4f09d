//! Code execution tool.
//!
//! Each snippet runs in a fresh interpreter process inside its own temporary
//! directory, with a cleared environment and a hard timeout.

use super::Tool;
use crate::config::PythonReplSettings;
use crate::error::{CogitoError, Result};
use async_trait::async_trait;
use serde_json::{json, Value};
use std::process::Stdio;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;
use tracing::{debug, info, instrument};

/// Output cap, in bytes, for what the model gets back.
const MAX_OUTPUT_BYTES: usize = 10_000;

/// Runs code snippets and reports their output.
pub struct PythonRepl {
    interpreter: String,
    timeout: Duration,
}

impl PythonRepl {
    pub fn new(interpreter: &str, timeout: Duration) -> Self {
        Self {
            interpreter: interpreter.to_string(),
            timeout,
        }
    }

    pub fn from_settings(settings: &PythonReplSettings) -> Self {
        Self::new(&settings.interpreter, Duration::from_secs(settings.timeout_secs))
    }

    /// Run `code` and return what it printed.
    ///
    /// A non-zero exit is not an error: stderr is returned the way an
    /// interactive session would show the exception.
    #[instrument(skip(self, code), fields(interpreter = %self.interpreter))]
    pub async fn run(&self, code: &str) -> Result<String> {
        let workdir = tempfile::tempdir()?;
        let script = workdir.path().join("snippet.py");
        tokio::fs::write(&script, code).await?;

        let mut command = Command::new(&self.interpreter);
        command
            .arg(&script)
            .current_dir(workdir.path())
            .env_clear()
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Ok(path) = std::env::var("PATH") {
            command.env("PATH", path);
        }

        let mut child = command
            .spawn()
            .map_err(|e| CogitoError::Tool(format!("Failed to start {}: {}", self.interpreter, e)))?;
        let stdout = child.stdout.take();
        let stderr = child.stderr.take();

        // Dropping `child` on timeout kills it.
        let run = async {
            let (stdout, stderr) = tokio::join!(read_capped(stdout), read_capped(stderr));
            let (stdout, stdout_cut) = stdout?;
            let (stderr, stderr_cut) = stderr?;
            let truncated = stdout_cut || stderr_cut;
            if truncated {
                if let Err(e) = child.start_kill() {
                    debug!("Could not stop chatty snippet: {}", e);
                }
            }
            let status = child.wait().await?;
            Ok::<_, std::io::Error>((status, stdout, stderr, truncated))
        };
        let (status, stdout, stderr, truncated) = tokio::time::timeout(self.timeout, run)
            .await
            .map_err(|_| {
                CogitoError::Tool(format!("Execution timed out after {} seconds", self.timeout.as_secs_f64()))
            })?
            .map_err(|e| CogitoError::Tool(format!("{} failed: {}", self.interpreter, e)))?;

        let mut text = String::from_utf8_lossy(&stdout).to_string();
        if !status.success() {
            text.push_str(&String::from_utf8_lossy(&stderr));
        }
        info!("Snippet exited with {:?}", status.code());

        if truncated || text.len() > MAX_OUTPUT_BYTES {
            let mut cut = MAX_OUTPUT_BYTES.min(text.len());
            while !text.is_char_boundary(cut) {
                cut -= 1;
            }
            text.truncate(cut);
            text.push_str("\n... [output truncated]");
        }
        Ok(text)
    }
}

/// Read a pipe up to the output cap; the flag tells whether more was pending.
async fn read_capped<R: AsyncRead + Unpin>(reader: Option<R>) -> std::io::Result<(Vec<u8>, bool)> {
    let mut buf = Vec::new();
    if let Some(reader) = reader {
        let mut limited = reader.take(MAX_OUTPUT_BYTES as u64 + 1);
        limited.read_to_end(&mut buf).await?;
    }
    let truncated = buf.len() > MAX_OUTPUT_BYTES;
    buf.truncate(MAX_OUTPUT_BYTES);
    Ok((buf, truncated))
}

/// Text handed back to the model after a run.
fn format_success(code: &str, stdout: &str) -> String {
    format!(
        "Successfully executed:\n```python\n{}\n```\nStdout: {}\n\nIf you have completed all tasks, respond with FINAL ANSWER.",
        code, stdout
    )
}

#[async_trait]
impl Tool for PythonRepl {
    fn name(&self) -> &str {
        "python_repl"
    }

    fn description(&self) -> &str {
        "Use this to execute python code. If you want to see the output of a value, \
        you should print it out with `print(...)`. This is visible to the user."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "code": {
                    "type": "string",
                    "description": "The python code to execute to generate your chart."
                }
            },
            "required": ["code"]
        })
    }

    async fn execute(&self, args: Value) -> Result<String> {
        let code = args["code"]
            .as_str()
            .ok_or_else(|| CogitoError::Tool("Missing 'code' argument".to_string()))?;

        match self.run(code).await {
            Ok(stdout) => Ok(format_success(code, &stdout)),
            Err(e) => Ok(format!("Failed to execute. Error: {}", e)),
        }
    }
}
