//! Sandboxed execution of generated scripts
//!
//! Generated code is untrusted: it runs as an isolated child process with
//! piped stdio and a wall-clock timeout, never in-process. The generation
//! prompt pins fixed placeholder paths so the rewrite to concrete per-request
//! paths is reliable.

use std::io::Write;
use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

use log::{error, info};
use tokio::process::Command;

/// Placeholder input path the prompt instructs the model to read from
pub const INPUT_PLACEHOLDER: &str = "/home/user/input.jsonl";

/// Placeholder output path the prompt instructs the model to write to
pub const OUTPUT_PLACEHOLDER: &str = "/home/user/output.csv";

/// Configuration for sandboxed execution
#[derive(Debug, Clone)]
pub struct SandboxConfig {
    /// Interpreter binary used to run the script
    pub interpreter: String,

    /// Wall-clock ceiling for one execution
    pub timeout: Duration,
}

impl Default for SandboxConfig {
    fn default() -> Self {
        Self {
            interpreter: "python3".to_string(),
            timeout: Duration::from_secs(300),
        }
    }
}

impl SandboxConfig {
    pub fn new(interpreter: impl Into<String>, timeout: Duration) -> Self {
        Self {
            interpreter: interpreter.into(),
            timeout,
        }
    }
}

/// Outcome of one sandboxed execution
#[derive(Debug, Clone)]
pub struct ExecOutcome {
    /// Process exited with status zero
    pub success: bool,

    /// Captured stdout on success, stderr or launch error on failure
    pub output: String,
}

impl ExecOutcome {
    fn ok(output: String) -> Self {
        Self { success: true, output }
    }

    fn fail(output: String) -> Self {
        Self { success: false, output }
    }
}

/// Runs generated scripts in isolated child processes
pub struct SandboxRunner {
    config: SandboxConfig,
}

impl SandboxRunner {
    pub fn new(config: SandboxConfig) -> Self {
        Self { config }
    }

    /// Execute `code` against concrete input/output paths.
    ///
    /// Placeholder path literals are rewritten to the supplied paths before
    /// the script is written to a temp file and run. The temp file is removed
    /// when this returns, regardless of outcome.
    pub async fn run(&self, code: &str, input_path: &Path, output_path: &Path) -> ExecOutcome {
        info!(
            "Executing generated script with input={}, output={}",
            input_path.display(),
            output_path.display()
        );

        let rewritten = rewrite_placeholders(code, input_path, output_path);

        // NamedTempFile deletes the script on drop, covering every exit path
        let script = match write_script(&rewritten) {
            Ok(script) => script,
            Err(e) => {
                error!("Failed to stage generated script: {}", e);
                return ExecOutcome::fail(e.to_string());
            }
        };

        let child = Command::new(&self.config.interpreter)
            .arg(script.path())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output();

        let output = match tokio::time::timeout(self.config.timeout, child).await {
            Ok(Ok(output)) => output,
            Ok(Err(e)) => {
                error!("Failed to launch interpreter: {}", e);
                return ExecOutcome::fail(e.to_string());
            }
            Err(_) => {
                error!("Script execution timed out after {:?}", self.config.timeout);
                return ExecOutcome::fail(format!(
                    "Script execution timed out after {} seconds",
                    self.config.timeout.as_secs()
                ));
            }
        };

        let stdout = String::from_utf8_lossy(&output.stdout).to_string();
        let stderr = String::from_utf8_lossy(&output.stderr).to_string();

        if output.status.success() {
            info!("Script execution successful");
            ExecOutcome::ok(stdout)
        } else {
            error!("Script execution failed: {}", stderr);
            ExecOutcome::fail(stderr)
        }
    }
}

/// Substitute the prompt's fixed placeholder paths with concrete ones
fn rewrite_placeholders(code: &str, input_path: &Path, output_path: &Path) -> String {
    code.replace(INPUT_PLACEHOLDER, &input_path.to_string_lossy())
        .replace(OUTPUT_PLACEHOLDER, &output_path.to_string_lossy())
}

fn write_script(code: &str) -> std::io::Result<tempfile::NamedTempFile> {
    let mut script = tempfile::Builder::new().suffix(".py").tempfile()?;
    script.write_all(code.as_bytes())?;
    script.flush()?;
    Ok(script)
}
