//! Generate-validate-retry control loop
//!
//! The orchestrator drives one conversion end-to-end: ask the model for a
//! parsing script, run it in the sandbox, validate the artifact, and on
//! failure fold the error into the next attempt's prompt. Attempts are
//! strictly sequential; the loop is bounded and never errors out - it always
//! produces a LoopResult, after exhaustion the last attempt's.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use log::{error, info, warn};

use crate::extract::extract_code;
use crate::llm::ModelClient;
use crate::sandbox::SandboxRunner;
use crate::validate::validate_csv;

/// Message recorded when the model call itself returns no text
const GENERATION_FAILED: &str = "Failed to generate code from AI model";

/// Message used when the script exited zero but wrote no artifact
const NO_ARTIFACT: &str = "Output CSV file was not created";

/// Configuration for the retry loop
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    /// Maximum number of attempts (model calls)
    pub max_attempts: u32,

    /// Fixed delay between attempts
    pub retry_delay: Duration,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            retry_delay: Duration::from_secs(2),
        }
    }
}

impl OrchestratorConfig {
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    pub fn with_retry_delay(mut self, retry_delay: Duration) -> Self {
        self.retry_delay = retry_delay;
        self
    }
}

/// One generate->execute->validate cycle
#[derive(Debug, Clone)]
pub struct Attempt {
    /// Ordinal index, 1-based
    pub index: u32,

    /// Extracted script, absent when the model call failed
    pub code: Option<String>,

    /// Script exited with status zero
    pub exec_success: bool,

    /// Captured stdout on success, stderr or failure message otherwise
    pub exec_output: String,

    /// Artifact existed after execution
    pub output_exists: bool,

    /// Validation verdict; false whenever validation did not run
    pub validation_success: bool,

    /// Validation message, empty when validation did not run
    pub validation_message: String,
}

impl Attempt {
    fn generation_failed(index: u32) -> Self {
        Self {
            index,
            code: None,
            exec_success: false,
            exec_output: GENERATION_FAILED.to_string(),
            output_exists: false,
            validation_success: false,
            validation_message: String::new(),
        }
    }

    /// Execution ok AND artifact exists AND validation ok
    pub fn overall_success(&self) -> bool {
        self.exec_success && self.output_exists && self.validation_success
    }

    /// The message to fold into the next attempt's prompt.
    ///
    /// None for a failed model call: there is nothing new to tell the model,
    /// so the previous feedback (if any) is carried unchanged.
    fn failure_message(&self) -> Option<String> {
        if self.code.is_none() {
            return None;
        }
        if !self.exec_success {
            return Some(self.exec_output.clone());
        }
        if !self.output_exists {
            return Some(NO_ARTIFACT.to_string());
        }
        if !self.validation_success {
            return Some(self.validation_message.clone());
        }
        None
    }

    fn into_result(self) -> LoopResult {
        LoopResult {
            code: self.code,
            success: self.exec_success,
            message: self.exec_output,
            validation_success: self.validation_success,
            output_exists: self.output_exists,
        }
    }
}

/// Terminal value of the retry loop. Immutable once produced.
#[derive(Debug, Clone)]
pub struct LoopResult {
    /// Final generated script, if any attempt produced one
    pub code: Option<String>,

    /// Execution succeeded on the final attempt
    pub success: bool,

    /// Execution output or generation failure message of the final attempt
    pub message: String,

    /// Validation succeeded on the final attempt
    pub validation_success: bool,

    /// Artifact existed after the final attempt
    pub output_exists: bool,
}

impl LoopResult {
    /// The conversion as a whole succeeded
    pub fn overall_success(&self) -> bool {
        self.success && self.validation_success && self.output_exists
    }
}

/// Bounded attempt loop with failure-driven feedback
pub struct RetryOrchestrator {
    model: Arc<dyn ModelClient>,
    sandbox: SandboxRunner,
    config: OrchestratorConfig,
}

impl RetryOrchestrator {
    pub fn new(model: Arc<dyn ModelClient>, sandbox: SandboxRunner, config: OrchestratorConfig) -> Self {
        Self {
            model,
            sandbox,
            config,
        }
    }

    /// Run the loop until overall success or attempt exhaustion.
    ///
    /// Each attempt regenerates code from scratch; only the failure message
    /// is carried forward. Returns the last attempt's result when every
    /// attempt fails.
    pub async fn run(
        &self,
        input_path: &Path,
        output_path: &Path,
        prompt: &str,
        sample_line: &str,
        project_id: &str,
    ) -> LoopResult {
        let mut feedback: Option<String> = None;
        let mut last = Attempt::generation_failed(0).into_result();

        for index in 1..=self.config.max_attempts {
            if index > 1 {
                tokio::time::sleep(self.config.retry_delay).await;
            }

            info!("Attempt {}/{}", index, self.config.max_attempts);
            let attempt = self
                .attempt(index, input_path, output_path, prompt, sample_line, feedback.as_deref(), project_id)
                .await;

            if attempt.overall_success() {
                info!("Attempt {} succeeded: {}", index, attempt.validation_message);
                return attempt.into_result();
            }

            warn!(
                "Attempt {} failed: exec_success={}, output_exists={}, validation_success={}",
                attempt.index, attempt.exec_success, attempt.output_exists, attempt.validation_success
            );

            if let Some(message) = attempt.failure_message() {
                feedback = Some(message);
            }
            last = attempt.into_result();
        }

        error!("All {} attempts exhausted", self.config.max_attempts);
        last
    }

    async fn attempt(
        &self,
        index: u32,
        input_path: &Path,
        output_path: &Path,
        prompt: &str,
        sample_line: &str,
        feedback: Option<&str>,
        project_id: &str,
    ) -> Attempt {
        let Some(raw) = self.model.generate(prompt, sample_line, feedback, project_id).await else {
            error!("{}", GENERATION_FAILED);
            return Attempt::generation_failed(index);
        };

        let code = extract_code(&raw);
        let exec = self.sandbox.run(&code, input_path, output_path).await;
        let output_exists = output_path.exists();

        let (validation_success, validation_message) = if exec.success && output_exists {
            let report = validate_csv(output_path);
            info!(
                "Validation result: success={}, message={}",
                report.success, report.message
            );
            (report.success, report.message)
        } else {
            (false, String::new())
        };

        Attempt {
            index,
            code: Some(code),
            exec_success: exec.success,
            exec_output: exec.output,
            output_exists,
            validation_success,
            validation_message,
        }
    }
}
