//! CLI agent provider
//!
//! Wraps a locally installed coding agent binary (claude, codex, gemini).
//! The prompt goes in on stdin, the answer comes back on stdout. Stderr is
//! captured for error reporting; a non-zero exit fails the variant.

use arena_application::ports::provider::{
    ModelProvider, ProviderError, ProviderRequest, ProviderResult,
};
use arena_domain::AgentMode;
use async_trait::async_trait;
use std::process::Stdio;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::debug;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(600);

/// Provider that shells out to a coding agent CLI
pub struct CliAgentProvider {
    mode: AgentMode,
    program: String,
    args: Vec<String>,
    timeout: Duration,
}

impl CliAgentProvider {
    pub fn new(mode: AgentMode, program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            mode,
            program: program.into(),
            args,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Context (when present) is prepended to the prompt with a blank line
    /// between, matching what the agents expect on stdin.
    fn stdin_payload(request: &ProviderRequest) -> String {
        match &request.context {
            Some(context) if !context.is_empty() => {
                format!("{context}\n\n{}", request.prompt)
            }
            _ => request.prompt.clone(),
        }
    }
}

#[async_trait]
impl ModelProvider for CliAgentProvider {
    fn mode(&self) -> AgentMode {
        self.mode
    }

    async fn execute(&self, request: &ProviderRequest) -> Result<ProviderResult, ProviderError> {
        debug!("Spawning {} for model {}", self.program, request.model);

        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                // A missing binary will not appear by retrying
                ProviderError::Fatal(format!("failed to spawn {}: {e}", self.program))
            })?;

        if let Some(mut stdin) = child.stdin.take() {
            let payload = Self::stdin_payload(request);
            stdin
                .write_all(payload.as_bytes())
                .await
                .map_err(|e| ProviderError::Transient(format!("stdin write failed: {e}")))?;
            // Close stdin so the agent sees EOF and starts working
            drop(stdin);
        }

        let output = tokio::time::timeout(self.timeout, child.wait_with_output())
            .await
            .map_err(|_| ProviderError::Timeout)?
            .map_err(|e| ProviderError::Transient(format!("agent wait failed: {e}")))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(ProviderError::Fatal(format!(
                "{} exited with {}: {}",
                self.program,
                output.status,
                stderr.trim()
            )));
        }

        let content = String::from_utf8_lossy(&output.stdout).trim().to_string();
        // Local agents bill through their own subscription, not per token
        Ok(ProviderResult::new(content, 0.0))
    }
}
