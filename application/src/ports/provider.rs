//! Model provider port
//!
//! Defines the "execute a variant" contract: one capability per agent mode,
//! each accepting a prompt/context plus parameters and returning a result
//! or a failure, potentially as a stream of partial output.

use arena_domain::{AgentMode, CompletedOutput, ModelId, StreamEvent};
use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::mpsc;

/// Errors that can occur during provider execution
///
/// The transient/fatal split drives the orchestrator's retry policy:
/// transient failures are retried with backoff, fatal ones fail the
/// variant immediately.
#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("Transient provider error: {0}")]
    Transient(String),

    #[error("Provider error: {0}")]
    Fatal(String),

    #[error("Provider timed out")]
    Timeout,

    #[error("No provider available for mode {0}")]
    ModeNotAvailable(AgentMode),
}

impl ProviderError {
    /// Whether the orchestrator may retry after this error.
    pub fn is_transient(&self) -> bool {
        matches!(self, ProviderError::Transient(_) | ProviderError::Timeout)
    }
}

/// One variant's execution request
#[derive(Debug, Clone)]
pub struct ProviderRequest {
    pub model: ModelId,
    pub prompt: String,
    pub context: Option<String>,
    pub parameters: serde_json::Value,
}

impl ProviderRequest {
    pub fn new(model: ModelId, prompt: impl Into<String>) -> Self {
        Self {
            model,
            prompt: prompt.into(),
            context: None,
            parameters: serde_json::Value::Null,
        }
    }

    pub fn with_context(mut self, context: Option<String>) -> Self {
        self.context = context;
        self
    }

    pub fn with_parameters(mut self, parameters: serde_json::Value) -> Self {
        self.parameters = parameters;
        self
    }
}

/// Final result of a provider execution
pub type ProviderResult = CompletedOutput;

/// Handle for receiving streaming events from a provider execution.
///
/// Wraps an `mpsc::Receiver<StreamEvent>` and provides convenience methods
/// for consuming the stream.
pub struct StreamHandle {
    pub receiver: mpsc::Receiver<StreamEvent>,
}

impl StreamHandle {
    pub fn new(receiver: mpsc::Receiver<StreamEvent>) -> Self {
        Self { receiver }
    }

    /// Consume the stream, invoking `on_delta` for each partial chunk, and
    /// return the final result.
    ///
    /// Mid-stream errors are classified transient: the provider accepted
    /// the request, so the failure is assumed recoverable. The same goes
    /// for a stream that closes before delivering a terminal event.
    pub async fn collect(
        mut self,
        mut on_delta: impl FnMut(&str) + Send,
    ) -> Result<ProviderResult, ProviderError> {
        let mut full_text = String::new();
        while let Some(event) = self.receiver.recv().await {
            match event {
                StreamEvent::Delta(chunk) => {
                    on_delta(&chunk);
                    full_text.push_str(&chunk);
                }
                StreamEvent::Completed(output) => {
                    if output.content.is_empty() && !full_text.is_empty() {
                        return Ok(ProviderResult::new(full_text, output.cost));
                    }
                    return Ok(output);
                }
                StreamEvent::Error(e) => {
                    return Err(ProviderError::Transient(e));
                }
            }
        }
        // A sender that vanished mid-stream is a crashed adapter, not a
        // completed execution
        Err(ProviderError::Transient(
            "stream ended without a terminal event".to_string(),
        ))
    }
}

/// A backend capable of executing variants for one agent mode
#[async_trait]
pub trait ModelProvider: Send + Sync {
    /// The agent mode this provider fulfils
    fn mode(&self) -> AgentMode;

    /// Execute a request to completion.
    async fn execute(&self, request: &ProviderRequest) -> Result<ProviderResult, ProviderError>;

    /// Execute a request with streaming output.
    ///
    /// Default implementation calls `execute()` and wraps the result in a
    /// single `Completed` event, so non-streaming providers work unchanged.
    async fn execute_streaming(
        &self,
        request: &ProviderRequest,
    ) -> Result<StreamHandle, ProviderError> {
        let result = self.execute(request).await?;
        let (tx, rx) = mpsc::channel(1);
        // If the receiver is dropped before this lands, that's fine
        let _ = tx.send(StreamEvent::Completed(result)).await;
        Ok(StreamHandle::new(rx))
    }
}

/// Resolves the provider adapter for an agent mode
pub trait ProviderRouter: Send + Sync {
    /// Returns the adapter for `mode`, or an error if none is registered
    /// and no fallback exists.
    fn provider_for(&self, mode: AgentMode) -> Result<&dyn ModelProvider, ProviderError>;
}
