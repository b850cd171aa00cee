//! Streaming events for provider execution.
//!
//! [`StreamEvent`] represents individual events in a streaming provider
//! response, bridging infrastructure-level streaming to the orchestrator so
//! partial output can be forwarded to subscribers as it is produced.

use serde::{Deserialize, Serialize};

/// Final payload of a successful provider execution
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletedOutput {
    pub content: String,
    /// Provider-reported cost of the call, in account currency units
    pub cost: f64,
}

impl CompletedOutput {
    pub fn new(content: impl Into<String>, cost: f64) -> Self {
        Self {
            content: content.into(),
            cost,
        }
    }
}

/// An event in a streaming provider response.
///
/// Each variant's stream is finite: zero or more `Delta` events terminated
/// by exactly one `Completed` or `Error`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum StreamEvent {
    /// A partial output chunk from the provider
    Delta(String),
    /// The complete result (signals stream end)
    Completed(CompletedOutput),
    /// An error that occurred mid-stream (signals stream end)
    Error(String),
}

impl StreamEvent {
    /// Returns true if this event signals the end of the stream.
    pub fn is_terminal(&self) -> bool {
        matches!(self, StreamEvent::Completed(_) | StreamEvent::Error(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delta_is_not_terminal() {
        assert!(!StreamEvent::Delta("chunk".to_string()).is_terminal());
    }

    #[test]
    fn completed_and_error_are_terminal() {
        assert!(StreamEvent::Completed(CompletedOutput::new("done", 0.0)).is_terminal());
        assert!(StreamEvent::Error("oops".to_string()).is_terminal());
    }
}
