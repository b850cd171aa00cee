//! Streaming gateway port
//!
//! Each run exposes two logical channels identified by its run id: a
//! primary channel carrying progress/result events and a debug channel
//! carrying diagnostics. The orchestrator publishes; fan-out to subscribers
//! is the gateway adapter's concern.

use arena_domain::{AgentMode, ModelId, RunId, RunStatus};
use serde::{Deserialize, Serialize};

/// Logical channel of a run's event stream
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StreamChannel {
    Primary,
    Debug,
}

/// An event published onto a run's stream, tagged with the run id by the
/// channel it travels on.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RunEvent {
    RunStarted {
        run_id: RunId,
        variations: u32,
    },
    VariantStarted {
        variant_id: String,
        model: ModelId,
        agent_mode: AgentMode,
    },
    VariantDelta {
        variant_id: String,
        content: String,
    },
    VariantCompleted {
        variant_id: String,
        model: ModelId,
        content: String,
        cost: f64,
    },
    VariantFailed {
        variant_id: String,
        model: ModelId,
        error: String,
        attempts: u32,
    },
    VariantCancelled {
        variant_id: String,
    },
    RunCompleted {
        run_id: RunId,
        status: RunStatus,
        total_cost: f64,
    },
    /// Free-form diagnostic line (debug channel only)
    Diagnostic {
        message: String,
    },
}

impl RunEvent {
    /// Returns true if this event ends the run's primary stream.
    pub fn is_terminal(&self) -> bool {
        matches!(self, RunEvent::RunCompleted { .. })
    }
}

/// Gateway the orchestrator publishes run events to
///
/// Publishing is fire-and-forget: a run with no subscribers must not block
/// or fail the orchestrator.
pub trait StreamGateway: Send + Sync {
    fn publish(&self, run_id: &RunId, channel: StreamChannel, event: RunEvent);

    /// Address a client subscribes to for the primary channel.
    fn primary_address(&self, run_id: &RunId) -> String {
        format!("runs/{run_id}")
    }

    /// Address a client subscribes to for the debug channel.
    fn debug_address(&self, run_id: &RunId) -> String {
        format!("runs/{run_id}/debug")
    }
}

/// No-op gateway for when streaming is not needed
pub struct NoStream;

impl StreamGateway for NoStream {
    fn publish(&self, _run_id: &RunId, _channel: StreamChannel, _event: RunEvent) {}
}
