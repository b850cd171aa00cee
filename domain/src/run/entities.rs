//! Run domain entities
//!
//! A run is one dispatched execution attempt of a turn's prompt against one
//! or more model variants. The run status machine is strictly forward:
//! `Pending → Running → Completed | Failed | Cancelled`, and terminal states
//! are immutable.

use crate::core::ids::{RunId, SessionId, TurnId, UserId};
use crate::core::model::ModelId;
use crate::providers::AgentMode;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Status of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    Pending,
    Running,
    Completed,
    Failed,
    Cancelled,
}

impl RunStatus {
    /// Position in the state machine; transitions only move to higher ranks.
    fn rank(self) -> u8 {
        match self {
            RunStatus::Pending => 0,
            RunStatus::Running => 1,
            RunStatus::Completed | RunStatus::Failed | RunStatus::Cancelled => 2,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.rank() == 2
    }

    /// Monotone merge: returns `next` only if it moves the machine forward,
    /// otherwise keeps `self`. Safe against out-of-order sibling updates.
    pub fn advance(self, next: RunStatus) -> RunStatus {
        if next.rank() > self.rank() { next } else { self }
    }

    /// Aggregate terminal status over the per-variant outcomes.
    ///
    /// Partial success is success at the run level: the run is `Failed`
    /// only when every variant failed. A requested cancellation trumps the
    /// outcome tally.
    pub fn aggregate(outcomes: &[VariantOutcome], cancel_requested: bool) -> RunStatus {
        if cancel_requested {
            return RunStatus::Cancelled;
        }
        if !outcomes.is_empty() && outcomes.iter().all(|o| !o.success) {
            return RunStatus::Failed;
        }
        RunStatus::Completed
    }

    pub fn as_str(&self) -> &str {
        match self {
            RunStatus::Pending => "pending",
            RunStatus::Running => "running",
            RunStatus::Completed => "completed",
            RunStatus::Failed => "failed",
            RunStatus::Cancelled => "cancelled",
        }
    }
}

impl std::fmt::Display for RunStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A single model variant requested by the caller
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VariantRequest {
    /// Caller-supplied variant identifier
    pub id: String,
    pub model: ModelId,
    #[serde(default)]
    pub parameters: serde_json::Value,
}

impl VariantRequest {
    pub fn new(id: impl Into<String>, model: impl Into<ModelId>) -> Self {
        Self {
            id: id.into(),
            model: model.into(),
            parameters: serde_json::Value::Null,
        }
    }
}

/// A variant with its execution strategy resolved
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VariantConfig {
    pub variant_id: String,
    pub model: ModelId,
    pub parameters: serde_json::Value,
    pub agent_mode: AgentMode,
}

impl VariantConfig {
    /// Resolve a request into a config using the turn's context hint.
    pub fn resolve(request: VariantRequest, context: &str) -> Self {
        let agent_mode = AgentMode::select(&request.model, context);
        Self {
            variant_id: request.id,
            model: request.model,
            parameters: request.parameters,
            agent_mode,
        }
    }
}

/// Per-variant execution strategy embedded in a run record
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AgentConfig {
    pub variants: Vec<VariantConfig>,
}

impl AgentConfig {
    pub fn new(variants: Vec<VariantConfig>) -> Self {
        Self { variants }
    }

    /// Mode of the first variant; used for coarse run-level reporting.
    pub fn primary_mode(&self) -> AgentMode {
        self.variants
            .first()
            .map(|v| v.agent_mode)
            .unwrap_or(AgentMode::Litellm)
    }

    pub fn models(&self) -> Vec<ModelId> {
        self.variants.iter().map(|v| v.model.clone()).collect()
    }
}

/// Final outcome of one variant's execution
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VariantOutcome {
    pub variant_id: String,
    pub model: ModelId,
    pub success: bool,
    pub content: Option<String>,
    pub error: Option<String>,
    pub cost: f64,
    /// Provider attempts consumed, including retries
    pub attempts: u32,
}

impl VariantOutcome {
    pub fn success(
        variant_id: impl Into<String>,
        model: ModelId,
        content: impl Into<String>,
        cost: f64,
        attempts: u32,
    ) -> Self {
        Self {
            variant_id: variant_id.into(),
            model,
            success: true,
            content: Some(content.into()),
            error: None,
            cost,
            attempts,
        }
    }

    pub fn failure(
        variant_id: impl Into<String>,
        model: ModelId,
        error: impl Into<String>,
        attempts: u32,
    ) -> Self {
        Self {
            variant_id: variant_id.into(),
            model,
            success: false,
            content: None,
            error: Some(error.into()),
            cost: 0.0,
            attempts,
        }
    }

    pub fn cancelled(variant_id: impl Into<String>, model: ModelId) -> Self {
        Self::failure(variant_id, model, "cancelled before completion", 0)
    }
}

/// One dispatched execution attempt covering one or more variants (Entity)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Run {
    pub id: RunId,
    pub session_id: SessionId,
    /// Must reference a turn belonging to `session_id`
    pub turn_id: TurnId,
    pub user_id: UserId,
    pub prompt: String,
    /// Count of model variants covered by this run
    pub variations: u32,
    pub agent_config: AgentConfig,
    pub status: RunStatus,
    /// Per-variant detail, populated when the run reaches a terminal state
    #[serde(default)]
    pub outcomes: Vec<VariantOutcome>,
    pub created_at: DateTime<Utc>,
}

impl Run {
    pub fn create(
        session_id: SessionId,
        turn_id: TurnId,
        owner: UserId,
        prompt: impl Into<String>,
        agent_config: AgentConfig,
    ) -> Self {
        let variations = agent_config.variants.len() as u32;
        Self {
            id: RunId::generate(),
            session_id,
            turn_id,
            user_id: owner,
            prompt: prompt.into(),
            variations,
            agent_config,
            status: RunStatus::Pending,
            outcomes: Vec::new(),
            created_at: Utc::now(),
        }
    }

    /// Move the status forward; backwards transitions are ignored.
    pub fn advance_status(&mut self, next: RunStatus) {
        self.status = self.status.advance(next);
    }

    /// Sum of variant costs; zero until the run settles.
    pub fn total_cost(&self) -> f64 {
        self.outcomes.iter().map(|o| o.cost).sum()
    }

    /// Whether at least one variant produced a usable result.
    pub fn any_success(&self) -> bool {
        self.outcomes.iter().any(|o| o.success)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn outcome(id: &str, success: bool) -> VariantOutcome {
        if success {
            VariantOutcome::success(id, ModelId::new("m"), "ok", 0.1, 1)
        } else {
            VariantOutcome::failure(id, ModelId::new("m"), "boom", 3)
        }
    }

    #[test]
    fn test_status_advances_forward_only() {
        let status = RunStatus::Pending.advance(RunStatus::Running);
        assert_eq!(status, RunStatus::Running);

        // A late "running" update must not reopen a terminal run
        let status = RunStatus::Completed.advance(RunStatus::Running);
        assert_eq!(status, RunStatus::Completed);

        // Terminal states are immutable
        let status = RunStatus::Failed.advance(RunStatus::Completed);
        assert_eq!(status, RunStatus::Failed);
    }

    #[test]
    fn test_partial_failure_is_success_at_run_level() {
        let outcomes = vec![outcome("a", true), outcome("b", false), outcome("c", false)];
        assert_eq!(RunStatus::aggregate(&outcomes, false), RunStatus::Completed);
    }

    #[test]
    fn test_all_variants_failed_fails_the_run() {
        let outcomes = vec![outcome("a", false), outcome("b", false), outcome("c", false)];
        assert_eq!(RunStatus::aggregate(&outcomes, false), RunStatus::Failed);
    }

    #[test]
    fn test_cancellation_trumps_outcomes() {
        let outcomes = vec![outcome("a", true)];
        assert_eq!(RunStatus::aggregate(&outcomes, true), RunStatus::Cancelled);
    }

    #[test]
    fn test_run_starts_pending_with_variant_count() {
        let config = AgentConfig::new(vec![
            VariantConfig::resolve(VariantRequest::new("v1", "claude-code"), ""),
            VariantConfig::resolve(VariantRequest::new("v2", "random-model"), ""),
        ]);
        let run = Run::create(
            SessionId::generate(),
            TurnId::generate(),
            UserId::new("u"),
            "prompt",
            config,
        );

        assert_eq!(run.status, RunStatus::Pending);
        assert_eq!(run.variations, 2);
        assert_eq!(run.agent_config.primary_mode(), AgentMode::ClaudeCli);
    }

    #[test]
    fn test_total_cost_sums_outcomes() {
        let mut run = Run::create(
            SessionId::generate(),
            TurnId::generate(),
            UserId::new("u"),
            "prompt",
            AgentConfig::default(),
        );
        run.outcomes = vec![outcome("a", true), outcome("b", true)];
        assert!((run.total_cost() - 0.2).abs() < f64::EPSILON);
    }
}
