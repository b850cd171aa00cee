//! Turn domain entities

use crate::core::ids::{SessionId, TurnId, UserId};
use crate::core::model::ModelId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Status of a turn
///
/// The usual path is `Pending → Streaming → Completed | Failed`. Dispatching
/// a new prompt against an already-terminal turn deliberately moves it back
/// to `Streaming`: it signals to downstream readers that new results are
/// expected for this turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TurnStatus {
    Pending,
    Streaming,
    Completed,
    Failed,
}

impl TurnStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, TurnStatus::Completed | TurnStatus::Failed)
    }

    pub fn as_str(&self) -> &str {
        match self {
            TurnStatus::Pending => "pending",
            TurnStatus::Streaming => "streaming",
            TurnStatus::Completed => "completed",
            TurnStatus::Failed => "failed",
        }
    }
}

/// One numbered prompt exchange within a session (Entity)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Turn {
    pub id: TurnId,
    pub session_id: SessionId,
    pub user_id: UserId,
    /// 1-based, strictly increasing within a session. Numbers are not
    /// reused, so gaps are possible if deletion is ever supported.
    pub turn_number: u32,
    pub prompt: String,
    pub context: Option<String>,
    pub models_requested: Vec<ModelId>,
    pub status: TurnStatus,
    /// Additive rollup of variant costs from completed runs
    pub total_cost: f64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Turn {
    /// Create a turn with its assigned sequence number.
    pub fn create(session_id: SessionId, owner: UserId, turn_number: u32, draft: TurnDraft) -> Self {
        let now = Utc::now();
        Self {
            id: TurnId::generate(),
            session_id,
            user_id: owner,
            turn_number,
            prompt: draft.prompt,
            context: draft.context,
            models_requested: draft.models_requested,
            status: TurnStatus::Pending,
            total_cost: 0.0,
            created_at: now,
            updated_at: now,
        }
    }

    /// Mark that fresh results are being produced for this turn.
    pub fn begin_streaming(&mut self) {
        self.status = TurnStatus::Streaming;
        self.updated_at = self.updated_at.max(Utc::now());
    }

    /// Settle the turn once a run reaches a terminal state.
    ///
    /// Cost accumulation is additive, so concurrent run completions merge
    /// correctly in any order. A successful run always wins over a failed
    /// sibling: `Completed` is never downgraded to `Failed`.
    pub fn settle(&mut self, run_succeeded: bool, cost: f64) {
        self.total_cost += cost;
        self.status = match (self.status, run_succeeded) {
            (TurnStatus::Completed, _) => TurnStatus::Completed,
            (_, true) => TurnStatus::Completed,
            (_, false) => TurnStatus::Failed,
        };
        self.updated_at = self.updated_at.max(Utc::now());
    }
}

/// Fields supplied when creating a turn
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TurnDraft {
    pub prompt: String,
    pub context: Option<String>,
    #[serde(default)]
    pub models_requested: Vec<ModelId>,
}

impl TurnDraft {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn turn() -> Turn {
        Turn::create(
            SessionId::generate(),
            UserId::new("user-1"),
            1,
            TurnDraft::new("write a parser"),
        )
    }

    #[test]
    fn test_new_turn_is_pending() {
        let t = turn();
        assert_eq!(t.status, TurnStatus::Pending);
        assert_eq!(t.total_cost, 0.0);
    }

    #[test]
    fn test_settle_accumulates_cost() {
        let mut t = turn();
        t.settle(true, 0.25);
        t.settle(false, 0.10);
        assert!((t.total_cost - 0.35).abs() < f64::EPSILON);
    }

    #[test]
    fn test_completed_is_not_downgraded_by_failed_sibling() {
        let mut t = turn();
        t.settle(true, 0.0);
        t.settle(false, 0.0);
        assert_eq!(t.status, TurnStatus::Completed);
    }

    #[test]
    fn test_redispatch_reopens_terminal_turn() {
        let mut t = turn();
        t.settle(false, 0.0);
        assert_eq!(t.status, TurnStatus::Failed);
        t.begin_streaming();
        assert_eq!(t.status, TurnStatus::Streaming);
    }
}
