//! Session domain entities
//!
//! A session is the conversation container: it owns turns, runs, and
//! preferences, and carries the aggregate counters every dispatch event
//! keeps consistent.
//!
//! # Invariants
//!
//! - `total_turns` equals the count of turns ever created for the session.
//!   It is monotonic; run failures never decrement it.
//! - `last_activity_at` is refreshed by turn, run, and preference creation.
//!   It only moves forward.

use crate::core::ids::{SessionId, UserId};
use crate::core::model::ModelId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A multi-turn conversation container owned by one user (Entity)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub id: SessionId,
    pub user_id: UserId,
    pub title: String,
    pub description: Option<String>,
    /// Every model id that has ever participated in this session
    pub models_used: Vec<ModelId>,
    /// Count of turns ever created; monotonic
    pub total_turns: u32,
    pub is_active: bool,
    pub is_archived: bool,
    pub last_activity_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Session {
    /// Create a new session for the given owner.
    pub fn create(owner: UserId, draft: SessionDraft) -> Self {
        let now = Utc::now();
        Self {
            id: SessionId::generate(),
            user_id: owner,
            title: draft.title,
            description: draft.description,
            models_used: draft.models_used,
            total_turns: 0,
            is_active: true,
            is_archived: false,
            last_activity_at: now,
            created_at: now,
            updated_at: now,
        }
    }

    /// Refresh the activity timestamps. Timestamps never move backwards,
    /// so concurrent out-of-order refreshes are safe to apply in any order.
    pub fn touch(&mut self) {
        let now = Utc::now();
        self.last_activity_at = self.last_activity_at.max(now);
        self.updated_at = self.updated_at.max(now);
    }

    /// Record a newly created turn: bump the counter, merge the models the
    /// turn requested, and refresh activity.
    pub fn record_turn(&mut self, models: &[ModelId]) {
        self.total_turns += 1;
        self.record_models(models);
        self.touch();
    }

    /// Merge model ids into `models_used`, keeping first-seen order.
    pub fn record_models(&mut self, models: &[ModelId]) {
        for model in models {
            if !self.models_used.contains(model) {
                self.models_used.push(model.clone());
            }
        }
    }

    /// Apply a partial update from the owner.
    pub fn apply(&mut self, update: SessionUpdate) {
        if let Some(title) = update.title {
            self.title = title;
        }
        if let Some(description) = update.description {
            self.description = Some(description);
        }
        if let Some(is_active) = update.is_active {
            self.is_active = is_active;
        }
        if let Some(is_archived) = update.is_archived {
            self.is_archived = is_archived;
        }
        self.updated_at = self.updated_at.max(Utc::now());
    }
}

/// Fields supplied when creating a session
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SessionDraft {
    pub title: String,
    pub description: Option<String>,
    #[serde(default)]
    pub models_used: Vec<ModelId>,
}

impl SessionDraft {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Default::default()
        }
    }
}

/// Partial update to a session; `None` fields are left untouched
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SessionUpdate {
    pub title: Option<String>,
    pub description: Option<String>,
    pub is_active: Option<bool>,
    pub is_archived: Option<bool>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session() -> Session {
        Session::create(UserId::new("user-1"), SessionDraft::new("demo"))
    }

    #[test]
    fn test_record_turn_increments_counter_and_merges_models() {
        let mut s = session();
        s.record_turn(&[ModelId::new("claude-code"), ModelId::new("random-model")]);
        s.record_turn(&[ModelId::new("claude-code")]);

        assert_eq!(s.total_turns, 2);
        assert_eq!(s.models_used.len(), 2);
        assert_eq!(s.models_used[0].as_str(), "claude-code");
    }

    #[test]
    fn test_touch_never_moves_backwards() {
        let mut s = session();
        let before = s.last_activity_at;
        s.touch();
        assert!(s.last_activity_at >= before);

        // Simulate a stale clock reading having been applied first
        s.last_activity_at = Utc::now() + chrono::Duration::seconds(60);
        let future = s.last_activity_at;
        s.touch();
        assert_eq!(s.last_activity_at, future);
    }

    #[test]
    fn test_apply_partial_update() {
        let mut s = session();
        s.apply(SessionUpdate {
            is_archived: Some(true),
            ..Default::default()
        });

        assert!(s.is_archived);
        assert_eq!(s.title, "demo");
        assert!(s.is_active);
    }
}
