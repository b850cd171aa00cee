//! Preference domain entities
//!
//! A preference is a user's judgment comparing results across models for a
//! turn. Preferences are created once per comparison event and never
//! mutated; a turn may accumulate many of them.

use crate::core::ids::{PreferenceId, SessionId, TurnId, UserId};
use crate::core::model::ModelId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A recorded user judgment comparing model results for a turn (Entity)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Preference {
    pub id: PreferenceId,
    pub user_id: UserId,
    pub session_id: SessionId,
    pub turn_id: TurnId,
    pub preferred_model: ModelId,
    pub preferred_response_id: Option<String>,
    pub compared_models: Vec<ModelId>,
    /// Per-model quality scores assigned by the user
    pub quality_scores: HashMap<String, f64>,
    pub feedback_text: Option<String>,
    pub confidence_score: Option<f64>,
    pub preference_type: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Preference {
    pub fn create(
        session_id: SessionId,
        turn_id: TurnId,
        owner: UserId,
        draft: PreferenceDraft,
    ) -> Self {
        Self {
            id: PreferenceId::generate(),
            user_id: owner,
            session_id,
            turn_id,
            preferred_model: draft.preferred_model,
            preferred_response_id: draft.preferred_response_id,
            compared_models: draft.compared_models,
            quality_scores: draft.quality_scores,
            feedback_text: draft.feedback_text,
            confidence_score: draft.confidence_score,
            preference_type: draft.preference_type,
            created_at: Utc::now(),
        }
    }
}

/// Fields supplied when recording a preference
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PreferenceDraft {
    pub preferred_model: ModelId,
    pub preferred_response_id: Option<String>,
    #[serde(default)]
    pub compared_models: Vec<ModelId>,
    #[serde(default)]
    pub quality_scores: HashMap<String, f64>,
    pub feedback_text: Option<String>,
    pub confidence_score: Option<f64>,
    pub preference_type: Option<String>,
}

impl PreferenceDraft {
    pub fn new(preferred_model: impl Into<ModelId>) -> Self {
        Self {
            preferred_model: preferred_model.into(),
            preferred_response_id: None,
            compared_models: Vec::new(),
            quality_scores: HashMap::new(),
            feedback_text: None,
            confidence_score: None,
            preference_type: None,
        }
    }

    pub fn comparing(mut self, models: Vec<ModelId>) -> Self {
        self.compared_models = models;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_preference_records_comparison() {
        let draft = PreferenceDraft::new("claude-code")
            .comparing(vec![ModelId::new("claude-code"), ModelId::new("random-model")]);
        let pref = Preference::create(
            SessionId::generate(),
            TurnId::generate(),
            UserId::new("u"),
            draft,
        );

        assert_eq!(pref.preferred_model.as_str(), "claude-code");
        assert_eq!(pref.compared_models.len(), 2);
    }
}
