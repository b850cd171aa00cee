//! Session analytics and export use case
//!
//! Read-only rollups over a session's turns and preferences: cost totals,
//! per-model win counts, and a full export of the session's records.

use crate::ports::record_store::RecordStore;
use crate::use_cases::manage_sessions::SessionError;
use arena_domain::{DomainError, ModelId, Preference, Session, SessionId, Turn, UserId};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;

/// Win tally for one model across a session's preferences
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ModelPreferenceStats {
    pub wins: u32,
    /// Fraction of the session's preferences won; 0 when none exist
    pub win_rate: f64,
}

/// Aggregate rollup for one session
#[derive(Debug, Clone, Serialize)]
pub struct SessionAnalytics {
    pub session_id: SessionId,
    pub total_turns: u32,
    pub total_cost: f64,
    pub total_preferences: u32,
    pub models_used: Vec<ModelId>,
    pub model_preference_stats: HashMap<String, ModelPreferenceStats>,
}

/// A session and all of its dependent records
#[derive(Debug, Clone, Serialize)]
pub struct SessionExport {
    pub session: Session,
    /// Ordered by turn number
    pub turns: Vec<Turn>,
    pub preferences: Vec<Preference>,
}

/// Use case for computing analytics and exporting session data
pub struct SessionAnalyticsUseCase<S: RecordStore> {
    store: Arc<S>,
}

impl<S: RecordStore> SessionAnalyticsUseCase<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Compute the rollup for a session the caller owns.
    pub async fn analytics(
        &self,
        owner: &UserId,
        session_id: &SessionId,
    ) -> Result<SessionAnalytics, SessionError> {
        let session = self
            .store
            .find_session(session_id, owner)
            .await?
            .ok_or(DomainError::NotFound("Session"))?;

        let turns = self.store.list_turns(session_id).await?;
        let preferences = self.store.list_preferences(session_id).await?;

        let total_cost = turns.iter().map(|t| t.total_cost).sum();

        let mut wins: HashMap<&str, u32> = HashMap::new();
        for pref in &preferences {
            *wins.entry(pref.preferred_model.as_str()).or_default() += 1;
        }

        // Every model the session has used gets an entry, winners or not
        let model_preference_stats = session
            .models_used
            .iter()
            .map(|model| {
                let won = wins.get(model.as_str()).copied().unwrap_or(0);
                let win_rate = if preferences.is_empty() {
                    0.0
                } else {
                    f64::from(won) / preferences.len() as f64
                };
                (
                    model.as_str().to_string(),
                    ModelPreferenceStats {
                        wins: won,
                        win_rate,
                    },
                )
            })
            .collect();

        Ok(SessionAnalytics {
            session_id: session.id.clone(),
            total_turns: turns.len() as u32,
            total_cost,
            total_preferences: preferences.len() as u32,
            models_used: session.models_used,
            model_preference_stats,
        })
    }

    /// Export a session with all of its turns and preferences.
    pub async fn export(
        &self,
        owner: &UserId,
        session_id: &SessionId,
    ) -> Result<SessionExport, SessionError> {
        let session = self
            .store
            .find_session(session_id, owner)
            .await?
            .ok_or(DomainError::NotFound("Session"))?;

        let turns = self.store.list_turns(session_id).await?;
        let preferences = self.store.list_preferences(session_id).await?;

        Ok(SessionExport {
            session,
            turns,
            preferences,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::use_cases::test_support::MemoryStore;
    use arena_domain::{PreferenceDraft, SessionDraft, TurnDraft};

    async fn seed(store: &MemoryStore) -> (UserId, Session) {
        let owner = UserId::new("user-1");
        let session = Session::create(owner.clone(), SessionDraft::new("s"));
        store.insert_session(session.clone()).await.unwrap();
        (owner, session)
    }

    #[tokio::test]
    async fn test_analytics_tallies_wins_per_model() {
        let store = MemoryStore::new();
        let (owner, mut session) = seed(&store).await;
        session.record_models(&[ModelId::new("claude-code"), ModelId::new("random-model")]);
        store.update_session(session.clone()).await.unwrap();

        let turn = Turn::create(session.id.clone(), owner.clone(), 1, TurnDraft::new("t"));
        store.insert_turn(turn.clone()).await.unwrap();

        for preferred in ["claude-code", "claude-code", "random-model"] {
            let pref = Preference::create(
                session.id.clone(),
                turn.id.clone(),
                owner.clone(),
                PreferenceDraft::new(preferred),
            );
            store.insert_preference(pref).await.unwrap();
        }

        let uc = SessionAnalyticsUseCase::new(Arc::new(store));
        let analytics = uc.analytics(&owner, &session.id).await.unwrap();

        assert_eq!(analytics.total_preferences, 3);
        let claude = &analytics.model_preference_stats["claude-code"];
        assert_eq!(claude.wins, 2);
        assert!((claude.win_rate - 2.0 / 3.0).abs() < f64::EPSILON);
        let other = &analytics.model_preference_stats["random-model"];
        assert_eq!(other.wins, 1);
    }

    #[tokio::test]
    async fn test_analytics_with_no_preferences_has_zero_rates() {
        let store = MemoryStore::new();
        let (owner, mut session) = seed(&store).await;
        session.record_models(&[ModelId::new("claude-code")]);
        store.update_session(session.clone()).await.unwrap();

        let uc = SessionAnalyticsUseCase::new(Arc::new(store));
        let analytics = uc.analytics(&owner, &session.id).await.unwrap();

        assert_eq!(analytics.total_preferences, 0);
        assert_eq!(analytics.model_preference_stats["claude-code"].win_rate, 0.0);
    }

    #[tokio::test]
    async fn test_analytics_sums_turn_costs() {
        let store = MemoryStore::new();
        let (owner, session) = seed(&store).await;

        for (n, cost) in [(1, 0.25), (2, 0.50)] {
            let mut turn = Turn::create(session.id.clone(), owner.clone(), n, TurnDraft::new("t"));
            turn.settle(true, cost);
            store.insert_turn(turn).await.unwrap();
        }

        let uc = SessionAnalyticsUseCase::new(Arc::new(store));
        let analytics = uc.analytics(&owner, &session.id).await.unwrap();

        assert_eq!(analytics.total_turns, 2);
        assert!((analytics.total_cost - 0.75).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn test_export_orders_turns_by_number() {
        let store = MemoryStore::new();
        let (owner, session) = seed(&store).await;

        // Insert out of order; export must come back sorted
        for n in [3, 1, 2] {
            let turn = Turn::create(session.id.clone(), owner.clone(), n, TurnDraft::new("t"));
            store.insert_turn(turn).await.unwrap();
        }

        let uc = SessionAnalyticsUseCase::new(Arc::new(store));
        let export = uc.export(&owner, &session.id).await.unwrap();

        let numbers: Vec<u32> = export.turns.iter().map(|t| t.turn_number).collect();
        assert_eq!(numbers, vec![1, 2, 3]);
        assert_eq!(export.session.id, session.id);
    }

    #[tokio::test]
    async fn test_analytics_hidden_from_other_users() {
        let store = MemoryStore::new();
        let (_, session) = seed(&store).await;

        let uc = SessionAnalyticsUseCase::new(Arc::new(store));
        let err = uc
            .analytics(&UserId::new("intruder"), &session.id)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            SessionError::Domain(DomainError::NotFound("Session"))
        ));
    }
}
