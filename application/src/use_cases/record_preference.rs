//! Preference recording use case
//!
//! Preferences are immutable once created; many may exist per turn.
//! Creation refreshes the session's activity stamp.

use crate::ports::record_store::RecordStore;
use crate::use_cases::manage_sessions::SessionError;
use crate::use_cases::state_tracker::StateTracker;
use arena_domain::{DomainError, Preference, PreferenceDraft, SessionId, TurnId, UserId};
use std::sync::Arc;
use tracing::debug;

/// Use case for recording and listing user preferences
pub struct RecordPreferenceUseCase<S: RecordStore> {
    store: Arc<S>,
    tracker: Arc<StateTracker>,
}

impl<S: RecordStore> RecordPreferenceUseCase<S> {
    pub fn new(store: Arc<S>, tracker: Arc<StateTracker>) -> Self {
        Self { store, tracker }
    }

    /// Record a preference for a turn the caller owns.
    pub async fn create(
        &self,
        owner: &UserId,
        session_id: &SessionId,
        turn_id: &TurnId,
        draft: PreferenceDraft,
    ) -> Result<Preference, SessionError> {
        let _guard = self.tracker.lock_session(session_id).await;

        let mut session = self
            .store
            .find_session(session_id, owner)
            .await?
            .ok_or(DomainError::NotFound("Session"))?;

        let turn = self
            .store
            .find_turn(session_id, turn_id)
            .await?
            .ok_or(DomainError::NotFound("Turn"))?;

        let preference =
            Preference::create(session.id.clone(), turn.id.clone(), owner.clone(), draft);
        self.store.insert_preference(preference.clone()).await?;

        session.touch();
        self.store.update_session(session).await?;

        debug!("Recorded preference {} for turn {}", preference.id, turn.id);
        Ok(preference)
    }

    /// List a session's preferences ordered by creation time.
    pub async fn list(
        &self,
        owner: &UserId,
        session_id: &SessionId,
    ) -> Result<Vec<Preference>, SessionError> {
        let _session = self
            .store
            .find_session(session_id, owner)
            .await?
            .ok_or(DomainError::NotFound("Session"))?;

        Ok(self.store.list_preferences(session_id).await?)
    }
}
