//! Turn creation and lookup use case
//!
//! Turn numbers are assigned as (count of existing turns) + 1 and are
//! strictly increasing within a session. The number assignment, the
//! `total_turns` increment, and the activity refresh all happen under the
//! session's write lock, so concurrent turn creations cannot race.

use crate::ports::record_store::RecordStore;
use crate::use_cases::manage_sessions::SessionError;
use crate::use_cases::state_tracker::StateTracker;
use arena_domain::{DomainError, SessionId, Turn, TurnDraft, TurnId, UserId};
use std::sync::Arc;
use tracing::debug;

/// Use case for creating and reading turns within a session
pub struct RecordTurnUseCase<S: RecordStore> {
    store: Arc<S>,
    tracker: Arc<StateTracker>,
}

impl<S: RecordStore> RecordTurnUseCase<S> {
    pub fn new(store: Arc<S>, tracker: Arc<StateTracker>) -> Self {
        Self { store, tracker }
    }

    /// Create the next turn in a session the caller owns.
    pub async fn create(
        &self,
        owner: &UserId,
        session_id: &SessionId,
        draft: TurnDraft,
    ) -> Result<Turn, SessionError> {
        let _guard = self.tracker.lock_session(session_id).await;

        let mut session = self
            .store
            .find_session(session_id, owner)
            .await?
            .ok_or(DomainError::NotFound("Session"))?;

        let turn_number = self.store.count_turns(session_id).await? + 1;
        let models = draft.models_requested.clone();
        let turn = Turn::create(session.id.clone(), owner.clone(), turn_number, draft);

        self.store.insert_turn(turn.clone()).await?;

        // Same transaction boundary as the turn itself: counter, models,
        // and activity stamp move together.
        session.record_turn(&models);
        self.store.update_session(session).await?;

        debug!("Created turn {} (#{})", turn.id, turn.turn_number);
        Ok(turn)
    }

    /// Fetch one turn of a session the caller owns.
    pub async fn get(
        &self,
        owner: &UserId,
        session_id: &SessionId,
        turn_id: &TurnId,
    ) -> Result<Turn, SessionError> {
        let _session = self
            .store
            .find_session(session_id, owner)
            .await?
            .ok_or(DomainError::NotFound("Session"))?;

        self.store
            .find_turn(session_id, turn_id)
            .await?
            .ok_or(DomainError::NotFound("Turn").into())
    }

    /// List a session's turns ordered by turn number.
    pub async fn list(
        &self,
        owner: &UserId,
        session_id: &SessionId,
    ) -> Result<Vec<Turn>, SessionError> {
        let _session = self
            .store
            .find_session(session_id, owner)
            .await?
            .ok_or(DomainError::NotFound("Session"))?;

        Ok(self.store.list_turns(session_id).await?)
    }
}
