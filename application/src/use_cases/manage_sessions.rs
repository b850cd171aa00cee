//! Session management use case
//!
//! Create/get/update/delete/list sessions. Every mutation is preceded by an
//! ownership-scoped lookup; a session owned by another user is reported as
//! absent.

use crate::ports::record_store::{RecordStore, StoreError};
use crate::use_cases::dispatch_run::RunRegistry;
use crate::use_cases::state_tracker::StateTracker;
use arena_domain::{DomainError, Session, SessionDraft, SessionId, SessionUpdate, UserId};
use std::sync::Arc;
use tracing::info;

/// Errors surfaced by the session-scoped use cases
#[derive(thiserror::Error, Debug)]
pub enum SessionError {
    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Use case for managing the session lifecycle
pub struct ManageSessionsUseCase<S: RecordStore> {
    store: Arc<S>,
    tracker: Arc<StateTracker>,
    registry: Arc<RunRegistry>,
}

impl<S: RecordStore> ManageSessionsUseCase<S> {
    pub fn new(store: Arc<S>, tracker: Arc<StateTracker>, registry: Arc<RunRegistry>) -> Self {
        Self {
            store,
            tracker,
            registry,
        }
    }

    /// Create a new session owned by `owner`.
    pub async fn create(
        &self,
        owner: UserId,
        draft: SessionDraft,
    ) -> Result<Session, SessionError> {
        let session = Session::create(owner, draft);
        self.store.insert_session(session.clone()).await?;
        info!("Created session {}", session.id);
        Ok(session)
    }

    /// Fetch a session the caller owns.
    pub async fn get(&self, owner: &UserId, id: &SessionId) -> Result<Session, SessionError> {
        self.store
            .find_session(id, owner)
            .await?
            .ok_or(DomainError::NotFound("Session").into())
    }

    /// Apply a partial update to a session the caller owns.
    pub async fn update(
        &self,
        owner: &UserId,
        id: &SessionId,
        update: SessionUpdate,
    ) -> Result<Session, SessionError> {
        let _guard = self.tracker.lock_session(id).await;
        let mut session = self
            .store
            .find_session(id, owner)
            .await?
            .ok_or(DomainError::NotFound("Session"))?;
        session.apply(update);
        self.store.update_session(session.clone()).await?;
        Ok(session)
    }

    /// Delete a session, cancelling its in-flight runs and cascading to its
    /// turns, runs, and preferences.
    pub async fn delete(&self, owner: &UserId, id: &SessionId) -> Result<(), SessionError> {
        let session = self
            .store
            .find_session(id, owner)
            .await?
            .ok_or(DomainError::NotFound("Session"))?;

        self.registry.cancel_session(id);
        self.store.delete_session(&session.id).await?;
        self.tracker.forget(id);
        info!("Deleted session {}", session.id);
        Ok(())
    }

    /// List the caller's sessions, most recent activity first.
    pub async fn list(&self, owner: &UserId) -> Result<Vec<Session>, SessionError> {
        Ok(self.store.list_sessions(owner).await?)
    }
}
