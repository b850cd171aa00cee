//! Record store port
//!
//! Defines the persistence contract for the Session / Turn / Run /
//! Preference aggregates. The core consumes this interface but does not
//! implement durable storage; the in-memory adapter in the infrastructure
//! layer exists for wiring and tests.
//!
//! Ownership-scoped lookups (`find_session(id, owner)`) return `Ok(None)`
//! both when the entity is absent and when it belongs to another user, so
//! existence is never leaked across owners.

use arena_domain::{Preference, Run, RunId, Session, SessionId, Turn, TurnId, UserId};
use async_trait::async_trait;
use thiserror::Error;

/// Errors that can occur in the persistence layer
#[derive(Error, Debug)]
pub enum StoreError {
    /// The persistence layer is unreachable or failed mid-operation.
    /// Synchronous callers surface this as a server error; background
    /// completion updates retry with backoff instead.
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    #[error("Conflicting write: {0}")]
    Conflict(String),
}

/// Persistence contract for the session aggregates
#[async_trait]
pub trait RecordStore: Send + Sync {
    // ==================== Sessions ====================

    async fn insert_session(&self, session: Session) -> Result<(), StoreError>;

    /// Ownership-scoped lookup; `None` when absent or owned by someone else.
    async fn find_session(
        &self,
        id: &SessionId,
        owner: &UserId,
    ) -> Result<Option<Session>, StoreError>;

    async fn update_session(&self, session: Session) -> Result<(), StoreError>;

    /// Delete a session, cascading to its turns, runs, and preferences.
    async fn delete_session(&self, id: &SessionId) -> Result<(), StoreError>;

    /// Sessions for one owner, most recent activity first.
    async fn list_sessions(&self, owner: &UserId) -> Result<Vec<Session>, StoreError>;

    // ==================== Turns ====================

    async fn insert_turn(&self, turn: Turn) -> Result<(), StoreError>;

    async fn find_turn(
        &self,
        session_id: &SessionId,
        turn_id: &TurnId,
    ) -> Result<Option<Turn>, StoreError>;

    async fn update_turn(&self, turn: Turn) -> Result<(), StoreError>;

    /// Turns of a session ordered by `turn_number` ascending.
    async fn list_turns(&self, session_id: &SessionId) -> Result<Vec<Turn>, StoreError>;

    async fn count_turns(&self, session_id: &SessionId) -> Result<u32, StoreError>;

    // ==================== Runs ====================

    async fn insert_run(&self, run: Run) -> Result<(), StoreError>;

    async fn find_run(&self, id: &RunId) -> Result<Option<Run>, StoreError>;

    async fn update_run(&self, run: Run) -> Result<(), StoreError>;

    /// Runs of a turn ordered by creation time ascending.
    async fn list_runs(
        &self,
        session_id: &SessionId,
        turn_id: &TurnId,
    ) -> Result<Vec<Run>, StoreError>;

    // ==================== Preferences ====================

    async fn insert_preference(&self, preference: Preference) -> Result<(), StoreError>;

    /// Preferences of a session ordered by creation time ascending.
    async fn list_preferences(
        &self,
        session_id: &SessionId,
    ) -> Result<Vec<Preference>, StoreError>;
}
