//! In-memory record store
//!
//! Process-local adapter for the persistence port. Each aggregate lives in
//! its own `RwLock`ed table; deletion of a session cascades to its turns,
//! runs, and preferences in one pass.

use arena_application::ports::record_store::{RecordStore, StoreError};
use arena_domain::{Preference, Run, RunId, Session, SessionId, Turn, TurnId, UserId};
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

/// Process-local record store backed by hash maps
#[derive(Default)]
pub struct InMemoryRecordStore {
    sessions: RwLock<HashMap<SessionId, Session>>,
    turns: RwLock<HashMap<TurnId, Turn>>,
    runs: RwLock<HashMap<RunId, Run>>,
    preferences: RwLock<Vec<Preference>>,
}

impl InMemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RecordStore for InMemoryRecordStore {
    async fn insert_session(&self, session: Session) -> Result<(), StoreError> {
        let mut sessions = self.sessions.write().await;
        if sessions.contains_key(&session.id) {
            return Err(StoreError::Conflict(format!(
                "session {} already exists",
                session.id
            )));
        }
        sessions.insert(session.id.clone(), session);
        Ok(())
    }

    async fn find_session(
        &self,
        id: &SessionId,
        owner: &UserId,
    ) -> Result<Option<Session>, StoreError> {
        // Another owner's session is indistinguishable from a missing one
        Ok(self
            .sessions
            .read()
            .await
            .get(id)
            .filter(|s| &s.user_id == owner)
            .cloned())
    }

    async fn update_session(&self, session: Session) -> Result<(), StoreError> {
        self.sessions
            .write()
            .await
            .insert(session.id.clone(), session);
        Ok(())
    }

    async fn delete_session(&self, id: &SessionId) -> Result<(), StoreError> {
        self.sessions.write().await.remove(id);
        self.turns.write().await.retain(|_, t| &t.session_id != id);
        self.runs.write().await.retain(|_, r| &r.session_id != id);
        self.preferences
            .write()
            .await
            .retain(|p| &p.session_id != id);
        Ok(())
    }

    async fn list_sessions(&self, owner: &UserId) -> Result<Vec<Session>, StoreError> {
        let mut sessions: Vec<Session> = self
            .sessions
            .read()
            .await
            .values()
            .filter(|s| &s.user_id == owner)
            .cloned()
            .collect();
        sessions.sort_by(|a, b| b.last_activity_at.cmp(&a.last_activity_at));
        Ok(sessions)
    }

    async fn insert_turn(&self, turn: Turn) -> Result<(), StoreError> {
        self.turns.write().await.insert(turn.id.clone(), turn);
        Ok(())
    }

    async fn find_turn(
        &self,
        session_id: &SessionId,
        turn_id: &TurnId,
    ) -> Result<Option<Turn>, StoreError> {
        Ok(self
            .turns
            .read()
            .await
            .get(turn_id)
            .filter(|t| &t.session_id == session_id)
            .cloned())
    }

    async fn update_turn(&self, turn: Turn) -> Result<(), StoreError> {
        self.turns.write().await.insert(turn.id.clone(), turn);
        Ok(())
    }

    async fn list_turns(&self, session_id: &SessionId) -> Result<Vec<Turn>, StoreError> {
        let mut turns: Vec<Turn> = self
            .turns
            .read()
            .await
            .values()
            .filter(|t| &t.session_id == session_id)
            .cloned()
            .collect();
        turns.sort_by_key(|t| t.turn_number);
        Ok(turns)
    }

    async fn count_turns(&self, session_id: &SessionId) -> Result<u32, StoreError> {
        Ok(self
            .turns
            .read()
            .await
            .values()
            .filter(|t| &t.session_id == session_id)
            .count() as u32)
    }

    async fn insert_run(&self, run: Run) -> Result<(), StoreError> {
        self.runs.write().await.insert(run.id.clone(), run);
        Ok(())
    }

    async fn find_run(&self, id: &RunId) -> Result<Option<Run>, StoreError> {
        Ok(self.runs.read().await.get(id).cloned())
    }

    async fn update_run(&self, run: Run) -> Result<(), StoreError> {
        self.runs.write().await.insert(run.id.clone(), run);
        Ok(())
    }

    async fn list_runs(
        &self,
        session_id: &SessionId,
        turn_id: &TurnId,
    ) -> Result<Vec<Run>, StoreError> {
        let mut runs: Vec<Run> = self
            .runs
            .read()
            .await
            .values()
            .filter(|r| &r.session_id == session_id && &r.turn_id == turn_id)
            .cloned()
            .collect();
        runs.sort_by_key(|r| r.created_at);
        Ok(runs)
    }

    async fn insert_preference(&self, preference: Preference) -> Result<(), StoreError> {
        self.preferences.write().await.push(preference);
        Ok(())
    }

    async fn list_preferences(
        &self,
        session_id: &SessionId,
    ) -> Result<Vec<Preference>, StoreError> {
        let mut prefs: Vec<Preference> = self
            .preferences
            .read()
            .await
            .iter()
            .filter(|p| &p.session_id == session_id)
            .cloned()
            .collect();
        prefs.sort_by_key(|p| p.created_at);
        Ok(prefs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arena_domain::{PreferenceDraft, SessionDraft, TurnDraft};

    fn session(owner: &str) -> Session {
        Session::create(UserId::new(owner), SessionDraft::new("s"))
    }

    #[tokio::test]
    async fn test_double_insert_conflicts() {
        let store = InMemoryRecordStore::new();
        let s = session("user-1");
        store.insert_session(s.clone()).await.unwrap();
        let err = store.insert_session(s).await.unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_ownership_scoped_lookup_hides_foreign_sessions() {
        let store = InMemoryRecordStore::new();
        let s = session("user-1");
        store.insert_session(s.clone()).await.unwrap();

        let found = store
            .find_session(&s.id, &UserId::new("user-2"))
            .await
            .unwrap();
        assert!(found.is_none());
    }

    #[tokio::test]
    async fn test_delete_cascades_to_dependents() {
        let store = InMemoryRecordStore::new();
        let s = session("user-1");
        store.insert_session(s.clone()).await.unwrap();

        let turn = Turn::create(s.id.clone(), s.user_id.clone(), 1, TurnDraft::new("t"));
        store.insert_turn(turn.clone()).await.unwrap();
        let pref = Preference::create(
            s.id.clone(),
            turn.id.clone(),
            s.user_id.clone(),
            PreferenceDraft::new("claude-code"),
        );
        store.insert_preference(pref).await.unwrap();

        store.delete_session(&s.id).await.unwrap();

        assert_eq!(store.count_turns(&s.id).await.unwrap(), 0);
        assert!(store.list_preferences(&s.id).await.unwrap().is_empty());
        assert!(
            store
                .find_session(&s.id, &s.user_id)
                .await
                .unwrap()
                .is_none()
        );
    }

    #[tokio::test]
    async fn test_list_sessions_most_recent_first() {
        let store = InMemoryRecordStore::new();
        let owner = UserId::new("user-1");

        let old = session("user-1");
        store.insert_session(old.clone()).await.unwrap();
        let mut fresh = session("user-1");
        fresh.last_activity_at = old.last_activity_at + chrono::Duration::seconds(10);
        store.insert_session(fresh.clone()).await.unwrap();

        let listed = store.list_sessions(&owner).await.unwrap();
        assert_eq!(listed[0].id, fresh.id);
        assert_eq!(listed[1].id, old.id);
    }
}
