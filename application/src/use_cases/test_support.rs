//! Shared fakes for use-case tests: an in-memory record store, scripted
//! provider routers, and a provider that fails a configurable number of
//! times before succeeding.

use crate::ports::provider::{
    ModelProvider, ProviderError, ProviderRequest, ProviderResult, ProviderRouter,
};
use crate::ports::record_store::{RecordStore, StoreError};
use arena_domain::{
    AgentMode, Preference, Run, RunId, Session, SessionId, Turn, TurnId, UserId,
};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use tokio::sync::RwLock;

/// In-memory record store mirroring the persistence contract
#[derive(Default)]
pub struct MemoryStore {
    sessions: RwLock<HashMap<SessionId, Session>>,
    turns: RwLock<HashMap<TurnId, Turn>>,
    runs: RwLock<HashMap<RunId, Run>>,
    preferences: RwLock<Vec<Preference>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn insert_session(&self, session: Session) -> Result<(), StoreError> {
        self.sessions
            .write()
            .await
            .insert(session.id.clone(), session);
        Ok(())
    }

    async fn find_session(
        &self,
        id: &SessionId,
        owner: &UserId,
    ) -> Result<Option<Session>, StoreError> {
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

/// Provider that fails transiently N times, then answers
pub struct FlakyProvider {
    failures_remaining: AtomicU32,
}

impl FlakyProvider {
    pub fn transient_failures(count: u32) -> Self {
        Self {
            failures_remaining: AtomicU32::new(count),
        }
    }
}

#[async_trait]
impl ModelProvider for FlakyProvider {
    fn mode(&self) -> AgentMode {
        AgentMode::Litellm
    }

    async fn execute(&self, request: &ProviderRequest) -> Result<ProviderResult, ProviderError> {
        let remaining = self.failures_remaining.load(Ordering::SeqCst);
        if remaining > 0 {
            self.failures_remaining
                .store(remaining - 1, Ordering::SeqCst);
            return Err(ProviderError::Transient("temporarily overloaded".into()));
        }
        Ok(ProviderResult::new(
            format!("answer from {}", request.model),
            0.01,
        ))
    }
}

/// Provider that always answers with an echoed result
struct EchoProvider;

#[async_trait]
impl ModelProvider for EchoProvider {
    fn mode(&self) -> AgentMode {
        AgentMode::Litellm
    }

    async fn execute(&self, request: &ProviderRequest) -> Result<ProviderResult, ProviderError> {
        Ok(ProviderResult::new(
            format!("answer from {}", request.model),
            0.01,
        ))
    }
}

/// Router serving one scripted provider for every agent mode
pub struct ScriptedRouter {
    provider: Box<dyn ModelProvider>,
    fatal_models: Vec<String>,
    stalled_models: Vec<String>,
}

impl ScriptedRouter {
    /// Every variant succeeds with an echoed answer.
    pub fn succeeding() -> Self {
        Self {
            provider: Box::new(EchoProvider),
            fatal_models: Vec::new(),
            stalled_models: Vec::new(),
        }
    }

    /// Route every mode to one specific provider.
    pub fn with_default(provider: impl ModelProvider + 'static) -> Self {
        Self {
            provider: Box::new(provider),
            fatal_models: Vec::new(),
            stalled_models: Vec::new(),
        }
    }

    /// Requests for the listed model ids fail fatally on every attempt.
    pub fn failing_fatal_for(mut self, models: &[&str]) -> Self {
        self.fatal_models = models.iter().map(|s| s.to_string()).collect();
        self
    }

    /// Requests for the listed model ids hang until the task is aborted.
    pub fn stalling_for(mut self, models: &[&str]) -> Self {
        self.stalled_models = models.iter().map(|s| s.to_string()).collect();
        self
    }
}

#[async_trait]
impl ModelProvider for ScriptedRouter {
    fn mode(&self) -> AgentMode {
        AgentMode::Litellm
    }

    async fn execute(&self, request: &ProviderRequest) -> Result<ProviderResult, ProviderError> {
        if self
            .fatal_models
            .iter()
            .any(|m| request.model.as_str() == m)
        {
            return Err(ProviderError::Fatal("model rejected request".into()));
        }
        if self
            .stalled_models
            .iter()
            .any(|m| request.model.as_str() == m)
        {
            std::future::pending::<()>().await;
        }
        self.provider.execute(request).await
    }
}

impl ProviderRouter for ScriptedRouter {
    fn provider_for(&self, _mode: AgentMode) -> Result<&dyn ModelProvider, ProviderError> {
        Ok(self)
    }
}
