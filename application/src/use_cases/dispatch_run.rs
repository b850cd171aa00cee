//! Dispatch Run use case
//!
//! The synchronous half of execution: validate the request, truncate the
//! variant list to the configured ceiling, persist the run record, kick off
//! the background orchestrator, and hand the caller an acknowledgement with
//! the streaming addresses. The caller never waits for model output here.

use crate::ports::record_store::{RecordStore, StoreError};
use crate::ports::stream_gateway::StreamGateway;
use crate::use_cases::execute_variations::ExecuteVariationsUseCase;
use crate::use_cases::state_tracker::StateTracker;
use arena_domain::{
    AgentConfig, DomainError, ModelId, Run, RunId, SessionId, TurnId, UserId, VariantConfig,
    VariantRequest,
};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Errors surfaced by run dispatch
#[derive(thiserror::Error, Debug)]
pub enum DispatchError {
    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Live runs and their cancellation tokens, keyed by run id.
///
/// Entries are registered before the orchestrator is spawned and removed
/// when it finishes, so a cancel issued at any point in between lands.
#[derive(Default)]
pub struct RunRegistry {
    inner: Mutex<HashMap<RunId, (SessionId, CancellationToken)>>,
}

impl RunRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, run_id: RunId, session_id: SessionId) -> CancellationToken {
        let token = CancellationToken::new();
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        inner.insert(run_id, (session_id, token.clone()));
        token
    }

    /// Request cancellation of one run. Returns false if the run is not
    /// live (unknown or already finished).
    pub fn cancel_run(&self, run_id: &RunId) -> bool {
        let inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        match inner.get(run_id) {
            Some((_, token)) => {
                token.cancel();
                true
            }
            None => false,
        }
    }

    /// Request cancellation of every live run in a session.
    pub fn cancel_session(&self, session_id: &SessionId) {
        let inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        for (sid, token) in inner.values() {
            if sid == session_id {
                token.cancel();
            }
        }
    }

    pub fn complete(&self, run_id: &RunId) {
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        let _ = inner.remove(run_id);
    }

    pub fn live_count(&self) -> usize {
        let inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        inner.len()
    }
}

/// A dispatch request for one turn
#[derive(Debug, Clone)]
pub struct DispatchInput {
    pub session_id: SessionId,
    pub turn_id: TurnId,
    pub owner: UserId,
    pub prompt: String,
    pub context: Option<String>,
    pub variants: Vec<VariantRequest>,
    /// Ceiling on concurrently executed variants; extras are dropped
    pub max_models: usize,
}

/// Acknowledgement returned to the caller once the run is queued
#[derive(Debug, Clone, serde::Serialize)]
pub struct DispatchAccepted {
    pub turn_id: TurnId,
    pub run_id: RunId,
    pub stream_address: String,
    pub debug_stream_address: String,
    pub status: &'static str,
    pub models_used: Vec<ModelId>,
}

/// Use case for accepting an execution request and launching it
pub struct DispatchRunUseCase<S: RecordStore> {
    store: Arc<S>,
    stream: Arc<dyn StreamGateway>,
    orchestrator: Arc<ExecuteVariationsUseCase<S>>,
    tracker: Arc<StateTracker>,
    registry: Arc<RunRegistry>,
}

impl<S: RecordStore + 'static> DispatchRunUseCase<S> {
    pub fn new(
        store: Arc<S>,
        stream: Arc<dyn StreamGateway>,
        orchestrator: Arc<ExecuteVariationsUseCase<S>>,
        tracker: Arc<StateTracker>,
        registry: Arc<RunRegistry>,
    ) -> Self {
        Self {
            store,
            stream,
            orchestrator,
            tracker,
            registry,
        }
    }

    /// Queue a run for the given turn and return immediately.
    ///
    /// The acknowledgement carries `status: "accepted"` plus the stream
    /// addresses; results arrive on those streams and in the run record.
    pub async fn dispatch(&self, input: DispatchInput) -> Result<DispatchAccepted, DispatchError> {
        if input.variants.is_empty() {
            return Err(DomainError::InvalidArgument(
                "at least one model variant is required".to_string(),
            )
            .into());
        }
        // A zero ceiling would retain nothing and create a run that can
        // never complete
        if input.max_models == 0 {
            return Err(DomainError::InvalidArgument(
                "max_models must be at least 1".to_string(),
            )
            .into());
        }

        let requested = input.variants.len();
        let context = input.context.as_deref().unwrap_or("");
        let variants: Vec<VariantConfig> = input
            .variants
            .into_iter()
            .take(input.max_models)
            .map(|request| VariantConfig::resolve(request, context))
            .collect();
        if variants.len() < requested {
            warn!(
                "Dispatch for turn {} truncated from {} to {} variant(s)",
                input.turn_id,
                requested,
                variants.len()
            );
        }

        let _guard = self.tracker.lock_session(&input.session_id).await;

        let mut session = self
            .store
            .find_session(&input.session_id, &input.owner)
            .await?
            .ok_or(DomainError::NotFound("Session"))?;

        let mut turn = self
            .store
            .find_turn(&input.session_id, &input.turn_id)
            .await?
            .ok_or(DomainError::NotFound("Turn"))?;

        let config = AgentConfig::new(variants);
        let models = config.models();

        // Re-dispatch with a fresh prompt rewrites the turn and reopens it
        // for streaming; dispatching the original prompt leaves it alone,
        // keyed on the prompt only.
        if turn.prompt != input.prompt {
            turn.prompt = input.prompt.clone();
            turn.context = input.context.clone();
            turn.models_requested = models.clone();
            turn.begin_streaming();
            self.store.update_turn(turn.clone()).await?;
            debug!("Turn {} rewritten by re-dispatch", turn.id);
        }

        let run = Run::create(
            input.session_id.clone(),
            turn.id.clone(),
            input.owner,
            input.prompt,
            config,
        );
        self.store.insert_run(run.clone()).await?;

        session.record_models(&models);
        session.touch();
        self.store.update_session(session).await?;
        drop(_guard);

        let token = self.registry.register(run.id.clone(), input.session_id);
        let orchestrator = Arc::clone(&self.orchestrator);
        let registry = Arc::clone(&self.registry);
        let run_id = run.id.clone();
        tokio::spawn(async move {
            if let Err(e) = orchestrator.execute(run_id.clone(), token).await {
                warn!("Run {run_id} aborted: {e}");
            }
            registry.complete(&run_id);
        });

        info!(
            "Run {} accepted for turn {} with {} variant(s)",
            run.id,
            turn.id,
            run.variations
        );
        Ok(DispatchAccepted {
            turn_id: turn.id,
            run_id: run.id.clone(),
            stream_address: self.stream.primary_address(&run.id),
            debug_stream_address: self.stream.debug_address(&run.id),
            status: "accepted",
            models_used: models,
        })
    }

    /// Fetch one run of a session the caller owns.
    pub async fn get_run(
        &self,
        owner: &UserId,
        session_id: &SessionId,
        run_id: &RunId,
    ) -> Result<Run, DispatchError> {
        let _session = self
            .store
            .find_session(session_id, owner)
            .await?
            .ok_or(DomainError::NotFound("Session"))?;

        self.store
            .find_run(run_id)
            .await?
            .filter(|run| &run.session_id == session_id)
            .ok_or(DomainError::NotFound("Run").into())
    }

    /// List a turn's runs in creation order for a session the caller owns.
    pub async fn list_runs(
        &self,
        owner: &UserId,
        session_id: &SessionId,
        turn_id: &TurnId,
    ) -> Result<Vec<Run>, DispatchError> {
        let _session = self
            .store
            .find_session(session_id, owner)
            .await?
            .ok_or(DomainError::NotFound("Session"))?;

        let _turn = self
            .store
            .find_turn(session_id, turn_id)
            .await?
            .ok_or(DomainError::NotFound("Turn"))?;

        Ok(self.store.list_runs(session_id, turn_id).await?)
    }

    /// Cancel a live run the caller owns. Returns whether a cancellation
    /// was actually delivered.
    pub async fn cancel(
        &self,
        owner: &UserId,
        session_id: &SessionId,
        run_id: &RunId,
    ) -> Result<bool, DispatchError> {
        let _session = self
            .store
            .find_session(session_id, owner)
            .await?
            .ok_or(DomainError::NotFound("Session"))?;

        Ok(self.registry.cancel_run(run_id))
    }
}
