//! Execute Variations use case
//!
//! The background orchestrator for a dispatched run: fans out one execution
//! unit per model variant, streams progress and diagnostics, and settles
//! the run's aggregate state once every variant reaches a terminal state.
//!
//! Failure isolation is per variant: one variant failing never aborts its
//! siblings, and the run is `Failed` only when every variant failed.

use crate::ports::provider::{ProviderError, ProviderRequest, ProviderRouter};
use crate::ports::record_store::{RecordStore, StoreError};
use crate::ports::stream_gateway::{RunEvent, StreamChannel, StreamGateway};
use crate::use_cases::state_tracker::StateTracker;
use arena_domain::{DomainError, Run, RunId, RunStatus, VariantConfig, VariantOutcome};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Errors that abort the orchestrator itself.
///
/// Per-variant failures are not errors at this level; they are recorded as
/// outcomes on the run.
#[derive(thiserror::Error, Debug)]
pub enum ExecuteError {
    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Bounded exponential backoff for transient provider errors
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total attempts per variant, including the first
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(8),
        }
    }
}

impl RetryPolicy {
    /// Delay before the attempt after `attempt` (1-based) failed.
    pub fn delay(&self, attempt: u32) -> Duration {
        let exp = attempt.saturating_sub(1).min(16);
        let delay = self.base_delay.saturating_mul(2u32.saturating_pow(exp));
        delay.min(self.max_delay)
    }
}

/// Use case for executing all variants of a run concurrently
pub struct ExecuteVariationsUseCase<S: RecordStore> {
    store: Arc<S>,
    router: Arc<dyn ProviderRouter>,
    stream: Arc<dyn StreamGateway>,
    tracker: Arc<StateTracker>,
    retry: RetryPolicy,
}

impl<S: RecordStore + 'static> ExecuteVariationsUseCase<S> {
    pub fn new(
        store: Arc<S>,
        router: Arc<dyn ProviderRouter>,
        stream: Arc<dyn StreamGateway>,
        tracker: Arc<StateTracker>,
    ) -> Self {
        Self {
            store,
            router,
            stream,
            tracker,
            retry: RetryPolicy::default(),
        }
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Execute every variant of the run to completion.
    ///
    /// Returns only once the run has reached a terminal state (or the run
    /// record could not be loaded/persisted). The variant configuration is
    /// read from the run record written at dispatch time.
    pub async fn execute(
        &self,
        run_id: RunId,
        cancel: CancellationToken,
    ) -> Result<RunStatus, ExecuteError> {
        let mut run = self
            .store
            .find_run(&run_id)
            .await?
            .ok_or(DomainError::NotFound("Run"))?;

        info!(
            "Run {} picked up: {} variant(s)",
            run.id, run.variations
        );
        run.advance_status(RunStatus::Running);
        self.persist_run(run.clone()).await?;
        self.publish_both(
            &run.id,
            RunEvent::RunStarted {
                run_id: run.id.clone(),
                variations: run.variations,
            },
        );

        let context = self
            .store
            .find_turn(&run.session_id, &run.turn_id)
            .await?
            .and_then(|turn| turn.context);
        let outcomes = self.fan_out(&run, context, &cancel).await;
        let cancelled = cancel.is_cancelled();
        let status = RunStatus::aggregate(&outcomes, cancelled);

        self.settle(&mut run, outcomes, status).await?;

        self.publish_both(
            &run.id,
            RunEvent::RunCompleted {
                run_id: run.id.clone(),
                status,
                total_cost: run.total_cost(),
            },
        );
        info!("Run {} settled as {}", run.id, status);
        Ok(status)
    }

    /// Spawn one task per variant and collect outcomes as they finish.
    ///
    /// Completion order is unordered by design. On cancellation the
    /// remaining tasks are aborted and their variants reported cancelled;
    /// variants that already finished keep their results.
    async fn fan_out(
        &self,
        run: &Run,
        context: Option<String>,
        cancel: &CancellationToken,
    ) -> Vec<VariantOutcome> {
        let mut join_set = JoinSet::new();

        for variant in run.agent_config.variants.clone() {
            let router = Arc::clone(&self.router);
            let stream = Arc::clone(&self.stream);
            let run_id = run.id.clone();
            let prompt = run.prompt.clone();
            let context = context.clone();
            let retry = self.retry.clone();
            let cancel = cancel.clone();

            let _abort_handle = join_set.spawn(async move {
                Self::run_variant(router, stream, run_id, prompt, context, variant, retry, cancel)
                    .await
            });
        }

        let mut outcomes = Vec::new();
        let mut aborting = false;
        loop {
            tokio::select! {
                _ = cancel.cancelled(), if !aborting => {
                    debug!("Run {} cancellation requested, aborting remaining variants", run.id);
                    aborting = true;
                    join_set.abort_all();
                }
                joined = join_set.join_next() => match joined {
                    Some(Ok(outcome)) => outcomes.push(outcome),
                    Some(Err(e)) if e.is_cancelled() => {}
                    Some(Err(e)) => warn!("Variant task for run {} panicked: {e}", run.id),
                    None => break,
                }
            }
        }

        // Anything without an outcome was aborted before finishing
        for variant in &run.agent_config.variants {
            if !outcomes.iter().any(|o| o.variant_id == variant.variant_id) {
                self.stream.publish(
                    &run.id,
                    StreamChannel::Primary,
                    RunEvent::VariantCancelled {
                        variant_id: variant.variant_id.clone(),
                    },
                );
                outcomes.push(VariantOutcome::cancelled(
                    variant.variant_id.clone(),
                    variant.model.clone(),
                ));
            }
        }
        outcomes
    }

    /// Execute one variant with bounded retry on transient provider errors.
    async fn run_variant(
        router: Arc<dyn ProviderRouter>,
        stream: Arc<dyn StreamGateway>,
        run_id: RunId,
        prompt: String,
        context: Option<String>,
        variant: VariantConfig,
        retry: RetryPolicy,
        cancel: CancellationToken,
    ) -> VariantOutcome {
        stream.publish(
            &run_id,
            StreamChannel::Primary,
            RunEvent::VariantStarted {
                variant_id: variant.variant_id.clone(),
                model: variant.model.clone(),
                agent_mode: variant.agent_mode,
            },
        );
        stream.publish(
            &run_id,
            StreamChannel::Debug,
            RunEvent::Diagnostic {
                message: format!(
                    "variant {} using {} via {}",
                    variant.variant_id, variant.model, variant.agent_mode
                ),
            },
        );

        let request = ProviderRequest::new(variant.model.clone(), prompt)
            .with_context(context)
            .with_parameters(variant.parameters.clone());

        let mut attempt = 0u32;
        loop {
            attempt += 1;
            if cancel.is_cancelled() {
                return VariantOutcome::cancelled(variant.variant_id, variant.model);
            }

            match Self::attempt_variant(&*router, &*stream, &run_id, &variant, &request).await {
                Ok(output) => {
                    stream.publish(
                        &run_id,
                        StreamChannel::Primary,
                        RunEvent::VariantCompleted {
                            variant_id: variant.variant_id.clone(),
                            model: variant.model.clone(),
                            content: output.content.clone(),
                            cost: output.cost,
                        },
                    );
                    return VariantOutcome::success(
                        variant.variant_id,
                        variant.model,
                        output.content,
                        output.cost,
                        attempt,
                    );
                }
                Err(e) if e.is_transient() && attempt < retry.max_attempts => {
                    let delay = retry.delay(attempt);
                    warn!(
                        "Variant {} of run {} failed transiently (attempt {}): {e}; retrying in {:?}",
                        variant.variant_id, run_id, attempt, delay
                    );
                    stream.publish(
                        &run_id,
                        StreamChannel::Debug,
                        RunEvent::Diagnostic {
                            message: format!(
                                "variant {} attempt {} failed: {e}; retrying",
                                variant.variant_id, attempt
                            ),
                        },
                    );
                    tokio::select! {
                        _ = cancel.cancelled() => {
                            return VariantOutcome::cancelled(variant.variant_id, variant.model);
                        }
                        _ = tokio::time::sleep(delay) => {}
                    }
                }
                Err(e) => {
                    warn!(
                        "Variant {} of run {} failed: {e}",
                        variant.variant_id, run_id
                    );
                    stream.publish(
                        &run_id,
                        StreamChannel::Primary,
                        RunEvent::VariantFailed {
                            variant_id: variant.variant_id.clone(),
                            model: variant.model.clone(),
                            error: e.to_string(),
                            attempts: attempt,
                        },
                    );
                    return VariantOutcome::failure(
                        variant.variant_id,
                        variant.model,
                        e.to_string(),
                        attempt,
                    );
                }
            }
        }
    }

    /// One provider attempt: resolve the adapter, stream, forward deltas.
    async fn attempt_variant(
        router: &dyn ProviderRouter,
        stream: &dyn StreamGateway,
        run_id: &RunId,
        variant: &VariantConfig,
        request: &ProviderRequest,
    ) -> Result<arena_domain::CompletedOutput, ProviderError> {
        let provider = router.provider_for(variant.agent_mode)?;
        let handle = provider.execute_streaming(request).await?;
        handle
            .collect(|chunk| {
                stream.publish(
                    run_id,
                    StreamChannel::Primary,
                    RunEvent::VariantDelta {
                        variant_id: variant.variant_id.clone(),
                        content: chunk.to_string(),
                    },
                );
            })
            .await
    }

    /// Persist the terminal run state and roll costs up into the turn,
    /// under the session's write lock.
    async fn settle(
        &self,
        run: &mut Run,
        outcomes: Vec<VariantOutcome>,
        status: RunStatus,
    ) -> Result<(), ExecuteError> {
        let _guard = self.tracker.lock_session(&run.session_id).await;

        run.outcomes = outcomes;
        run.advance_status(status);
        self.persist_run(run.clone()).await?;

        // A cancelled run leaves the turn as-is: no results are expected
        // from it, but earlier runs may still be streaming.
        if status != RunStatus::Cancelled
            && let Some(mut turn) = self.store.find_turn(&run.session_id, &run.turn_id).await?
        {
            turn.settle(status == RunStatus::Completed, run.total_cost());
            self.store.update_turn(turn).await?;
        }
        Ok(())
    }

    /// Background writes retry on store unavailability: there is no caller
    /// to surface the error to.
    async fn persist_run(&self, run: Run) -> Result<(), ExecuteError> {
        let mut attempt = 0u32;
        loop {
            attempt += 1;
            match self.store.update_run(run.clone()).await {
                Ok(()) => return Ok(()),
                Err(StoreError::Unavailable(reason)) if attempt < self.retry.max_attempts => {
                    let delay = self.retry.delay(attempt);
                    warn!(
                        "Persisting run {} failed (attempt {}): {reason}; retrying in {:?}",
                        run.id, attempt, delay
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    fn publish_both(&self, run_id: &RunId, event: RunEvent) {
        self.stream
            .publish(run_id, StreamChannel::Primary, event.clone());
        self.stream.publish(run_id, StreamChannel::Debug, event);
    }
}
