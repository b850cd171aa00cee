//! Application layer for codearena
//!
//! This crate contains the use cases that orchestrate the domain layer and
//! the ports (abstract interfaces) through which they reach external
//! collaborators: the record store, the streaming gateway, and the model
//! provider backends. Adapters live in the infrastructure layer.

pub mod ports;
pub mod use_cases;

// Re-export commonly used types
pub use ports::{
    provider::{ModelProvider, ProviderError, ProviderRequest, ProviderResult, ProviderRouter, StreamHandle},
    record_store::{RecordStore, StoreError},
    stream_gateway::{NoStream, RunEvent, StreamChannel, StreamGateway},
};
pub use use_cases::{
    dispatch_run::{DispatchAccepted, DispatchError, DispatchInput, DispatchRunUseCase, RunRegistry},
    execute_variations::{ExecuteVariationsUseCase, RetryPolicy},
    manage_sessions::{ManageSessionsUseCase, SessionError},
    record_preference::RecordPreferenceUseCase,
    record_turn::RecordTurnUseCase,
    session_analytics::{ModelPreferenceStats, SessionAnalytics, SessionAnalyticsUseCase, SessionExport},
    state_tracker::StateTracker,
};
