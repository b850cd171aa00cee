//! Domain layer for codearena
//!
//! This crate contains the core business logic, entities, and value objects.
//! It has no dependencies on infrastructure or presentation concerns.
//!
//! # Core Concepts
//!
//! ## Session / Turn / Run / Preference
//!
//! A **Session** is a multi-turn conversation container owned by one user.
//! Each **Turn** is one numbered prompt exchange within a session. A **Run**
//! is one dispatched execution attempt of a turn's prompt against one or
//! more model variants. A **Preference** records which variant's result the
//! user preferred.
//!
//! ## Agent modes
//!
//! Every model variant resolves to an [`AgentMode`], the execution strategy
//! used to fulfil it (CLI-wrapped agent, hosted gateway, or chat).

pub mod core;
pub mod preference;
pub mod providers;
pub mod run;
pub mod session;
pub mod turn;

// Re-export commonly used types
pub use crate::core::{
    error::DomainError,
    ids::{PreferenceId, RunId, SessionId, TurnId, UserId},
    model::ModelId,
};
pub use preference::entities::{Preference, PreferenceDraft};
pub use providers::AgentMode;
pub use run::{
    entities::{AgentConfig, Run, RunStatus, VariantConfig, VariantOutcome, VariantRequest},
    stream::{CompletedOutput, StreamEvent},
};
pub use session::entities::{Session, SessionDraft, SessionUpdate};
pub use turn::entities::{Turn, TurnDraft, TurnStatus};
