//! Use cases orchestrating the domain layer through the ports.

pub mod dispatch_run;
pub mod execute_variations;
pub mod manage_sessions;
pub mod record_preference;
pub mod record_turn;
pub mod session_analytics;
pub mod state_tracker;

#[cfg(test)]
pub(crate) mod test_support;
