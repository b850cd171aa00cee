//! Domain error types

use thiserror::Error;

/// Domain-level errors
///
/// Ownership failures deliberately collapse into [`DomainError::NotFound`]:
/// an entity that exists but belongs to another user is indistinguishable
/// from one that does not exist at all.
#[derive(Error, Debug)]
pub enum DomainError {
    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Operation cancelled")]
    Cancelled,
}

impl DomainError {
    /// Check if this error represents a cancellation
    pub fn is_cancelled(&self) -> bool {
        matches!(self, DomainError::Cancelled)
    }

    /// Check if this error hides entity existence from the caller
    pub fn is_not_found(&self) -> bool {
        matches!(self, DomainError::NotFound(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_display_names_the_entity() {
        let error = DomainError::NotFound("Session");
        assert_eq!(error.to_string(), "Session not found");
    }

    #[test]
    fn test_cancelled_error_display() {
        let error = DomainError::Cancelled;
        assert_eq!(error.to_string(), "Operation cancelled");
    }

    #[test]
    fn test_is_cancelled_check() {
        assert!(DomainError::Cancelled.is_cancelled());
        assert!(!DomainError::NotFound("Turn").is_cancelled());
        assert!(!DomainError::InvalidArgument("test".to_string()).is_cancelled());
    }
}
