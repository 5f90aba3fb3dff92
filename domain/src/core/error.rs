//! Domain error types

use thiserror::Error;

/// Domain-level errors
#[derive(Error, Debug)]
pub enum DomainError {
    #[error("No agents configured in plan")]
    EmptyPlan,

    #[error("Agent '{0}' is not registered")]
    UnknownAgent(String),

    #[error("Agent '{0}' appears more than once in a parallel group")]
    DuplicateAgent(String),

    #[error("Invalid plan: {0}")]
    InvalidPlan(String),

    #[error("Operation cancelled")]
    Cancelled,
}

impl DomainError {
    /// Check if this error represents a cancellation
    pub fn is_cancelled(&self) -> bool {
        matches!(self, DomainError::Cancelled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cancelled_error_display() {
        let error = DomainError::Cancelled;
        assert_eq!(error.to_string(), "Operation cancelled");
    }

    #[test]
    fn test_is_cancelled_check() {
        assert!(DomainError::Cancelled.is_cancelled());
        assert!(!DomainError::EmptyPlan.is_cancelled());
        assert!(!DomainError::UnknownAgent("scanner".to_string()).is_cancelled());
        assert!(!DomainError::InvalidPlan("test".to_string()).is_cancelled());
    }

    #[test]
    fn test_unknown_agent_display() {
        let error = DomainError::UnknownAgent("scaling-advisor".to_string());
        assert_eq!(
            error.to_string(),
            "Agent 'scaling-advisor' is not registered"
        );
    }
}
