//! Domain error model.

use thiserror::Error;

/// Result type used across the domain layer.
pub type DomainResult<T> = Result<T, DomainError>;

/// Domain-level error.
///
/// Keep this focused on deterministic, business/domain failures (validation,
/// state-machine violations, conflicts). Infrastructure failures funnel into
/// `Storage` and are surfaced to callers as generic server errors.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// A value failed validation (missing/malformed field, invalid number).
    #[error("validation failed: {0}")]
    Validation(String),

    /// A referenced resource does not exist.
    #[error("{0} not found")]
    NotFound(String),

    /// A unique business key collision (sku, code, slug, order number).
    #[error("conflict: {0}")]
    Conflict(String),

    /// The entity's current status forbids the operation.
    #[error("cannot {operation} while status is {current}")]
    InvalidState { current: String, operation: String },

    /// A status transition outside the entity's transition table.
    #[error("invalid status transition from {from} to {to}")]
    InvalidTransition { from: String, to: String },

    /// Delete blocked by existing dependent records.
    #[error("dependent records exist: {0}")]
    DependencyExists(String),

    /// An identifier was invalid (e.g. parse failure).
    #[error("invalid identifier: {0}")]
    InvalidId(String),

    /// Persistence-layer failure (connectivity, aborted transaction).
    #[error("storage failure: {0}")]
    Storage(String),
}

impl DomainError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound(what.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    pub fn invalid_state(current: impl Into<String>, operation: impl Into<String>) -> Self {
        Self::InvalidState {
            current: current.into(),
            operation: operation.into(),
        }
    }

    pub fn invalid_transition(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self::InvalidTransition {
            from: from.into(),
            to: to.into(),
        }
    }

    pub fn dependency_exists(msg: impl Into<String>) -> Self {
        Self::DependencyExists(msg.into())
    }

    pub fn invalid_id(msg: impl Into<String>) -> Self {
        Self::InvalidId(msg.into())
    }

    pub fn storage(msg: impl Into<String>) -> Self {
        Self::Storage(msg.into())
    }

    /// Whether the error is the caller's fault (4xx at the delivery layer).
    pub fn is_client_error(&self) -> bool {
        !matches!(self, Self::Storage(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_storage_counts_as_server_fault() {
        // Bulk operations lean on this split: client faults are reported
        // per item, storage faults abort the batch.
        let client = [
            DomainError::validation("x"),
            DomainError::not_found("x"),
            DomainError::conflict("x"),
            DomainError::invalid_state("draft", "ship"),
            DomainError::invalid_transition("pending", "delivered"),
            DomainError::dependency_exists("x"),
            DomainError::invalid_id("x"),
        ];
        for err in client {
            assert!(err.is_client_error(), "{err}");
        }
        assert!(!DomainError::storage("down").is_client_error());
    }
}
