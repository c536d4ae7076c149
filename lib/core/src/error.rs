use thiserror::Error;

// ── Error codes ─────────────────────────────────────────────────────
//
// Stable, machine-readable identifiers. Clients match on these —
// never on the human-readable message string.

/// Stable error code constants.
///
/// Transport adapters surface `{"code": "NOT_FOUND", "message": "..."}`
/// and clients match on `code`. Codes never change; messages may be
/// reworded.
pub mod error_code {
    pub const NOT_FOUND: &str = "NOT_FOUND";
    pub const ALREADY_EXISTS: &str = "ALREADY_EXISTS";
    pub const VALIDATION_FAILED: &str = "VALIDATION_FAILED";
    pub const INVALID_STATE_TRANSITION: &str = "INVALID_STATE_TRANSITION";
    pub const CONSERVATION_VIOLATION: &str = "CONSERVATION_VIOLATION";
    pub const CONCURRENT_MODIFICATION: &str = "CONCURRENT_MODIFICATION";
    pub const STORAGE_ERROR: &str = "STORAGE_ERROR";
    pub const INTERNAL: &str = "INTERNAL";
}

// ── ServiceError ────────────────────────────────────────────────────

/// Unified service error type used across all modules.
///
/// Each variant maps to a stable error code (see [`error_code`]).
/// Capacity exceedance is deliberately NOT an error: density limits are
/// advisory and results carry warnings instead (farms must be able to
/// override them).
#[derive(Error, Debug)]
pub enum ServiceError {
    /// Resource does not exist, is soft-deleted, or is inactive.
    #[error("{0}")]
    NotFound(String),

    /// Duplicate key / resource already exists.
    #[error("{0}")]
    Conflict(String),

    /// Input data is invalid (non-positive quantity, weight, volume...).
    #[error("{0}")]
    Validation(String),

    /// Illegal lifecycle status change, or mutation of a terminal batch.
    #[error("{0}")]
    InvalidState(String),

    /// The operation would break the population or biomass conservation
    /// law (e.g. drive `current_quantity` below zero).
    #[error("{0}")]
    Conservation(String),

    /// Write conflict detected during a serialized update.
    #[error("{0}")]
    ConcurrentModification(String),

    /// Storage backend failure.
    #[error("{0}")]
    Storage(String),

    /// Unexpected internal error.
    #[error("{0}")]
    Internal(String),
}

impl ServiceError {
    /// Stable, machine-readable error code.
    pub fn error_code(&self) -> &'static str {
        match self {
            ServiceError::NotFound(_) => error_code::NOT_FOUND,
            ServiceError::Conflict(_) => error_code::ALREADY_EXISTS,
            ServiceError::Validation(_) => error_code::VALIDATION_FAILED,
            ServiceError::InvalidState(_) => error_code::INVALID_STATE_TRANSITION,
            ServiceError::Conservation(_) => error_code::CONSERVATION_VIOLATION,
            ServiceError::ConcurrentModification(_) => error_code::CONCURRENT_MODIFICATION,
            ServiceError::Storage(_) => error_code::STORAGE_ERROR,
            ServiceError::Internal(_) => error_code::INTERNAL,
        }
    }

    /// Whether retrying the same request may succeed (write conflicts
    /// and storage hiccups; never validation or state errors).
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ServiceError::ConcurrentModification(_) | ServiceError::Storage(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_code_mapping() {
        assert_eq!(ServiceError::NotFound("x".into()).error_code(), "NOT_FOUND");
        assert_eq!(ServiceError::Conflict("x".into()).error_code(), "ALREADY_EXISTS");
        assert_eq!(ServiceError::Validation("x".into()).error_code(), "VALIDATION_FAILED");
        assert_eq!(
            ServiceError::InvalidState("x".into()).error_code(),
            "INVALID_STATE_TRANSITION"
        );
        assert_eq!(
            ServiceError::Conservation("x".into()).error_code(),
            "CONSERVATION_VIOLATION"
        );
        assert_eq!(
            ServiceError::ConcurrentModification("x".into()).error_code(),
            "CONCURRENT_MODIFICATION"
        );
        assert_eq!(ServiceError::Storage("x".into()).error_code(), "STORAGE_ERROR");
        assert_eq!(ServiceError::Internal("x".into()).error_code(), "INTERNAL");
    }

    #[test]
    fn error_display_is_just_message() {
        assert_eq!(
            ServiceError::NotFound("batch 'b1' not found".into()).to_string(),
            "batch 'b1' not found"
        );
        assert_eq!(
            ServiceError::Conservation("mortality 600 exceeds population 500".into()).to_string(),
            "mortality 600 exceeds population 500"
        );
    }

    #[test]
    fn retryable_classification() {
        assert!(ServiceError::ConcurrentModification("x".into()).is_retryable());
        assert!(ServiceError::Storage("x".into()).is_retryable());
        assert!(!ServiceError::Validation("x".into()).is_retryable());
        assert!(!ServiceError::Conservation("x".into()).is_retryable());
    }
}
