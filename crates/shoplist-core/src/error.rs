//! # Error Types
//!
//! Domain-specific error types for shoplist-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  shoplist-core errors (this file)                                      │
//! │  ├── CoreError        - Domain rule failures                           │
//! │  └── ValidationError  - Input validation failures                      │
//! │                                                                         │
//! │  shoplist-db errors (separate crate)                                   │
//! │  └── DbError          - Database operation failures                    │
//! │                                                                         │
//! │  shoplist-app errors                                                   │
//! │  └── AppError         - What the UI host sees (code + message)         │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → AppError ← DbError                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;

// =============================================================================
// Core Error
// =============================================================================

/// Domain rule errors.
#[derive(Debug, Error)]
pub enum CoreError {
    /// A rank outside `1..=count` was handed to the move planner.
    ///
    /// ## When This Occurs
    /// - A stale drag result arrives after categories were deleted
    /// - A caller passes the sentinel rank
    #[error("Rank {rank} is out of range (1..={count})")]
    RankOutOfRange { rank: i32, count: i32 },

    /// A rank set that should be `1..N` has gaps or repeats.
    #[error("Category ranks are not dense: {ranks:?}")]
    RanksNotDense { ranks: Vec<i32> },

    /// Nothing to export.
    #[error("The shopping list is empty")]
    EmptyList,

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// Raised before any write so a bad form never reaches the store.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// A required field is missing or blank after trimming.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Quantity is not a number (either `.` or `,` decimal separator).
    #[error("{field} is not a valid number: '{value}'")]
    InvalidNumber { field: String, value: String },

    /// The (name, category) pair or exact item already exists.
    #[error("{field} '{value}' already exists")]
    Duplicate { field: String, value: String },
}

impl ValidationError {
    pub fn required(field: impl Into<String>) -> Self {
        ValidationError::Required {
            field: field.into(),
        }
    }

    pub fn duplicate(field: impl Into<String>, value: impl Into<String>) -> Self {
        ValidationError::Duplicate {
            field: field.into(),
            value: value.into(),
        }
    }
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = CoreError::RankOutOfRange { rank: 7, count: 5 };
        assert_eq!(err.to_string(), "Rank 7 is out of range (1..=5)");
    }

    #[test]
    fn test_validation_error_messages() {
        assert_eq!(ValidationError::required("name").to_string(), "name is required");

        let err = ValidationError::InvalidNumber {
            field: "quantity".to_string(),
            value: "abc".to_string(),
        };
        assert_eq!(err.to_string(), "quantity is not a valid number: 'abc'");
    }

    #[test]
    fn test_validation_converts_to_core_error() {
        let core_err: CoreError = ValidationError::required("category").into();
        assert!(matches!(core_err, CoreError::Validation(_)));
    }
}
