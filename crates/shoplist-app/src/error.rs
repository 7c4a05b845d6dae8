//! # App Error Type
//!
//! Unified error type for command handlers.
//!
//! ## Error Handling Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Flow in Shoplist                               │
//! │                                                                         │
//! │  UI host                     Rust                                       │
//! │  ───────                     ────                                       │
//! │                                                                         │
//! │  vm.create_or_update(..)                                                │
//! │         │                                                               │
//! │         ▼                                                               │
//! │  ┌──────────────────────────────────────────────────────────────────┐  │
//! │  │  Command handler                                                 │  │
//! │  │  AppResult<T>                                                    │  │
//! │  │         │                                                        │  │
//! │  │         ▼                                                        │  │
//! │  │  Validation Error? ── ValidationError::Required ──┐              │  │
//! │  │         │                                         │              │  │
//! │  │         ▼                                         ▼              │  │
//! │  │  Database Error? ─── DbError::ForeignKey… ────── AppError ──────►│  │
//! │  │         │                                                        │  │
//! │  │         ▼                                                        │  │
//! │  │  Success ──────────────────────────────────────────────────────►│  │
//! │  └──────────────────────────────────────────────────────────────────┘  │
//! │                                                                         │
//! │  match e.code {                                                         │
//! │    CONSTRAINT_VIOLATION => "cannot delete: category in use",            │
//! │    DUPLICATE_ENTRY      => "already exists",                            │
//! │    ...                                                                  │
//! │  }                                                                      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Duplicates found by the pre-write check are not errors: handlers report
//! them as a `false` / `Rejected` outcome. `DuplicateEntry` only shows up when
//! a concurrent write wins the race and the UNIQUE index fires.

use serde::Serialize;
use shoplist_core::{CoreError, ValidationError};
use shoplist_db::DbError;
use ts_rs::TS;

use crate::config::ConfigError;

/// Error returned from command handlers.
///
/// ## Serialization
/// ```json
/// {
///   "code": "CONSTRAINT_VIOLATION",
///   "message": "Category 'Dairy' is still used by items"
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct AppError {
    /// Machine-readable error code
    pub code: ErrorCode,

    /// Human-readable error message
    pub message: String,
}

/// Error codes for handler results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, TS)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[ts(export)]
pub enum ErrorCode {
    /// Input failed validation; nothing was written
    ValidationError,

    /// (name, category) or category name already taken
    DuplicateEntry,

    /// Category delete blocked by items still referencing it
    ConstraintViolation,

    /// Keyed update or delete matched no row
    NotFound,

    /// Database operation failed
    DatabaseError,

    /// Config file or environment override is invalid
    Configuration,

    /// Anything else
    Internal,
}

impl AppError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        AppError {
            code,
            message: message.into(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        AppError::new(ErrorCode::ValidationError, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        AppError::new(ErrorCode::Internal, message)
    }

    pub fn is_constraint_violation(&self) -> bool {
        self.code == ErrorCode::ConstraintViolation
    }
}

impl From<DbError> for AppError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound { entity, id } => {
                AppError::new(ErrorCode::NotFound, format!("{} not found: {}", entity, id))
            }
            DbError::UniqueViolation { field, value } => AppError::new(
                ErrorCode::DuplicateEntry,
                format!("{} '{}' already exists", field, value),
            ),
            DbError::ForeignKeyViolation { message } => {
                tracing::warn!("Foreign key violation: {}", message);
                AppError::new(ErrorCode::ConstraintViolation, "Category is still in use")
            }
            DbError::Domain(e) => AppError::from(e),
            DbError::ConnectionFailed(_) => {
                AppError::new(ErrorCode::DatabaseError, "Database connection failed")
            }
            DbError::MigrationFailed(_) => {
                AppError::new(ErrorCode::DatabaseError, "Database migration failed")
            }
            DbError::QueryFailed(e) => {
                tracing::error!("Database query failed: {}", e);
                AppError::new(ErrorCode::DatabaseError, "Database operation failed")
            }
            DbError::TransactionFailed(e) => {
                tracing::error!("Transaction failed: {}", e);
                AppError::new(ErrorCode::DatabaseError, "Database transaction failed")
            }
            DbError::PoolExhausted => {
                AppError::new(ErrorCode::DatabaseError, "Database pool exhausted")
            }
            DbError::Internal(e) => {
                tracing::error!("Internal database error: {}", e);
                AppError::new(ErrorCode::DatabaseError, "Database operation failed")
            }
        }
    }
}

impl From<CoreError> for AppError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::Validation(e) => AppError::from(e),
            CoreError::RankOutOfRange { .. } => AppError::validation(err.to_string()),
            CoreError::RanksNotDense { .. } | CoreError::EmptyList => {
                AppError::internal(err.to_string())
            }
        }
    }
}

impl From<ValidationError> for AppError {
    fn from(err: ValidationError) -> Self {
        match err {
            ValidationError::Duplicate { .. } => {
                AppError::new(ErrorCode::DuplicateEntry, err.to_string())
            }
            _ => AppError::validation(err.to_string()),
        }
    }
}

impl From<ConfigError> for AppError {
    fn from(err: ConfigError) -> Self {
        AppError::new(ErrorCode::Configuration, err.to_string())
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{:?}] {}", self.code, self.message)
    }
}

impl std::error::Error for AppError {}

/// Result type for command handlers.
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code_serialization() {
        let err = AppError::new(ErrorCode::ConstraintViolation, "in use");
        let json = serde_json::to_string(&err).unwrap();
        assert_eq!(json, r#"{"code":"CONSTRAINT_VIOLATION","message":"in use"}"#);
    }

    #[test]
    fn test_db_error_mapping() {
        let fk = AppError::from(DbError::ForeignKeyViolation {
            message: "FOREIGN KEY constraint failed".to_string(),
        });
        assert!(fk.is_constraint_violation());

        let dup = AppError::from(DbError::duplicate("category", "Dairy"));
        assert_eq!(dup.code, ErrorCode::DuplicateEntry);

        let missing = AppError::from(DbError::not_found("Shopping item", "abc"));
        assert_eq!(missing.code, ErrorCode::NotFound);
    }

    #[test]
    fn test_validation_mapping() {
        let err = AppError::from(ValidationError::required("name"));
        assert_eq!(err.code, ErrorCode::ValidationError);

        let err = AppError::from(CoreError::from(ValidationError::duplicate("item", "Milk")));
        assert_eq!(err.code, ErrorCode::DuplicateEntry);
    }
}
