//! Error types for the LiftLink persistence core
//!
//! All errors use thiserror for structured error handling.
//! These errors can be serialized to the mobile shell.

use sqlx::error::ErrorKind;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Storage unavailable: {0}")]
    StorageUnavailable(#[source] sqlx::Error),

    #[error("No platform data directory available")]
    DataDir,

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Constraint violation: {0}")]
    Constraint(#[source] sqlx::Error),

    #[error("Database error: {0}")]
    Database(#[source] sqlx::Error),

    #[error("Data integrity error: {0}")]
    Integrity(String),
}

/// Route constraint failures to their own variant so callers can tell
/// an expected conflict (duplicate name, missing parent row) apart from
/// an engine fault.
impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match err.as_database_error().map(|db| db.kind()) {
            Some(ErrorKind::UniqueViolation)
            | Some(ErrorKind::ForeignKeyViolation)
            | Some(ErrorKind::NotNullViolation)
            | Some(ErrorKind::CheckViolation) => StoreError::Constraint(err),
            _ => StoreError::Database(err),
        }
    }
}

impl serde::Serialize for StoreError {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

pub type Result<T> = std::result::Result<T, StoreError>;
