use thiserror::Error;

use crate::model::UnknownVariant;

/// Errors that can occur when interacting with the store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A row lock could not be acquired within the configured lock timeout.
    #[error("Timed out waiting for lock on {0}")]
    LockTimeout(String),

    /// A stored row could not be mapped back to a record.
    #[error("Corrupt row: {0}")]
    Corrupt(#[from] UnknownVariant),

    /// A stored number does not fit the record's field.
    #[error("Value out of range in column {0}")]
    OutOfRange(&'static str),

    /// A database error occurred.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A database migration error occurred.
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
