//! Crate-wide error taxonomy.
//!
//! Callers branch on the variant: `NotFound` and the guard failures are
//! usage errors and must not be retried; `Conflict` is a retryable busy
//! signal; `Io`/`Json`/`Archive` abort the operation with prior state
//! intact.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, TrackerError>;

#[derive(Debug, Error)]
pub enum TrackerError {
    /// Customer, archive record, or backup artifact missing.
    #[error("not found: {0}")]
    NotFound(String),

    /// An operation was attempted against a stage that forbids it, e.g.
    /// archiving a customer that is not fully packed.
    #[error("invalid state: {0}")]
    InvalidState(String),

    /// A lifecycle transition violated a cross-axis guard, e.g. shipping a
    /// customer that has not been packed.
    #[error("invalid transition: {0}")]
    InvalidTransition(String),

    /// Another lifecycle mutation is in flight for the same customer.
    /// Wait and retry.
    #[error("customer `{0}` is busy with another operation")]
    Conflict(String),

    /// Backup artifact creation, verification, or extraction failed.
    #[error("archive artifact error: {0}")]
    Artifact(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("record serialization failed: {0}")]
    Json(#[from] serde_json::Error),
}

impl TrackerError {
    /// Whether the caller may retry after backing off.
    pub fn is_retryable(&self) -> bool {
        matches!(self, TrackerError::Conflict(_))
    }
}
