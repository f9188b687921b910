//! Store error types.

use thiserror::Error;

/// Errors a habit store can report.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// No habit with this id exists
    #[error("Habit not found: {0}")]
    NotFound(String),

    /// Check-in on a habit that is already done for the day
    #[error("Habit already completed today: {0}")]
    AlreadyCompleted(String),

    /// The backend could not be reached or returned something unusable
    #[error("Store unavailable: {0}")]
    Transport(String),
}
