//! Store error types.

use thiserror::Error;

/// Errors from state persistence.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Filesystem failure while reading or replacing the state file
    #[error("state file I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// State file exists but does not parse as a position record
    #[error("state file corrupt: {0}")]
    Corrupt(String),

    /// State record failed to serialize
    #[error("failed to encode state: {0}")]
    Encode(String),
}
