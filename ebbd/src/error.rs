//! Daemon error types.

use ebb_domain::DomainError;
use ebb_engine::EngineError;
use ebb_exec::{ExecError, FeedError};
use ebb_store::StoreError;
use thiserror::Error;

/// Daemon-level errors.
#[derive(Debug, Error)]
pub enum DaemonError {
    /// Domain error
    #[error("domain error: {0}")]
    Domain(#[from] DomainError),

    /// Engine error
    #[error("engine error: {0}")]
    Engine(#[from] EngineError),

    /// Feed error
    #[error("feed error: {0}")]
    Feed(#[from] FeedError),

    /// Execution error
    #[error("execution error: {0}")]
    Exec(#[from] ExecError),

    /// Store error
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),
}

/// Result type for daemon operations.
pub type DaemonResult<T> = Result<T, DaemonError>;
