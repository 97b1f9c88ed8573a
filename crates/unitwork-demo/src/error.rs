//! Unitwork demo — error types.

use thiserror::Error;
use unitwork_core::error::DomainError;

/// Startup and runtime errors for the demo binary.
#[derive(Debug, Error)]
pub enum AppError {
    /// A required environment variable is missing or invalid.
    #[error("configuration error: {0}")]
    Config(String),

    /// Registry setup or event dispatch failed.
    #[error("domain error: {0}")]
    Domain(#[from] DomainError),

    /// A blocking publish task panicked or was cancelled.
    #[error("task error: {0}")]
    Task(#[from] tokio::task::JoinError),

    /// Committed rows could not be rendered as JSON.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
