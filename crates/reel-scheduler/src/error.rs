//! Scheduler error types.

use reel_store::StoreError;
use thiserror::Error;

pub type SchedulerResult<T> = Result<T, SchedulerError>;

#[derive(Debug, Error)]
pub enum SchedulerError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Failed to load configuration: {0}")]
    ConfigLoad(#[from] config::ConfigError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl SchedulerError {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn invalid_request(msg: impl Into<String>) -> Self {
        Self::InvalidRequest(msg.into())
    }

    /// Check if the configuration was rejected or could not be read.
    pub fn is_config(&self) -> bool {
        matches!(self, SchedulerError::Config(_) | SchedulerError::ConfigLoad(_))
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, SchedulerError::Store(e) if e.is_not_found())
    }

    pub fn is_invalid_transition(&self) -> bool {
        matches!(self, SchedulerError::Store(e) if e.is_invalid_transition())
    }
}
