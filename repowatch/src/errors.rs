//! Error types for repowatch

use thiserror::Error;

/// Main error type for repowatch
#[derive(Error, Debug)]
pub enum WatchError {
    #[error("HTTP error: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Command error: {0}")]
    CommandError(String),

    #[error("Git error: {0}")]
    GitError(String),

    #[error("Webhook error: {0}")]
    WebhookError(String),

    #[error("Logging error: {0}")]
    LoggingError(String),
}
