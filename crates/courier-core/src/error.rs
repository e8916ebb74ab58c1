//! Unified error types for Courier.

use thiserror::Error;

/// Result type alias using CourierError.
pub type Result<T> = std::result::Result<T, CourierError>;

#[derive(Error, Debug)]
pub enum CourierError {
    // Pipeline stage errors
    #[error("Producer error: {0}")]
    Producer(String),

    #[error("Content source error: {0}")]
    Content(String),

    #[error("Notifier error: {0}")]
    Notify(String),

    // Config errors
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid cron expression: {0}")]
    Cron(String),

    // Transport errors
    #[error("HTTP error: {0}")]
    Http(String),

    #[error("Webhook error: {0}")]
    Webhook(String),

    // General errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl CourierError {
    pub fn producer(msg: impl Into<String>) -> Self {
        Self::Producer(msg.into())
    }

    pub fn content(msg: impl Into<String>) -> Self {
        Self::Content(msg.into())
    }

    pub fn notify(msg: impl Into<String>) -> Self {
        Self::Notify(msg.into())
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn cron(msg: impl Into<String>) -> Self {
        Self::Cron(msg.into())
    }

    pub fn webhook(msg: impl Into<String>) -> Self {
        Self::Webhook(msg.into())
    }
}
