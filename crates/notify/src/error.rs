//! Error types for chat delivery.

use thiserror::Error;

/// Errors that can occur when delivering a chat message.
#[derive(Debug, Error)]
pub enum ChannelError {
    /// HTTP request failed
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Channel is not configured
    #[error("Channel not configured: {0}")]
    NotConfigured(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The chat client process could not be spawned or read
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The chat client process exited unsuccessfully
    #[error("{command} exited with {status}: {stderr}")]
    CommandFailed {
        command: String,
        status: String,
        stderr: String,
    },

    /// The chat service answered with an error payload
    #[error("Chat API error: {0}")]
    Api(String),

    /// Rate limited by the service
    #[error("Rate limited, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },
}
