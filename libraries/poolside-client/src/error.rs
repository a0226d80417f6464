//! Error types for the Poolside client.

use poolside_playback::PlaybackError;
use thiserror::Error;

/// Errors that can occur when talking to the Poolside API.
#[derive(Error, Debug)]
pub enum ClientError {
    /// HTTP request failed (transport, timeout, body read)
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// Server returned a non-success status
    #[error("Server error ({status}): {message}")]
    ServerError { status: u16, message: String },

    /// Invalid endpoint URL
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
}

impl From<ClientError> for PlaybackError {
    fn from(err: ClientError) -> Self {
        PlaybackError::Network(err.to_string())
    }
}

/// Result type for client operations.
pub type Result<T> = std::result::Result<T, ClientError>;
