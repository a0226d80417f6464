//! Error types for playback sessions

use thiserror::Error;

/// Playback errors
#[derive(Debug, Error)]
pub enum PlaybackError {
    /// Transport failure, timeout, or non-success status on either fetch
    #[error("Network error: {0}")]
    Network(String),

    /// Malformed catalog payload or undecodable audio stream
    #[error("Decode error: {0}")]
    Decode(String),

    /// Caller passed an unusable argument (e.g. no track)
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// A newer `play` call replaced this one before it could install its stream
    #[error("Superseded by a newer play request")]
    Superseded,

    /// Resampling stage could not be built
    #[error("Resample error: {0}")]
    Resample(String),
}

/// Result type for playback operations
pub type Result<T> = std::result::Result<T, PlaybackError>;
