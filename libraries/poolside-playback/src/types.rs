//! Core types for playback sessions

use crate::catalog::Track;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Playback session state
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlaybackState {
    /// No track selected
    #[default]
    Idle,

    /// Track selected, stream being fetched and decoded
    Loading,

    /// Stream installed and rendering
    Playing,

    /// Stream installed, output silenced
    Paused,

    /// Stream ended naturally (transient, folds back into `Idle`)
    Finished,
}

/// Resampling quality preset
///
/// Chosen once per session and used for every stream whose rate differs from
/// the sink's.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResampleQuality {
    /// Short sinc, linear interpolation
    Fast,

    /// Medium sinc, cubic interpolation
    #[default]
    Balanced,

    /// Long sinc, cubic interpolation
    High,
}

/// Session construction parameters
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Initial volume level (clamped)
    pub volume: i32,

    /// Progress refresh cadence
    pub progress_interval: Duration,

    pub resample_quality: ResampleQuality,

    /// Fixed seed for random selection; `None` seeds from OS entropy
    pub seed: Option<u64>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            volume: 100,
            progress_interval: Duration::from_secs(1),
            resample_quality: ResampleQuality::default(),
            seed: None,
        }
    }
}

/// Events broadcast by a session to its subscribers
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    StateChanged(PlaybackState),

    TrackChanged(Option<Track>),

    VolumeChanged(i32),

    /// A catalog load replaced the previous catalog
    CatalogLoaded { playlists: usize },
}
