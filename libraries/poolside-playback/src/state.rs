//! Shared mutable session state
//!
//! Everything the caller, the audio context and the progress task touch lives
//! behind one mutex. Guards are never held across an await point.

use crate::{
    catalog::Track,
    progress::format_progress,
    source::{Format, Streamer},
    types::PlaybackState,
    volume::Volume,
};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

pub(crate) type Completion = Box<dyn FnOnce() + Send>;

/// The one installed stream handle
pub(crate) struct ActiveStream {
    /// Generation of the `play` call that installed it
    pub generation: u64,
    pub streamer: Box<dyn Streamer>,
    /// Format of the decoded stream (before resampling)
    pub format: Format,
    pub paused: bool,
    pub on_complete: Option<Completion>,
}

pub(crate) struct SessionState {
    pub playback: PlaybackState,
    pub track: Option<Track>,
    pub active: Option<ActiveStream>,
    pub volume: Volume,
    pub progress: Option<String>,
    /// Bumped by every `play`; stale work compares against it
    pub generation: u64,
}

impl SessionState {
    pub fn new(volume: Volume) -> Self {
        Self {
            playback: PlaybackState::Idle,
            track: None,
            active: None,
            volume,
            progress: None,
            generation: 0,
        }
    }

    /// Recompute the progress text from the active handle, if any
    pub fn refresh_progress(&mut self) {
        if let Some(active) = &self.active {
            self.progress = Some(format_progress(
                active.streamer.position(),
                active.streamer.len(),
                active.format.sample_rate,
            ));
        }
    }

    /// Remove the active handle and its progress text
    pub fn take_active(&mut self) -> Option<ActiveStream> {
        self.progress = None;
        self.active.take()
    }
}

pub(crate) type SharedState = Arc<Mutex<SessionState>>;

/// Lock the state, recovering the data if a holder panicked
pub(crate) fn lock(state: &Mutex<SessionState>) -> MutexGuard<'_, SessionState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}
