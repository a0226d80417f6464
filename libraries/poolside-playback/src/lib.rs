//! Poolside - Playback Session
//!
//! Platform-agnostic playback core for the Poolside streaming client.
//!
//! This crate provides:
//! - Catalog of playlists and tracks, with case-insensitive slug lookup
//! - Seedable uniform random selection of playlists and tracks
//! - Volume control (0-120, 100 = unity, base-2 gain)
//! - Playback session state machine with single-active-stream enforcement
//! - Periodic progress text (`MM:SS / MM:SS`)
//! - Sample-rate conversion ahead of a fixed-rate sink
//!
//! # Architecture
//!
//! `poolside-playback` does no I/O of its own:
//! - No dependency on reqwest (see `poolside-client`)
//! - No dependency on Symphonia (see `poolside-audio`)
//! - No dependency on CPAL (see `poolside-audio-desktop`)
//!
//! Remote fetching, decoding and audio output are provided through the traits
//! in [`traits`].
//!
//! # Example
//!
//! ```rust,no_run
//! use poolside_playback::{PlaybackSession, SessionConfig};
//! # use poolside_playback::traits::{Decoder, Remote, Sink};
//! # use std::sync::Arc;
//! # async fn run(remote: Arc<dyn Remote>, decoder: Arc<dyn Decoder>, sink: Arc<dyn Sink>)
//! #     -> poolside_playback::Result<()> {
//! let session = PlaybackSession::new(remote, decoder, sink, SessionConfig::default());
//!
//! session.load().await?;
//! let playlist = session.lookup_by_slug("poolside-fm");
//! let track = playlist.as_ref().and_then(|p| session.random_track_from(p));
//!
//! session.play(track, || println!("track finished")).await?;
//! session.set_volume(80);
//! # Ok(())
//! # }
//! ```

pub mod catalog;
pub mod error;
pub mod progress;
pub mod random;
pub mod resample;
pub mod session;
pub mod source;
mod state;
pub mod traits;
pub mod types;
pub mod volume;

pub use catalog::{Catalog, Playlist, Track};
pub use error::{PlaybackError, Result};
pub use progress::format_progress;
pub use random::RandomSelector;
pub use session::PlaybackSession;
pub use source::{BufferedStreamer, Format, Frame, Streamer};
pub use traits::{Decoded, Decoder, Remote, Sink, Source, SourceStatus};
pub use types::{PlaybackState, ResampleQuality, SessionConfig, SessionEvent};
pub use volume::Volume;
