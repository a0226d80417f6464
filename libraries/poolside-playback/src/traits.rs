//! Collaborator seams of a playback session
//!
//! The session never talks HTTP, parses codecs or opens devices itself. It is
//! driven through these traits, implemented by platform crates and by test fakes.

use crate::{
    error::Result,
    source::{Format, Frame, Streamer},
};
use async_trait::async_trait;
use bytes::Bytes;
use std::sync::Arc;

/// Remote catalog and stream-proxy endpoints
#[async_trait]
pub trait Remote: Send + Sync {
    /// Fetch the raw catalog payload
    async fn fetch_catalog(&self) -> Result<Bytes>;

    /// Fetch the encoded audio of one track
    async fn fetch_track(&self, track_id: i64) -> Result<Bytes>;
}

/// Result of decoding a track
pub struct Decoded {
    pub streamer: Box<dyn Streamer>,
    pub format: Format,
}

impl std::fmt::Debug for Decoded {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Decoded")
            .field("format", &self.format)
            .field("frames", &self.streamer.len())
            .finish()
    }
}

/// Turns encoded bytes into a frame stream.
///
/// Called from a blocking worker, so implementations may do CPU-heavy work.
pub trait Decoder: Send + Sync {
    fn decode(&self, data: Bytes) -> Result<Decoded>;
}

/// Outcome of one render pass
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceStatus {
    /// More frames will follow
    Active,

    /// The stream is exhausted; the sink should report it and stop pulling
    Drained,
}

/// Frame provider the sink pulls from on its own audio clock
pub trait Source: Send + Sync {
    /// Fill `out` completely. Frames past the end of the stream are silence.
    fn render(&self, out: &mut [Frame]) -> SourceStatus;
}

/// Audio output running at a fixed sample rate
pub trait Sink: Send + Sync {
    /// Operating sample rate in Hz
    fn sample_rate(&self) -> u32;

    /// Start rendering `source`, replacing whatever was playing.
    ///
    /// `on_drained` runs at most once, from the sink's audio context, after
    /// `source` reports [`SourceStatus::Drained`]. Implementations must not
    /// call into `source` from inside `play` or `clear`.
    fn play(&self, source: Arc<dyn Source>, on_drained: Box<dyn FnOnce() + Send>);

    /// Stop rendering and drop the current source without reporting it drained
    fn clear(&self);
}
