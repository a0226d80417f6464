//! Pull-based audio streams
//!
//! A `Streamer` hands out interleaved stereo frames on demand. Positions and
//! lengths are counted in frames at the stream's own sample rate.

use std::time::Duration;

/// One stereo frame, left then right, in [-1.0, 1.0]
pub type Frame = [f32; 2];

/// Format descriptor of a decoded stream
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Format {
    pub sample_rate: u32,

    /// Channel count of the encoded source (frames are always stereo)
    pub channels: u16,
}

impl Format {
    pub fn new(sample_rate: u32, channels: u16) -> Self {
        Self {
            sample_rate,
            channels,
        }
    }

    /// Wall-clock duration of `frames` at this format's rate
    pub fn duration(&self, frames: usize) -> Duration {
        if self.sample_rate == 0 {
            return Duration::ZERO;
        }
        let nanos = frames as u128 * 1_000_000_000 / u128::from(self.sample_rate);
        Duration::from_nanos(nanos as u64)
    }

    /// Frame count covering `duration` at this format's rate
    pub fn frames(&self, duration: Duration) -> usize {
        (duration.as_nanos() * u128::from(self.sample_rate) / 1_000_000_000) as usize
    }
}

/// Decoded, seekless stream of stereo frames
pub trait Streamer: Send {
    /// Fill `frames` from the stream and return how many were written.
    ///
    /// Returning fewer than `frames.len()` means the stream is exhausted.
    fn stream(&mut self, frames: &mut [Frame]) -> usize;

    /// Current position in frames
    fn position(&self) -> usize;

    /// Total length in frames
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Streamer over a fully decoded buffer
#[derive(Debug, Clone)]
pub struct BufferedStreamer {
    frames: Vec<Frame>,
    position: usize,
}

impl BufferedStreamer {
    pub fn new(frames: Vec<Frame>) -> Self {
        Self {
            frames,
            position: 0,
        }
    }
}

impl Streamer for BufferedStreamer {
    fn stream(&mut self, frames: &mut [Frame]) -> usize {
        let remaining = &self.frames[self.position..];
        let count = remaining.len().min(frames.len());
        frames[..count].copy_from_slice(&remaining[..count]);
        self.position += count;
        count
    }

    fn position(&self) -> usize {
        self.position
    }

    fn len(&self) -> usize {
        self.frames.len()
    }
}
