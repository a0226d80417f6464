//! Sample-rate conversion stage
//!
//! Wraps a decoded stream with a rubato sinc resampler so that it can be fed
//! to a sink running at a different fixed rate.

use crate::{
    error::{PlaybackError, Result},
    source::{Frame, Streamer},
    types::ResampleQuality,
};
use rubato::{
    Resampler as RubatoResamplerTrait, SincFixedIn, SincInterpolationParameters,
    SincInterpolationType, WindowFunction,
};
use std::collections::VecDeque;
use tracing::{debug, warn};

const CHANNELS: usize = 2;

/// Streamer adapter converting `input_rate` frames to `output_rate` frames.
///
/// `position()` and `len()` report the inner stream's values, so progress is
/// still measured at the source rate.
pub struct Resampled {
    inner: Box<dyn Streamer>,
    resampler: SincFixedIn<f32>,
    /// Converted frames not yet handed out
    pending: VecDeque<Frame>,
    /// Input staging buffer
    scratch: Vec<Frame>,
    ratio: f64,
    /// Leading filter-delay frames still to be dropped
    skip: usize,
    /// Input frames pulled from `inner` so far
    consumed: usize,
    /// Output frames produced so far, never more than `consumed * ratio`
    emitted: usize,
    exhausted: bool,
}

impl Resampled {
    /// Create a resampling stage around `inner`
    pub fn new(
        inner: Box<dyn Streamer>,
        input_rate: u32,
        output_rate: u32,
        quality: ResampleQuality,
    ) -> Result<Self> {
        if input_rate == 0 || output_rate == 0 {
            return Err(PlaybackError::Resample(format!(
                "Invalid sample rates: {} -> {}",
                input_rate, output_rate
            )));
        }

        let ratio = f64::from(output_rate) / f64::from(input_rate);
        let chunk_size = match quality {
            ResampleQuality::Fast | ResampleQuality::Balanced => 1024,
            ResampleQuality::High => 2048,
        };

        let resampler = SincFixedIn::<f32>::new(
            ratio,
            2.0, // max_resample_ratio_relative
            quality_to_params(quality),
            chunk_size,
            CHANNELS,
        )
        .map_err(|e| PlaybackError::Resample(format!("SincFixedIn creation failed: {}", e)))?;

        let skip = resampler.output_delay();

        debug!(
            input_rate,
            output_rate,
            ?quality,
            delay = skip,
            "Created resampling stage"
        );

        Ok(Self {
            inner,
            resampler,
            pending: VecDeque::with_capacity(chunk_size * 2),
            scratch: Vec::with_capacity(chunk_size),
            ratio,
            skip,
            consumed: 0,
            emitted: 0,
            exhausted: false,
        })
    }

    /// Pull one input chunk through the resampler
    fn refill(&mut self) {
        let needed = self.resampler.input_frames_next();
        self.scratch.clear();
        self.scratch.resize(needed, [0.0; 2]);
        let read = self.inner.stream(&mut self.scratch);
        self.consumed += read;
        let waves = deinterleave(&self.scratch[..read]);

        if read == needed {
            match self.resampler.process(&waves, None) {
                Ok(output) => self.push_output(&output),
                Err(e) => self.fail(&e),
            }
            return;
        }

        // Inner stream ran short: convert the tail, then flush the filter
        match self.resampler.process_partial(Some(waves.as_slice()), None) {
            Ok(output) => self.push_output(&output),
            Err(e) => return self.fail(&e),
        }
        match self.resampler.process_partial::<Vec<f32>>(None, None) {
            Ok(output) => self.push_output(&output),
            Err(e) => return self.fail(&e),
        }
        self.exhausted = true;
    }

    fn push_output(&mut self, output: &[Vec<f32>]) {
        let (Some(left), Some(right)) = (output.first(), output.get(1)) else {
            return;
        };
        // Inner length may be an estimate, so the cap follows what was read
        let limit = (self.consumed as f64 * self.ratio).ceil() as usize;

        for (&l, &r) in left.iter().zip(right) {
            if self.skip > 0 {
                self.skip -= 1;
                continue;
            }
            if self.emitted >= limit {
                break;
            }
            self.pending.push_back([l, r]);
            self.emitted += 1;
        }
    }

    fn fail(&mut self, err: &dyn std::fmt::Display) {
        warn!(error = %err, "Resampling failed, ending stream");
        self.exhausted = true;
    }
}

impl Streamer for Resampled {
    fn stream(&mut self, frames: &mut [Frame]) -> usize {
        while self.pending.len() < frames.len() && !self.exhausted {
            self.refill();
        }

        let count = self.pending.len().min(frames.len());
        for (slot, frame) in frames.iter_mut().zip(self.pending.drain(..count)) {
            *slot = frame;
        }
        count
    }

    fn position(&self) -> usize {
        self.inner.position()
    }

    fn len(&self) -> usize {
        self.inner.len()
    }
}

/// Convert quality preset to rubato parameters
fn quality_to_params(quality: ResampleQuality) -> SincInterpolationParameters {
    match quality {
        ResampleQuality::Fast => SincInterpolationParameters {
            sinc_len: 64,
            f_cutoff: 0.9,
            interpolation: SincInterpolationType::Linear,
            oversampling_factor: 128,
            window: WindowFunction::Blackman,
        },
        ResampleQuality::Balanced => SincInterpolationParameters {
            sinc_len: 128,
            f_cutoff: 0.95,
            interpolation: SincInterpolationType::Cubic,
            oversampling_factor: 256,
            window: WindowFunction::BlackmanHarris,
        },
        ResampleQuality::High => SincInterpolationParameters {
            sinc_len: 256,
            f_cutoff: 0.99,
            interpolation: SincInterpolationType::Cubic,
            oversampling_factor: 512,
            window: WindowFunction::BlackmanHarris,
        },
    }
}

/// Split stereo frames into per-channel buffers
fn deinterleave(frames: &[Frame]) -> Vec<Vec<f32>> {
    let mut left = Vec::with_capacity(frames.len());
    let mut right = Vec::with_capacity(frames.len());
    for frame in frames {
        left.push(frame[0]);
        right.push(frame[1]);
    }
    vec![left, right]
}
