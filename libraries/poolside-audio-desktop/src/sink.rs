/// CPAL-based sink with a dedicated audio thread
use crate::error::{AudioError, Result};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{
    BufferSize, Device, SampleFormat, Stream, StreamConfig, SupportedBufferSize,
    SupportedStreamConfigRange,
};
use crossbeam_channel::{bounded, Receiver, Sender};
use poolside_playback::{Frame, Sink, Source, SourceStatus};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use tracing::{debug, info, warn};

/// Default fixed operating rate
pub const DEFAULT_SAMPLE_RATE: u32 = 44100;

const CHANNELS: u16 = 2;

/// Source currently being rendered
struct Playing {
    source: Arc<dyn Source>,
    on_drained: Option<Box<dyn FnOnce() + Send>>,
}

/// Slot shared between the control side and the audio callback
#[derive(Default)]
struct Slot {
    playing: Mutex<Option<Playing>>,
}

impl Slot {
    fn lock(&self) -> MutexGuard<'_, Option<Playing>> {
        self.playing.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Commands sent to the audio thread
enum AudioCommand {
    /// Stop the stream and exit
    Shutdown,
}

/// CPAL audio sink
///
/// **Architecture**: a dedicated audio thread owns the CPAL `Stream`, so the
/// sink itself is `Send + Sync` on every platform. The stream runs for the
/// sink's whole life and renders silence while no source is installed.
pub struct CpalSink {
    sample_rate: u32,
    slot: Arc<Slot>,
    command_tx: Sender<AudioCommand>,
    _audio_thread: Option<JoinHandle<()>>,
}

impl CpalSink {
    /// Open the default output device at 44100 Hz with a 100 ms buffer
    pub fn new() -> Result<Self> {
        Self::with_config(DEFAULT_SAMPLE_RATE, DEFAULT_SAMPLE_RATE / 10)
    }

    /// Open the default output device at a fixed rate and buffer size (frames)
    ///
    /// The buffer size is clamped to the range the device reports.
    ///
    /// # Errors
    /// Returns an error if no device is available, the device cannot play
    /// stereo f32 at `sample_rate`, or the stream cannot be started
    pub fn with_config(sample_rate: u32, buffer_frames: u32) -> Result<Self> {
        let slot = Arc::new(Slot::default());
        let (command_tx, command_rx) = bounded::<AudioCommand>(4);
        let (ready_tx, ready_rx) = bounded::<Result<()>>(1);

        let slot_clone = Arc::clone(&slot);
        let audio_thread = thread::Builder::new()
            .name("poolside-audio".into())
            .spawn(move || {
                Self::audio_thread_run(sample_rate, buffer_frames, slot_clone, ready_tx, command_rx);
            })?;

        ready_rx
            .recv()
            .map_err(|_| AudioError::ThreadError("Audio thread exited during startup".into()))??;

        info!(sample_rate, buffer_frames, "Audio output started");

        Ok(Self {
            sample_rate,
            slot,
            command_tx,
            _audio_thread: Some(audio_thread),
        })
    }

    /// Audio thread main loop
    ///
    /// Opens the device, starts the stream and then blocks until shutdown.
    fn audio_thread_run(
        sample_rate: u32,
        buffer_frames: u32,
        slot: Arc<Slot>,
        ready_tx: Sender<Result<()>>,
        command_rx: Receiver<AudioCommand>,
    ) {
        let stream = match Self::open_stream(sample_rate, buffer_frames, slot) {
            Ok(stream) => {
                let _ = ready_tx.send(Ok(()));
                stream
            }
            Err(e) => {
                let _ = ready_tx.send(Err(e));
                return;
            }
        };

        // Keep the stream alive until shutdown or the sink is dropped
        while let Ok(cmd) = command_rx.recv() {
            match cmd {
                AudioCommand::Shutdown => break,
            }
        }

        drop(stream);
        debug!("Audio thread stopped");
    }

    fn open_stream(sample_rate: u32, buffer_frames: u32, slot: Arc<Slot>) -> Result<Stream> {
        let host = cpal::default_host();
        let device: Device = host
            .default_output_device()
            .ok_or(AudioError::DeviceNotFound)?;

        let config = negotiate_config(
            sample_rate,
            buffer_frames,
            device.supported_output_configs()?,
        )?;
        debug!(sample_rate, buffer = ?config.buffer_size, "Negotiated output config");

        let mut scratch: Vec<Frame> = Vec::new();
        let stream = device.build_output_stream(
            &config,
            move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                render_into(&slot, data, &mut scratch);
            },
            |err| warn!(error = %err, "Audio stream error"),
            None,
        )?;
        stream.play()?;

        Ok(stream)
    }
}

impl Sink for CpalSink {
    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn play(&self, source: Arc<dyn Source>, on_drained: Box<dyn FnOnce() + Send>) {
        *self.slot.lock() = Some(Playing {
            source,
            on_drained: Some(on_drained),
        });
    }

    fn clear(&self) {
        // Drop outside the slot lock
        let previous = self.slot.lock().take();
        drop(previous);
    }
}

impl Drop for CpalSink {
    fn drop(&mut self) {
        self.clear();
        // Audio thread will exit and join handle will be dropped
        let _ = self.command_tx.send(AudioCommand::Shutdown);
    }
}

/// Pick a stereo f32 stream config at exactly `sample_rate`.
///
/// `buffer_frames` is clamped to the matching range's buffer limits; devices
/// that do not report limits get their default buffer size.
fn negotiate_config(
    sample_rate: u32,
    buffer_frames: u32,
    supported: impl IntoIterator<Item = SupportedStreamConfigRange>,
) -> Result<StreamConfig> {
    let range = supported
        .into_iter()
        .find(|range| {
            range.channels() == CHANNELS
                && range.sample_format() == SampleFormat::F32
                && (range.min_sample_rate()..=range.max_sample_rate()).contains(&sample_rate)
        })
        .ok_or_else(|| {
            AudioError::UnsupportedConfig(format!(
                "device cannot play {} Hz stereo f32",
                sample_rate
            ))
        })?;

    let buffer_size = match range.buffer_size() {
        SupportedBufferSize::Range { min, max } => BufferSize::Fixed(buffer_frames.clamp(*min, *max)),
        SupportedBufferSize::Unknown => BufferSize::Default,
    };

    Ok(StreamConfig {
        channels: CHANNELS,
        sample_rate,
        buffer_size,
    })
}

/// Audio callback body (runs in real-time audio thread)
///
/// The slot lock is released before the source renders, so the source may
/// take its own locks without nesting under the slot.
fn render_into(slot: &Slot, data: &mut [f32], scratch: &mut Vec<Frame>) {
    let Some(source) = slot
        .lock()
        .as_ref()
        .map(|playing| Arc::clone(&playing.source))
    else {
        data.fill(0.0);
        return;
    };

    let frames = data.len() / CHANNELS as usize;
    scratch.clear();
    scratch.resize(frames, [0.0; 2]);
    let status = source.render(scratch);

    for (out, frame) in data.chunks_exact_mut(CHANNELS as usize).zip(scratch.iter()) {
        out[0] = frame[0];
        out[1] = frame[1];
    }

    if status == SourceStatus::Drained {
        let finished = {
            let mut playing = slot.lock();
            match playing.as_ref() {
                Some(current) if Arc::ptr_eq(&current.source, &source) => playing.take(),
                _ => None,
            }
        };
        if let Some(on_drained) = finished.and_then(|playing| playing.on_drained) {
            on_drained();
        }
    }
}
