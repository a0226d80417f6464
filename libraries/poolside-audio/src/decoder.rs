//! Symphonia track decoder
//!
//! The probe and the first packet are decoded up front so that unreadable
//! bodies fail `play`. Everything after that is decoded packet by packet as
//! the sink pulls frames.

use bytes::Bytes;
use poolside_playback::{Decoded, Decoder, Format, Frame, PlaybackError, Result, Streamer};
use std::io::Cursor;
use symphonia::core::audio::{AudioBuffer, AudioBufferRef, Signal};
use symphonia::core::codecs::{self, DecoderOptions};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::{FormatOptions, FormatReader};
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use symphonia::core::sample::Sample;
use tracing::{debug, warn};

/// Decoder for the stream proxy's audio bodies
#[derive(Debug, Clone)]
pub struct SymphoniaDecoder {
    /// Extension hint for the format probe
    extension: Option<String>,
}

impl SymphoniaDecoder {
    /// Decoder that probes without a format hint
    pub fn new() -> Self {
        Self { extension: None }
    }

    /// Decoder that hints the probe with a file extension (e.g. `"mp3"`)
    pub fn with_extension(extension: impl Into<String>) -> Self {
        Self {
            extension: Some(extension.into()),
        }
    }
}

impl Default for SymphoniaDecoder {
    /// The stream proxy serves MP3
    fn default() -> Self {
        Self::with_extension("mp3")
    }
}

impl Decoder for SymphoniaDecoder {
    fn decode(&self, data: Bytes) -> Result<Decoded> {
        let byte_len = data.len();
        let mss = MediaSourceStream::new(Box::new(Cursor::new(data)), Default::default());

        let mut hint = Hint::new();
        if let Some(ext) = &self.extension {
            hint.with_extension(ext);
        }

        let probed = symphonia::default::get_probe()
            .format(
                &hint,
                mss,
                &FormatOptions::default(),
                &MetadataOptions::default(),
            )
            .map_err(|e| PlaybackError::Decode(format!("Failed to probe stream: {}", e)))?;
        let reader = probed.format;

        let track = reader
            .default_track()
            .ok_or_else(|| PlaybackError::Decode("No audio tracks found".into()))?;
        let track_id = track.id;
        let params = track.codec_params.clone();

        let decoder = symphonia::default::get_codecs()
            .make(&params, &DecoderOptions::default())
            .map_err(|e| PlaybackError::Decode(format!("Failed to create decoder: {}", e)))?;

        let mut streamer = PacketStreamer {
            reader,
            decoder,
            track_id,
            pending: Vec::new(),
            cursor: 0,
            position: 0,
            n_frames: params.n_frames.map(|n| n as usize),
            finished: false,
            skipped: 0,
        };

        let spec = streamer
            .decode_next()?
            .ok_or_else(|| PlaybackError::Decode("Stream contains no audio".into()))?;

        let sample_rate = params
            .sample_rate
            .or(Some(spec.0))
            .filter(|rate| *rate > 0)
            .ok_or_else(|| PlaybackError::Decode("Stream has no sample rate".into()))?;
        let channels = params.channels.map_or(spec.1, |c| c.count() as u16);

        let format = Format::new(sample_rate, channels);
        debug!(
            bytes = byte_len,
            frames = ?streamer.n_frames,
            sample_rate,
            channels,
            "Opened track stream"
        );

        Ok(Decoded {
            streamer: Box::new(streamer),
            format,
        })
    }
}

/// Streamer decoding one packet at a time from a symphonia reader
struct PacketStreamer {
    reader: Box<dyn FormatReader>,
    decoder: Box<dyn codecs::Decoder>,
    track_id: u32,
    /// Frames of the last decoded packet
    pending: Vec<Frame>,
    cursor: usize,
    position: usize,
    /// Frame count declared by the container
    n_frames: Option<usize>,
    finished: bool,
    skipped: usize,
}

impl PacketStreamer {
    /// Decode packets until one yields audio.
    ///
    /// Returns the packet's `(rate, channels)`, or `None` at end of stream.
    fn decode_next(&mut self) -> Result<Option<(u32, u16)>> {
        self.pending.clear();
        self.cursor = 0;

        while !self.finished {
            let packet = match self.reader.next_packet() {
                Ok(packet) => packet,
                Err(SymphoniaError::IoError(e))
                    if e.kind() == std::io::ErrorKind::UnexpectedEof =>
                {
                    self.finish();
                    break;
                }
                Err(SymphoniaError::ResetRequired) => {
                    self.finish();
                    break;
                }
                Err(e) => {
                    self.finish();
                    return Err(PlaybackError::Decode(format!(
                        "Error reading packet: {}",
                        e
                    )));
                }
            };

            // Skip packets from other tracks
            if packet.track_id() != self.track_id {
                continue;
            }

            match self.decoder.decode(&packet) {
                Ok(decoded) => {
                    let spec = *decoded.spec();
                    append_stereo(decoded, &mut self.pending);
                    if !self.pending.is_empty() {
                        return Ok(Some((spec.rate, spec.channels.count() as u16)));
                    }
                }
                // Corrupt packet: drop it and keep going
                Err(SymphoniaError::DecodeError(msg)) => {
                    self.skipped += 1;
                    debug!(error = msg, "Skipping undecodable packet");
                }
                Err(e) => {
                    self.finish();
                    return Err(PlaybackError::Decode(format!("Decode error: {}", e)));
                }
            }
        }

        Ok(None)
    }

    fn finish(&mut self) {
        self.finished = true;
        if self.skipped > 0 {
            warn!(skipped = self.skipped, "Dropped corrupt packets while decoding");
        }
    }
}

impl Streamer for PacketStreamer {
    fn stream(&mut self, frames: &mut [Frame]) -> usize {
        let mut written = 0;

        while written < frames.len() {
            if self.cursor == self.pending.len() {
                match self.decode_next() {
                    Ok(Some(_)) => {}
                    Ok(None) => break,
                    Err(e) => {
                        warn!(error = %e, "Decoding failed, ending stream");
                        break;
                    }
                }
            }

            let available = &self.pending[self.cursor..];
            let count = available.len().min(frames.len() - written);
            frames[written..written + count].copy_from_slice(&available[..count]);
            self.cursor += count;
            written += count;
        }

        self.position += written;
        written
    }

    fn position(&self) -> usize {
        self.position
    }

    /// Declared frame count, or what is known so far when the container has none
    fn len(&self) -> usize {
        let known = self.position + (self.pending.len() - self.cursor);
        if self.finished {
            known
        } else {
            self.n_frames.map_or(known, |n| n.max(known))
        }
    }
}

/// Append one decoded buffer as stereo frames.
///
/// All sample formats are normalized to [-1.0, 1.0] and share one interleaving path.
fn append_stereo(decoded: AudioBufferRef<'_>, out: &mut Vec<Frame>) {
    match decoded {
        AudioBufferRef::F32(buf) => interleave(&buf, out, |s| s),
        AudioBufferRef::F64(buf) => interleave(&buf, out, |s| s as f32),
        AudioBufferRef::S8(buf) => interleave(&buf, out, |s| s as f32 / i8::MAX as f32),
        AudioBufferRef::S16(buf) => interleave(&buf, out, |s| s as f32 / i16::MAX as f32),
        AudioBufferRef::S24(buf) => interleave(&buf, out, |s| s.inner() as f32 / 8_388_607.0),
        AudioBufferRef::S32(buf) => interleave(&buf, out, |s| s as f32 / i32::MAX as f32),
        AudioBufferRef::U8(buf) => {
            interleave(&buf, out, |s| (s as f32 / u8::MAX as f32) * 2.0 - 1.0);
        }
        AudioBufferRef::U16(buf) => {
            interleave(&buf, out, |s| (s as f32 / u16::MAX as f32) * 2.0 - 1.0);
        }
        AudioBufferRef::U24(buf) => {
            interleave(&buf, out, |s| (s.inner() as f32 / 16_777_215.0) * 2.0 - 1.0);
        }
        AudioBufferRef::U32(buf) => {
            interleave(&buf, out, |s| (s as f32 / u32::MAX as f32) * 2.0 - 1.0);
        }
    }
}

/// Interleave planar audio into stereo frames, duplicating mono
fn interleave<T, F>(buf: &AudioBuffer<T>, out: &mut Vec<Frame>, normalize: F)
where
    T: Sample,
    F: Fn(T) -> f32,
{
    let channels = buf.spec().channels.count();
    if channels == 0 {
        return;
    }

    let left = buf.chan(0);
    let right = if channels > 1 { buf.chan(1) } else { left };

    out.reserve(buf.frames());
    out.extend(
        left.iter()
            .zip(right)
            .map(|(&l, &r)| [normalize(l), normalize(r)]),
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wav_bytes(sample_rate: u32, channels: u16, samples: &[i16]) -> Bytes {
        let spec = hound::WavSpec {
            channels,
            sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut cursor = Cursor::new(Vec::new());
        {
            let mut writer = hound::WavWriter::new(&mut cursor, spec).unwrap();
            for &sample in samples {
                writer.write_sample(sample).unwrap();
            }
            writer.finalize().unwrap();
        }
        Bytes::from(cursor.into_inner())
    }

    #[test]
    fn decodes_stereo_wav() {
        let samples: Vec<i16> = (0..2000)
            .map(|i| if i % 2 == 0 { 16384 } else { -16384 })
            .collect();
        let decoded = SymphoniaDecoder::new()
            .decode(wav_bytes(48000, 2, &samples))
            .unwrap();

        assert_eq!(decoded.format, Format::new(48000, 2));
        assert_eq!(decoded.streamer.len(), 1000);

        let mut streamer = decoded.streamer;
        let mut frames = [[0.0; 2]; 4];
        assert_eq!(streamer.stream(&mut frames), 4);
        assert!((frames[0][0] - 0.5).abs() < 1e-3);
        assert!((frames[0][1] + 0.5).abs() < 1e-3);
    }

    #[test]
    fn duplicates_mono_to_both_channels() {
        let samples = vec![8192i16; 500];
        let decoded = SymphoniaDecoder::with_extension("wav")
            .decode(wav_bytes(22050, 1, &samples))
            .unwrap();

        assert_eq!(decoded.format.sample_rate, 22050);
        assert_eq!(decoded.format.channels, 1);

        let mut streamer = decoded.streamer;
        let mut frames = [[0.0; 2]; 1];
        streamer.stream(&mut frames);
        assert_eq!(frames[0][0], frames[0][1]);
        assert!((frames[0][0] - 0.25).abs() < 1e-3);
    }

    #[test]
    fn decodes_packets_on_demand() {
        // Several WAV packets worth of audio
        let samples: Vec<i16> = (0..200_000).map(|i| (i % 100) as i16 * 100).collect();
        let decoded = SymphoniaDecoder::new()
            .decode(wav_bytes(44100, 2, &samples))
            .unwrap();
        let mut streamer = decoded.streamer;

        assert_eq!(streamer.len(), 100_000);
        assert_eq!(streamer.position(), 0);

        let mut buf = vec![[0.0; 2]; 4096];
        let mut total = 0;
        loop {
            let n = streamer.stream(&mut buf);
            total += n;
            if n < buf.len() {
                break;
            }
        }

        assert_eq!(total, 100_000);
        assert_eq!(streamer.position(), 100_000);
        assert_eq!(streamer.len(), 100_000);
        assert_eq!(streamer.stream(&mut buf), 0);
    }

    #[test]
    fn garbage_is_decode_error() {
        let result = SymphoniaDecoder::default().decode(Bytes::from_static(b"definitely not audio"));
        assert!(matches!(result, Err(PlaybackError::Decode(_))));
    }

    #[test]
    fn empty_body_is_decode_error() {
        let result = SymphoniaDecoder::default().decode(Bytes::new());
        assert!(matches!(result, Err(PlaybackError::Decode(_))));
    }

    #[test]
    fn header_only_wav_is_decode_error() {
        let result = SymphoniaDecoder::new().decode(wav_bytes(44100, 2, &[]));
        assert!(matches!(result, Err(PlaybackError::Decode(_))));
    }
}
