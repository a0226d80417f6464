//! Poolside - Audio Decoding
//!
//! Turns the encoded bytes served by the stream proxy into stereo `f32` frames
//! for the playback session.
//!
//! # Format Support
//!
//! Decoding goes through Symphonia's default probe and codec registry:
//! - **Containers**: MP3, FLAC, OGG, WAV, AAC, M4A
//! - **Sample types**: every Symphonia sample format, normalized to [-1.0, 1.0]
//! - **Channel layouts**: mono is duplicated to stereo, extra channels are dropped

pub mod decoder;

pub use decoder::SymphoniaDecoder;
