//! Poolside - Desktop Audio Output
//!
//! CPAL-backed implementation of the playback session's `Sink`. Runs one
//! output stream at a fixed rate on a dedicated audio thread.

pub mod error;
pub mod sink;

pub use error::{AudioError, Result};
pub use sink::{CpalSink, DEFAULT_SAMPLE_RATE};
