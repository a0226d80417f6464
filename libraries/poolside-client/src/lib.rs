//! HTTP client for the Poolside API.
//!
//! Fetches the playlist catalog and per-track audio through the stream proxy,
//! and implements the playback session's `Remote` seam on top of that.

pub mod client;
pub mod error;

pub use client::{ClientConfig, PoolsideClient, DEFAULT_CATALOG_URL, DEFAULT_STREAM_URL};
pub use error::{ClientError, Result};
