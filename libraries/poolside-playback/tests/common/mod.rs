//! In-memory collaborators for driving a `PlaybackSession` in tests
#![allow(dead_code)]

use async_trait::async_trait;
use bytes::Bytes;
use poolside_playback::{
    BufferedStreamer, Decoded, Decoder, Format, Frame, PlaybackError, Remote, Result, Sink,
    Source, SourceStatus, Streamer,
};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;

/// Sample amplitude of every decoded frame
pub const SAMPLE: f32 = 0.5;

pub const CATALOG_JSON: &str = r#"{
    "payload": [
        {
            "name": "Poolside FM",
            "slug": "poolside-fm",
            "order": 0,
            "isCustom": false,
            "total_tracks": 3,
            "tracks_in_order": [
                { "soundcloud_id": 1, "artist": "Artist A", "title": "Sunset" },
                { "soundcloud_id": 2, "artist": "Artist B", "title": "Lagoon" },
                { "soundcloud_id": 3, "artist": "Artist C", "title": "Breeze" }
            ]
        },
        {
            "name": "Chill",
            "slug": "chill",
            "order": 1,
            "isCustom": true,
            "total_tracks": 2,
            "tracks_in_order": [
                { "soundcloud_id": 4, "artist": "Artist D", "title": "Drift" },
                { "soundcloud_id": 5, "artist": "Artist E", "title": "Tide" }
            ]
        }
    ]
}"#;

// ===== Remote =====

/// Remote serving canned bodies, optionally held until released
#[derive(Default)]
pub struct FakeRemote {
    catalog: Mutex<Option<Bytes>>,
    tracks: Mutex<HashMap<i64, Bytes>>,
    gates: Mutex<HashMap<i64, Arc<Notify>>>,
    fetches: Mutex<Vec<i64>>,
}

impl FakeRemote {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_catalog(self, body: &str) -> Self {
        self.set_catalog(Some(body));
        self
    }

    /// Serve `body` for track `id`. Bodies are `"<rate>:<frames>:<tag>"`.
    pub fn with_track(self, id: i64, body: &str) -> Self {
        self.tracks
            .lock()
            .unwrap()
            .insert(id, Bytes::from(body.to_string()));
        self
    }

    /// `None` makes the catalog fetch fail with a network error
    pub fn set_catalog(&self, body: Option<&str>) {
        *self.catalog.lock().unwrap() = body.map(|b| Bytes::from(b.to_string()));
    }

    /// Hold fetches of track `id` until the returned gate is notified
    pub fn gate(&self, id: i64) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        self.gates.lock().unwrap().insert(id, Arc::clone(&gate));
        gate
    }

    pub fn fetched(&self, id: i64) -> bool {
        self.fetches.lock().unwrap().contains(&id)
    }
}

#[async_trait]
impl Remote for FakeRemote {
    async fn fetch_catalog(&self) -> Result<Bytes> {
        self.catalog
            .lock()
            .unwrap()
            .clone()
            .ok_or_else(|| PlaybackError::Network("catalog unavailable".to_string()))
    }

    async fn fetch_track(&self, track_id: i64) -> Result<Bytes> {
        self.fetches.lock().unwrap().push(track_id);

        let gate = self.gates.lock().unwrap().get(&track_id).cloned();
        if let Some(gate) = gate {
            gate.notified().await;
        }

        self.tracks
            .lock()
            .unwrap()
            .get(&track_id)
            .cloned()
            .ok_or_else(|| PlaybackError::Network(format!("HTTP 404 for track {}", track_id)))
    }
}

// ===== Decoder =====

/// Decoder for `"<rate>:<frames>:<tag>"` bodies, producing constant frames
#[derive(Default)]
pub struct FakeDecoder {
    decoded: AtomicUsize,
    dropped: Arc<Mutex<Vec<String>>>,
}

impl FakeDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn decoded(&self) -> usize {
        self.decoded.load(Ordering::SeqCst)
    }

    /// How many streams tagged `tag` have been torn down
    pub fn dropped(&self, tag: &str) -> usize {
        self.dropped
            .lock()
            .unwrap()
            .iter()
            .filter(|t| t.as_str() == tag)
            .count()
    }
}

impl Decoder for FakeDecoder {
    fn decode(&self, data: Bytes) -> Result<Decoded> {
        let text = std::str::from_utf8(&data)
            .map_err(|e| PlaybackError::Decode(e.to_string()))?;
        let mut parts = text.split(':');
        let (Some(rate), Some(frames), Some(tag)) = (parts.next(), parts.next(), parts.next())
        else {
            return Err(PlaybackError::Decode(format!("unrecognized stream: {}", text)));
        };
        let rate: u32 = rate
            .parse()
            .map_err(|_| PlaybackError::Decode("bad rate".to_string()))?;
        let frames: usize = frames
            .parse()
            .map_err(|_| PlaybackError::Decode("bad length".to_string()))?;

        self.decoded.fetch_add(1, Ordering::SeqCst);
        Ok(Decoded {
            streamer: Box::new(TrackedStreamer {
                inner: BufferedStreamer::new(vec![[SAMPLE, SAMPLE]; frames]),
                tag: tag.to_string(),
                dropped: Arc::clone(&self.dropped),
            }),
            format: Format::new(rate, 2),
        })
    }
}

/// Streamer that records its own teardown
struct TrackedStreamer {
    inner: BufferedStreamer,
    tag: String,
    dropped: Arc<Mutex<Vec<String>>>,
}

impl Streamer for TrackedStreamer {
    fn stream(&mut self, frames: &mut [Frame]) -> usize {
        self.inner.stream(frames)
    }

    fn position(&self) -> usize {
        self.inner.position()
    }

    fn len(&self) -> usize {
        self.inner.len()
    }
}

impl Drop for TrackedStreamer {
    fn drop(&mut self) {
        self.dropped.lock().unwrap().push(self.tag.clone());
    }
}

// ===== Sink =====

struct Playing {
    source: Arc<dyn Source>,
    on_drained: Option<Box<dyn FnOnce() + Send>>,
}

/// Sink that renders only when the test pumps it
pub struct FakeSink {
    sample_rate: u32,
    slot: Mutex<Option<Playing>>,
    plays: AtomicUsize,
    clears: AtomicUsize,
}

impl FakeSink {
    pub fn new(sample_rate: u32) -> Self {
        Self {
            sample_rate,
            slot: Mutex::new(None),
            plays: AtomicUsize::new(0),
            clears: AtomicUsize::new(0),
        }
    }

    pub fn plays(&self) -> usize {
        self.plays.load(Ordering::SeqCst)
    }

    pub fn clears(&self) -> usize {
        self.clears.load(Ordering::SeqCst)
    }

    pub fn is_playing(&self) -> bool {
        self.slot.lock().unwrap().is_some()
    }

    /// Render one buffer the way an audio callback would.
    ///
    /// Returns `None` when nothing is playing.
    pub fn pump(&self, frames: usize) -> Option<(SourceStatus, Vec<Frame>)> {
        let source = self
            .slot
            .lock()
            .unwrap()
            .as_ref()
            .map(|playing| Arc::clone(&playing.source))?;

        let mut out = vec![[1.0, 1.0]; frames];
        let status = source.render(&mut out);

        if status == SourceStatus::Drained {
            let finished = {
                let mut slot = self.slot.lock().unwrap();
                match slot.as_ref() {
                    Some(playing) if Arc::ptr_eq(&playing.source, &source) => slot.take(),
                    _ => None,
                }
            };
            if let Some(on_drained) = finished.and_then(|playing| playing.on_drained) {
                on_drained();
            }
        }

        Some((status, out))
    }
}

impl Sink for FakeSink {
    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn play(&self, source: Arc<dyn Source>, on_drained: Box<dyn FnOnce() + Send>) {
        self.plays.fetch_add(1, Ordering::SeqCst);
        *self.slot.lock().unwrap() = Some(Playing {
            source,
            on_drained: Some(on_drained),
        });
    }

    fn clear(&self) {
        self.clears.fetch_add(1, Ordering::SeqCst);
        *self.slot.lock().unwrap() = None;
    }
}
