//! Playback session - core orchestration
//!
//! Owns the catalog, the random selector and the single active stream handle.
//! A `play` call runs fetch, decode, optional resample and install. Natural
//! end-of-stream is reported by the sink and folded back into `Idle`.

use crate::{
    catalog::{Catalog, Playlist, Track},
    error::{PlaybackError, Result},
    progress::ProgressTracker,
    random::RandomSelector,
    resample::Resampled,
    source::{Format, Frame, Streamer},
    state::{lock, ActiveStream, Completion, SessionState, SharedState},
    traits::{Decoder, Remote, Sink, Source, SourceStatus},
    types::{PlaybackState, ResampleQuality, SessionConfig, SessionEvent},
    volume::Volume,
};
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use std::time::Duration;
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tracing::{debug, info};

/// Capacity of the event broadcast channel
const EVENT_CAPACITY: usize = 64;

/// Shortest accepted progress refresh interval
const MIN_PROGRESS_INTERVAL: Duration = Duration::from_millis(10);

/// Playback session
///
/// Enforces at most one active stream. Every read or write of the shared
/// stream/volume/progress fields goes through one mutex, shared with the
/// sink's audio context and the progress task.
pub struct PlaybackSession {
    remote: Arc<dyn Remote>,
    decoder: Arc<dyn Decoder>,
    sink: Arc<dyn Sink>,

    /// Replaced wholesale on every successful load
    catalog: RwLock<Arc<Catalog>>,
    selector: Mutex<RandomSelector>,

    state: SharedState,
    resample_quality: ResampleQuality,

    /// Drained notifications from the audio context, tagged with generation
    drained_tx: mpsc::UnboundedSender<u64>,
    events: broadcast::Sender<SessionEvent>,

    _progress: ProgressTracker,
    completion: JoinHandle<()>,
}

impl PlaybackSession {
    /// Create a new session.
    ///
    /// Spawns the progress and completion tasks on the current runtime.
    ///
    /// # Panics
    ///
    /// Panics if called outside of a tokio runtime.
    pub fn new(
        remote: Arc<dyn Remote>,
        decoder: Arc<dyn Decoder>,
        sink: Arc<dyn Sink>,
        config: SessionConfig,
    ) -> Self {
        let state: SharedState = Arc::new(Mutex::new(SessionState::new(Volume::new(
            config.volume,
        ))));
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        let (drained_tx, drained_rx) = mpsc::unbounded_channel();

        let completion = tokio::spawn(run_completions(
            Arc::clone(&state),
            drained_rx,
            events.clone(),
        ));
        let progress = ProgressTracker::spawn(
            Arc::clone(&state),
            config.progress_interval.max(MIN_PROGRESS_INTERVAL),
        );

        let selector = match config.seed {
            Some(seed) => RandomSelector::seeded(seed),
            None => RandomSelector::from_entropy(),
        };

        debug!(
            sample_rate = sink.sample_rate(),
            volume = config.volume,
            quality = ?config.resample_quality,
            "Created playback session"
        );

        Self {
            remote,
            decoder,
            sink,
            catalog: RwLock::new(Arc::new(Catalog::default())),
            selector: Mutex::new(selector),
            state,
            resample_quality: config.resample_quality,
            drained_tx,
            events,
            _progress: progress,
            completion,
        }
    }

    // ===== Catalog =====

    /// Fetch and parse the catalog, replacing the current one.
    ///
    /// On failure the previously loaded catalog is left untouched.
    pub async fn load(&self) -> Result<Arc<Catalog>> {
        let raw = self.remote.fetch_catalog().await?;
        let catalog = Arc::new(Catalog::from_json(&raw)?);

        *self.catalog.write().unwrap_or_else(PoisonError::into_inner) = Arc::clone(&catalog);

        info!(playlists = catalog.len(), "Catalog loaded");
        self.emit(SessionEvent::CatalogLoaded {
            playlists: catalog.len(),
        });
        Ok(catalog)
    }

    /// Current catalog snapshot
    pub fn catalog(&self) -> Arc<Catalog> {
        Arc::clone(&self.catalog.read().unwrap_or_else(PoisonError::into_inner))
    }

    /// Playlists in catalog order
    pub fn list_playlists(&self) -> Vec<Playlist> {
        self.catalog().playlists().to_vec()
    }

    /// Case-insensitive slug lookup
    pub fn lookup_by_slug(&self, slug: &str) -> Option<Playlist> {
        self.catalog().lookup_by_slug(slug).cloned()
    }

    /// Uniformly chosen playlist, `None` with fewer than two playlists
    pub fn random_playlist(&self) -> Option<Playlist> {
        let catalog = self.catalog();
        self.selector().random_playlist(&catalog).cloned()
    }

    /// Uniformly chosen track, `None` with fewer than two tracks
    pub fn random_track_from(&self, playlist: &Playlist) -> Option<Track> {
        self.selector().random_track(playlist).cloned()
    }

    // ===== Playback =====

    /// Play a track, replacing whatever is loading or playing.
    ///
    /// Returns once the stream is installed and rendering. `on_complete` runs
    /// exactly once if the stream reaches its natural end, and never if the
    /// stream is replaced or fails.
    ///
    /// # Errors
    ///
    /// - `InvalidArgument` if `track` is `None`
    /// - `Network` or `Decode` if the fetch or decode fails (session ends `Idle`)
    /// - `Superseded` if a newer `play` call replaced this one meanwhile
    pub async fn play<F>(&self, track: Option<Track>, on_complete: F) -> Result<()>
    where
        F: FnOnce() + Send + 'static,
    {
        let track =
            track.ok_or_else(|| PlaybackError::InvalidArgument("No track to play".to_string()))?;

        let (generation, previous) = {
            let mut state = lock(&self.state);
            state.generation += 1;
            state.track = Some(track.clone());
            state.playback = PlaybackState::Loading;
            let previous = state.take_active();
            self.sink.clear();
            (state.generation, previous)
        };
        if let Some(previous) = previous {
            debug!(generation = previous.generation, "Tore down previous stream");
        }

        info!(track_id = track.id, generation, "Loading track");
        self.emit(SessionEvent::TrackChanged(Some(track.clone())));
        self.emit(SessionEvent::StateChanged(PlaybackState::Loading));

        let (streamer, format) = match self.open_stream(track.id, generation).await {
            Ok(opened) => opened,
            Err(err) => return Err(self.abandon(generation, err)),
        };

        let on_complete: Completion = Box::new(on_complete);
        let stale = {
            let mut state = lock(&self.state);
            if state.generation == generation {
                state.active = Some(ActiveStream {
                    generation,
                    streamer,
                    format,
                    paused: false,
                    on_complete: Some(on_complete),
                });
                state.playback = PlaybackState::Playing;
                state.refresh_progress();

                let source = Arc::new(StreamSource {
                    state: Arc::clone(&self.state),
                    generation,
                });
                let drained_tx = self.drained_tx.clone();
                self.sink.play(
                    source,
                    Box::new(move || {
                        // Receiver gone means the session is shutting down
                        let _ = drained_tx.send(generation);
                    }),
                );
                None
            } else {
                Some((streamer, on_complete))
            }
        };

        if stale.is_some() {
            debug!(track_id = track.id, generation, "Discarding superseded stream");
            return Err(PlaybackError::Superseded);
        }

        info!(
            track_id = track.id,
            generation,
            sample_rate = format.sample_rate,
            "Playing track"
        );
        self.emit(SessionEvent::StateChanged(PlaybackState::Playing));
        Ok(())
    }

    /// Fetch, decode and adapt a track to the sink's rate
    async fn open_stream(
        &self,
        track_id: i64,
        generation: u64,
    ) -> Result<(Box<dyn Streamer>, Format)> {
        let data = self.remote.fetch_track(track_id).await?;
        self.ensure_current(generation)?;

        let decoder = Arc::clone(&self.decoder);
        let decoded = tokio::task::spawn_blocking(move || decoder.decode(data))
            .await
            .map_err(|e| PlaybackError::Decode(format!("Decoder task failed: {}", e)))??;
        self.ensure_current(generation)?;

        let format = decoded.format;
        let sink_rate = self.sink.sample_rate();
        let streamer: Box<dyn Streamer> = if format.sample_rate == sink_rate {
            decoded.streamer
        } else {
            debug!(
                track_id,
                from = format.sample_rate,
                to = sink_rate,
                "Inserting resampling stage"
            );
            Box::new(Resampled::new(
                decoded.streamer,
                format.sample_rate,
                sink_rate,
                self.resample_quality,
            )?)
        };

        Ok((streamer, format))
    }

    fn ensure_current(&self, generation: u64) -> Result<()> {
        if lock(&self.state).generation == generation {
            Ok(())
        } else {
            Err(PlaybackError::Superseded)
        }
    }

    /// Settle a failed `play` back into `Idle`, unless a newer call owns the session
    fn abandon(&self, generation: u64, err: PlaybackError) -> PlaybackError {
        let current = {
            let mut state = lock(&self.state);
            let current = state.generation == generation;
            if current {
                state.track = None;
                state.playback = PlaybackState::Idle;
            }
            current
        };

        if !current {
            debug!(generation, "Failed play was already superseded");
            return PlaybackError::Superseded;
        }
        if !matches!(err, PlaybackError::Superseded) {
            debug!(generation, error = %err, "Play failed, session idle");
        }
        self.emit(SessionEvent::TrackChanged(None));
        self.emit(SessionEvent::StateChanged(PlaybackState::Idle));
        err
    }

    /// Toggle pause on the active stream and return the resulting state.
    ///
    /// Does nothing while no track is current or while it is still loading.
    pub fn pause_resume(&self) -> PlaybackState {
        let next = {
            let mut guard = lock(&self.state);
            let state = &mut *guard;
            if state.track.is_none() {
                return state.playback;
            }
            let Some(active) = state.active.as_mut() else {
                return state.playback;
            };

            active.paused = !active.paused;
            state.playback = if active.paused {
                PlaybackState::Paused
            } else {
                PlaybackState::Playing
            };
            state.playback
        };

        debug!(state = ?next, "Toggled pause");
        self.emit(SessionEvent::StateChanged(next));
        next
    }

    /// Store a new volume level, clamped to `0..=120`.
    ///
    /// Takes effect on the next rendered buffer, or at the next `play`.
    pub fn set_volume(&self, level: i32) -> i32 {
        let stored = lock(&self.state).volume.set_level(level);
        debug!(level = stored, requested = level, "Volume set");
        self.emit(SessionEvent::VolumeChanged(stored));
        stored
    }

    // ===== Queries =====

    /// `MM:SS / MM:SS` for the active stream, `None` when nothing is playing
    pub fn current_progress_text(&self) -> Option<String> {
        let state = lock(&self.state);
        state.active.as_ref().and(state.progress.clone())
    }

    pub fn state(&self) -> PlaybackState {
        lock(&self.state).playback
    }

    pub fn current_track(&self) -> Option<Track> {
        lock(&self.state).track.clone()
    }

    pub fn volume(&self) -> i32 {
        lock(&self.state).volume.level()
    }

    /// Subscribe to session events
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    fn selector(&self) -> std::sync::MutexGuard<'_, RandomSelector> {
        self.selector.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn emit(&self, event: SessionEvent) {
        // No subscribers is not an error
        let _ = self.events.send(event);
    }
}

impl Drop for PlaybackSession {
    fn drop(&mut self) {
        self.completion.abort();
        self.sink.clear();
        let active = lock(&self.state).take_active();
        drop(active);
    }
}

/// Frame source handed to the sink for one installed stream
struct StreamSource {
    state: SharedState,
    generation: u64,
}

impl Source for StreamSource {
    fn render(&self, out: &mut [Frame]) -> SourceStatus {
        let mut state = lock(&self.state);
        let volume = state.volume;

        let Some(active) = state
            .active
            .as_mut()
            .filter(|active| active.generation == self.generation)
        else {
            out.fill([0.0; 2]);
            return SourceStatus::Drained;
        };

        if active.paused {
            out.fill([0.0; 2]);
            return SourceStatus::Active;
        }

        let written = active.streamer.stream(out);
        volume.apply(&mut out[..written]);
        out[written..].fill([0.0; 2]);

        if written < out.len() {
            SourceStatus::Drained
        } else {
            SourceStatus::Active
        }
    }
}

/// Fold drained notifications into `Finished -> Idle` and run the callback
async fn run_completions(
    state: SharedState,
    mut drained_rx: mpsc::UnboundedReceiver<u64>,
    events: broadcast::Sender<SessionEvent>,
) {
    while let Some(generation) = drained_rx.recv().await {
        let finished = {
            let mut state = lock(&state);
            let current = state
                .active
                .as_ref()
                .is_some_and(|active| active.generation == generation);
            if !current {
                continue;
            }

            state.playback = PlaybackState::Finished;
            let finished = state.take_active();
            state.track = None;
            state.playback = PlaybackState::Idle;
            finished
        };

        info!(generation, "Track finished");
        let _ = events.send(SessionEvent::StateChanged(PlaybackState::Finished));
        let _ = events.send(SessionEvent::StateChanged(PlaybackState::Idle));
        let _ = events.send(SessionEvent::TrackChanged(None));

        if let Some(mut finished) = finished {
            let on_complete = finished.on_complete.take();
            drop(finished);
            if let Some(on_complete) = on_complete {
                on_complete();
            }
        }
    }
}
