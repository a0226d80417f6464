//! Random playlist and track selection
//!
//! Selection runs over an explicitly seeded generator so tests can replay it.

use crate::catalog::{Catalog, Playlist, Track};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Uniform index picker over a bounded range
#[derive(Debug, Clone)]
pub struct RandomSelector<R = StdRng> {
    rng: R,
}

impl RandomSelector<StdRng> {
    /// Deterministic selector for a fixed seed
    pub fn seeded(seed: u64) -> Self {
        Self::with_rng(StdRng::seed_from_u64(seed))
    }

    /// Selector seeded once from OS entropy
    pub fn from_entropy() -> Self {
        Self::with_rng(StdRng::from_entropy())
    }
}

impl<R: Rng> RandomSelector<R> {
    pub fn with_rng(rng: R) -> Self {
        Self { rng }
    }

    /// Pick an index in `[0, count - 1]`.
    ///
    /// Returns `None` when there are fewer than two candidates, so a
    /// single-element list never yields a selection.
    pub fn pick(&mut self, count: usize) -> Option<usize> {
        if count <= 1 {
            return None;
        }
        Some(self.rng.gen_range(0..count))
    }

    pub fn random_playlist<'a>(&mut self, catalog: &'a Catalog) -> Option<&'a Playlist> {
        let playlists = catalog.playlists();
        self.pick(playlists.len()).map(|index| &playlists[index])
    }

    pub fn random_track<'a>(&mut self, playlist: &'a Playlist) -> Option<&'a Track> {
        self.pick(playlist.tracks.len())
            .map(|index| &playlist.tracks[index])
    }
}

impl Default for RandomSelector<StdRng> {
    fn default() -> Self {
        Self::from_entropy()
    }
}
