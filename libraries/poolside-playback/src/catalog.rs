//! Playlist catalog
//!
//! The catalog is loaded in one piece from the remote playlist endpoint and is
//! read-only afterwards. A reload replaces the whole catalog.

use crate::error::{PlaybackError, Result};
use serde::{Deserialize, Serialize};

/// A single track, addressed through the stream proxy by its numeric id
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Track {
    /// Handle into the remote stream proxy
    #[serde(rename = "soundcloud_id")]
    pub id: i64,

    #[serde(default)]
    pub artist: String,

    #[serde(default)]
    pub title: String,
}

/// A named, ordered list of tracks
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Playlist {
    pub name: String,

    /// Case-insensitive lookup key
    pub slug: String,

    /// Display order as declared by the catalog source
    #[serde(default)]
    pub order: i32,

    #[serde(rename = "isCustom", default)]
    pub is_custom: bool,

    /// Track count declared by the source (may differ from `tracks.len()`)
    #[serde(rename = "total_tracks", default)]
    pub total_tracks: u32,

    /// Tracks in source order
    #[serde(rename = "tracks_in_order", default)]
    pub tracks: Vec<Track>,
}

/// Wire shape of the catalog endpoint
#[derive(Debug, Deserialize)]
struct CatalogPayload {
    payload: Vec<Playlist>,
}

/// Ordered set of playlists
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Catalog {
    playlists: Vec<Playlist>,
}

impl Catalog {
    pub fn new(playlists: Vec<Playlist>) -> Self {
        Self { playlists }
    }

    /// Parse the raw catalog payload.
    ///
    /// A payload that does not match the expected shape is a decode error,
    /// never an empty catalog.
    pub fn from_json(raw: &[u8]) -> Result<Self> {
        let parsed: CatalogPayload = serde_json::from_slice(raw)
            .map_err(|e| PlaybackError::Decode(format!("Malformed catalog payload: {}", e)))?;
        Ok(Self::new(parsed.payload))
    }

    /// Playlists in catalog order
    pub fn playlists(&self) -> &[Playlist] {
        &self.playlists
    }

    pub fn len(&self) -> usize {
        self.playlists.len()
    }

    pub fn is_empty(&self) -> bool {
        self.playlists.is_empty()
    }

    /// Find a playlist by slug, ignoring case. First match in catalog order wins.
    pub fn lookup_by_slug(&self, slug: &str) -> Option<&Playlist> {
        let wanted = slug.to_lowercase();
        self.playlists
            .iter()
            .find(|playlist| playlist.slug.to_lowercase() == wanted)
    }
}
