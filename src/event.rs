//! Events flowing from the playback watcher into the display engines.

use serde::Deserialize;

/// Placeholder line sent by the lyric provider for instrumental passages.
pub const INSTRUMENTAL_LYRIC: &str = "♪";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Artist {
    pub name: String,
}

/// Playback state of the player at one point in time
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PlaybackSnapshot {
    #[serde(alias = "id")]
    pub track_id: String,
    pub name: String,
    #[serde(default)]
    pub artists: Vec<Artist>,
    pub is_playing: bool,
    #[serde(default)]
    pub current_lyric: Option<String>,
    /// Position within the track when the snapshot was taken
    #[serde(default)]
    pub progress_ms: Option<u64>,
}

impl PlaybackSnapshot {
    /// Name of the first credited artist, or an empty string if none is known.
    #[must_use]
    pub fn first_artist(&self) -> &str {
        self.artists.first().map_or("", |a| a.name.as_str())
    }
}

/// A single update produced by the playback watcher.
///
/// Unrecognised `type` tags deserialize to [`Event::Unknown`] so that newer
/// producers can talk to older consumers.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    SongUpdate { playback: PlaybackSnapshot },
    LyricUpdate { lyric: String },
    IsPlayingUpdate { is_playing: bool },
    /// Wakes a waiting engine and asks it to exit.
    #[serde(skip)]
    Stop,
    #[serde(other)]
    Unknown,
}
