//! What the remote display is currently showing

use crate::event::{PlaybackSnapshot, INSTRUMENTAL_LYRIC};

/// Display state owned by a single engine.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct DisplayState {
    /// The most recent song update
    pub track: Option<PlaybackSnapshot>,
    /// The last lyric line shown for `track`
    pub last_lyric: Option<String>,
    pub is_playing: Option<bool>,
}

impl DisplayState {
    /// Replace the track wholesale. Returns the lyric to show with the next message.
    pub fn apply_song(&mut self, playback: PlaybackSnapshot) -> Option<String> {
        self.last_lyric = None;
        self.is_playing = Some(playback.is_playing);
        self.last_lyric.clone_from(&playback.current_lyric);
        let lyric = playback.current_lyric.clone();
        self.track = Some(playback);
        lyric
    }

    /// Record a new lyric line. Returns the lyric to show with the next message.
    pub fn apply_lyric(&mut self, lyric: String) -> Option<String> {
        let lyric = if lyric == INSTRUMENTAL_LYRIC {
            String::new()
        } else {
            lyric
        };
        self.last_lyric = Some(lyric.clone());
        Some(lyric)
    }

    /// Record a play/pause change. The lyric shown next falls back to [`Self::resolve_lyric`].
    pub fn apply_is_playing(&mut self, is_playing: bool) -> Option<String> {
        self.is_playing = Some(is_playing);
        None
    }

    #[must_use]
    pub fn playing(&self) -> bool {
        self.is_playing == Some(true)
    }

    /// Lyric text for a message: an explicit override wins, otherwise the last line while playing.
    #[must_use]
    pub fn resolve_lyric<'a>(&'a self, explicit: Option<&'a str>) -> &'a str {
        match explicit {
            Some(lyric) => lyric,
            None if self.playing() => self.last_lyric.as_deref().unwrap_or_default(),
            None => "",
        }
    }
}
