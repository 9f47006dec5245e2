//! Time-synced lyrics and where to get them

pub mod follower;
pub mod spotify;

#[cfg(test)]
mod tests;

use std::{
    collections::BTreeMap,
    future::Future,
    ops::Bound::{Excluded, Unbounded},
    time::Duration,
};

use anyhow::Result;

/// A time offset from the start of the song.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct TimeTag(pub Duration);
impl TimeTag {
    #[must_use]
    pub const fn from_millis(ms: u64) -> Self {
        Self(Duration::from_millis(ms))
    }

    /// Wall-clock time from `from` until this tag.
    #[must_use]
    pub fn duration_from(&self, from: &Self) -> Duration {
        self.0.saturating_sub(from.0)
    }
}

/// Lyric lines keyed by the time they start being sung.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncedLyrics(pub BTreeMap<TimeTag, String>);

impl FromIterator<(TimeTag, String)> for SyncedLyrics {
    fn from_iter<T: IntoIterator<Item = (TimeTag, String)>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl SyncedLyrics {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The line being sung at `time`, if the first line has started.
    #[must_use]
    pub fn line_at(&self, time: TimeTag) -> Option<&str> {
        self.0
            .range(..=time)
            .next_back()
            .map(|(_, text)| text.as_str())
    }

    /// The next line change strictly after `time`.
    #[must_use]
    pub fn next_after(&self, time: TimeTag) -> Option<(TimeTag, &str)> {
        self.0
            .range((Excluded(time), Unbounded))
            .next()
            .map(|(t, text)| (*t, text.as_str()))
    }
}

/// Source of synced lyrics for a track.
pub trait LyricsProvider {
    /// `Ok(None)` means the provider has no lyrics for this track.
    fn fetch(
        &self,
        track_id: &str,
    ) -> impl Future<Output = Result<Option<SyncedLyrics>>> + Send;
}
