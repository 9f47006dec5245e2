//! Emits lyric lines as the song reaches them

use std::{
    future::{pending, Pending},
    pin::Pin,
};

use futures::future::Either;
use tokio::{
    select,
    sync::mpsc,
    time::{sleep, Instant, Sleep},
};
use tracing::instrument;

use super::{LyricsProvider, SyncedLyrics, TimeTag};
use crate::{
    event::{Event, PlaybackSnapshot},
    queue::Fanout,
};

type Timer = Pin<Box<Either<Sleep, Pending<()>>>>;

fn idle() -> Timer {
    Box::pin(Either::Right(pending()))
}

pub struct LyricFollower<P> {
    provider: P,
    output: Fanout,
    track_id: Option<String>,
    lyrics: Option<SyncedLyrics>,
    /// Song position at `anchor`; `None` until a song update reports one
    position: Option<TimeTag>,
    /// When `position` was observed; `None` while paused or position is unknown
    anchor: Option<Instant>,
    next_line: Option<TimeTag>,
    timer: Timer,
}

impl<P: LyricsProvider> LyricFollower<P> {
    pub fn new(provider: P, output: Fanout) -> Self {
        Self {
            provider,
            output,
            track_id: None,
            lyrics: None,
            position: None,
            anchor: None,
            next_line: None,
            timer: idle(),
        }
    }

    /// Follow playback events until the sending side closes.
    #[instrument(skip_all)]
    pub async fn run(mut self, mut input: mpsc::UnboundedReceiver<Event>) {
        loop {
            select! {
                event = input.recv() => {
                    let Some(event) = event else { break };
                    self.handle(event).await;
                }
                () = &mut self.timer => self.advance(),
            }
        }
        tracing::debug!("Lyric follower stopped");
    }

    fn current_position(&self) -> Option<TimeTag> {
        let position = self.position?;
        Some(match self.anchor {
            Some(anchor) => TimeTag(position.0 + anchor.elapsed()),
            None => position,
        })
    }

    async fn handle(&mut self, event: Event) {
        match event {
            Event::SongUpdate { playback } => self.on_song(playback).await,
            Event::IsPlayingUpdate { is_playing } => {
                if is_playing && self.anchor.is_none() && self.position.is_some() {
                    self.anchor = Some(Instant::now());
                } else if !is_playing && self.anchor.is_some() {
                    self.position = self.current_position();
                    self.anchor = None;
                }
                self.schedule();
            }
            Event::LyricUpdate { .. } | Event::Unknown | Event::Stop => {}
        }
    }

    async fn on_song(&mut self, playback: PlaybackSnapshot) {
        if self.track_id.as_deref() != Some(playback.track_id.as_str()) {
            self.lyrics = match self.provider.fetch(&playback.track_id).await {
                Ok(Some(lyrics)) if !lyrics.is_empty() => {
                    tracing::info!(track = %playback.name, lines = lyrics.0.len(), "Loaded synced lyrics");
                    Some(lyrics)
                }
                Ok(_) => {
                    tracing::info!(track = %playback.name, "No synced lyrics for track");
                    None
                }
                Err(e) => {
                    tracing::warn!(?e, track = %playback.name, "Failed to fetch lyrics");
                    None
                }
            };
            self.track_id = Some(playback.track_id.clone());
        }

        let Some(progress) = playback.progress_ms else {
            tracing::debug!("Song update without position, lyric timing paused");
            self.position = None;
            self.anchor = None;
            self.next_line = None;
            self.timer = idle();
            return;
        };
        let position = TimeTag::from_millis(progress);
        self.position = Some(position);
        self.anchor = playback.is_playing.then(Instant::now);

        if playback.current_lyric.is_none() {
            if let Some(line) = self.lyrics.as_ref().and_then(|l| l.line_at(position)) {
                self.emit(line.to_owned());
            }
        }
        self.schedule();
    }

    /// Arm the timer for the next line change, or disarm it.
    fn schedule(&mut self) {
        let next = self.current_position().zip(self.anchor).and_then(|(now, _)| {
            let (t, _) = self.lyrics.as_ref()?.next_after(now)?;
            Some((t, t.duration_from(&now)))
        });
        self.next_line = next.map(|(t, _)| t);
        self.timer = match next {
            Some((_, wait)) => Box::pin(Either::Left(sleep(wait))),
            None => idle(),
        };
    }

    fn advance(&mut self) {
        let line = self
            .next_line
            .zip(self.lyrics.as_ref())
            .and_then(|(t, l)| l.line_at(t))
            .map(ToOwned::to_owned);
        match line {
            Some(line) => self.emit(line),
            None => tracing::error!("Lyric timer expired without a pending line"),
        }
        self.schedule();
    }

    fn emit(&self, lyric: String) {
        tracing::debug!(%lyric, "Next lyric line");
        self.output.push(&Event::LyricUpdate { lyric });
    }
}
