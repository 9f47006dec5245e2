//! Keeps a remote display in sync with playback events.

use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    time::Duration,
};

use rosc::OscType;
use tracing::instrument;

use crate::{
    event::Event,
    format::Formatter,
    queue::{EventReceiver, Popped},
    sender::{MessageSender, TransportError},
    state::DisplayState,
};

/// Shared flag asking every engine to stop at its next wake-up.
#[derive(Debug, Clone, Default)]
pub struct Shutdown(Arc<AtomicBool>);

impl Shutdown {
    pub fn request(&self) {
        self.0.store(true, Ordering::Release);
    }

    #[must_use]
    pub fn is_requested(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// Result of applying every event queued at one wake-up
struct Burst {
    /// Some state changed and a message is due
    dirty: bool,
    /// Lyric override carried by the last state-changing event
    explicit: Option<String>,
    stop: bool,
}

pub struct SyncEngine<S> {
    path: String,
    formatter: Formatter,
    sender: S,
    events: EventReceiver,
    shutdown: Shutdown,
    heartbeat: Duration,
    state: DisplayState,
}

impl<S: MessageSender> SyncEngine<S> {
    pub fn new(
        path: impl Into<String>,
        formatter: Formatter,
        sender: S,
        events: EventReceiver,
        shutdown: Shutdown,
        heartbeat: Duration,
    ) -> Self {
        Self {
            path: path.into(),
            formatter,
            sender,
            events,
            shutdown,
            heartbeat,
            state: DisplayState::default(),
        }
    }

    /// Process events until shut down, then blank the display.
    ///
    /// # Errors
    ///
    /// Returns the first transport failure. The display is not cleared in that case.
    #[instrument(skip_all, fields(path = %self.path))]
    pub async fn run(mut self) -> Result<(), TransportError> {
        tracing::info!("Display engine started");
        while !self.shutdown.is_requested() {
            match self.events.pop_timeout(self.heartbeat).await {
                Popped::Timeout => self.refresh().await?,
                Popped::Closed => {
                    tracing::info!("All event producers are gone");
                    break;
                }
                Popped::Event(Event::Stop) => break,
                Popped::Event(first) => {
                    let burst = self.drain(first);
                    if burst.dirty {
                        self.dispatch(burst.explicit.as_deref()).await?;
                    }
                    if burst.stop {
                        break;
                    }
                }
            }
        }
        self.clear().await?;
        tracing::info!("Display engine stopped");
        Ok(())
    }

    /// Apply `first` and everything queued behind it, stopping early at a stop request.
    fn drain(&mut self, first: Event) -> Burst {
        let mut burst = Burst {
            dirty: false,
            explicit: None,
            stop: false,
        };
        let mut next = Some(first);
        let mut applied = 0usize;
        while let Some(event) = next {
            let explicit = match event {
                Event::SongUpdate { playback } => {
                    tracing::info!(track = %playback.name, artist = %playback.first_artist(), "Track changed");
                    self.state.apply_song(playback)
                }
                Event::LyricUpdate { lyric } => self.state.apply_lyric(lyric),
                Event::IsPlayingUpdate { is_playing } => self.state.apply_is_playing(is_playing),
                Event::Stop => {
                    burst.stop = true;
                    break;
                }
                Event::Unknown => {
                    tracing::debug!("Ignoring unknown event");
                    next = self.events.try_pop();
                    continue;
                }
            };
            burst.dirty = true;
            burst.explicit = explicit;
            applied += 1;
            next = self.events.try_pop();
        }
        tracing::debug!(applied, stop = burst.stop, "Drained event queue");
        burst
    }

    /// Re-send the current state, e.g. after a quiet period.
    ///
    /// # Errors
    ///
    /// Returns an error if the message cannot be sent.
    pub async fn refresh(&mut self) -> Result<(), TransportError> {
        tracing::debug!("Heartbeat");
        self.dispatch(None).await
    }

    async fn dispatch(&mut self, explicit: Option<&str>) -> Result<(), TransportError> {
        let Some(text) = self.formatter.format(&self.state, explicit) else {
            tracing::debug!("No track yet, nothing to display");
            return Ok(());
        };
        tracing::debug!(%text, "Updating display");
        self.send_text(text).await
    }

    async fn clear(&mut self) -> Result<(), TransportError> {
        tracing::debug!("Clearing display");
        self.send_text(String::new()).await
    }

    async fn send_text(&mut self, text: String) -> Result<(), TransportError> {
        // Trailing flags: show immediately, no notification sound
        let args = vec![OscType::String(text), OscType::Bool(true), OscType::Bool(false)];
        self.sender.send(&self.path, args).await.inspect_err(|e| {
            tracing::error!(?e, path = %self.path, "Failed to reach the display");
        })
    }
}
