//! Reads playback events produced by an external watcher.

use std::{future::Future, io};

use anyhow::{Context as _, Result};
use tokio::{
    io::{AsyncBufRead, AsyncBufReadExt as _},
    select,
    sync::mpsc,
    task::JoinSet,
};

use crate::{engine::Shutdown, event::Event, queue::Fanout, sender::TransportError};

/// Forward newline-delimited JSON events to the engines and, if present, the lyric follower.
///
/// Returns once the input ends.
///
/// # Errors
///
/// Returns an error if reading the input fails.
pub async fn forward_events<R: AsyncBufRead + Unpin>(
    input: R,
    engines: &Fanout,
    follower: Option<&mpsc::UnboundedSender<Event>>,
) -> Result<()> {
    let mut lines = input.lines();
    while let Some(line) = lines.next_line().await.context("Failed to read events")? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let event: Event = match serde_json::from_str(line) {
            Ok(e) => e,
            Err(e) => {
                tracing::warn!(%e, %line, "Skipping malformed event");
                continue;
            }
        };
        tracing::trace!(?event, "Received event");
        if !engines.push(&event) {
            tracing::warn!("No display engine is listening anymore");
            break;
        }
        if let Some(follower) = follower {
            if follower.send(event).is_err() {
                tracing::warn!("Lyric follower has stopped");
            }
        }
    }
    tracing::info!("Event input closed");
    Ok(())
}

/// Forward events until the input ends, `interrupt` fires or an engine exits, then stop every engine.
///
/// # Errors
///
/// Returns the first engine failure, or an error reading the input or waiting for `interrupt`.
pub async fn supervise<R: AsyncBufRead + Unpin>(
    input: R,
    engines: &mut JoinSet<Result<(), TransportError>>,
    fanout: &Fanout,
    follower: Option<&mpsc::UnboundedSender<Event>>,
    shutdown: &Shutdown,
    interrupt: impl Future<Output = io::Result<()>>,
) -> Result<()> {
    let outcome = select! {
        result = forward_events(input, fanout, follower) => result,
        Some(result) = engines.join_next() => {
            tracing::warn!("Display engine exited before shutdown");
            result
                .context("Display engine panicked")
                .and_then(|r| r.map_err(Into::into))
        }
        result = interrupt => {
            tracing::info!("Interrupted");
            result.context("Failed to listen for Ctrl-C")
        }
    };

    shutdown.request();
    fanout.push(&Event::Stop);
    while let Some(result) = engines.join_next().await {
        result.context("Display engine panicked")??;
    }
    outcome
}
