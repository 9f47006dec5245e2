use std::net::SocketAddr;

use anyhow::{bail, Context as _, Result};
use clap::Parser as _;
use tokio::{io::BufReader, sync::mpsc, task::JoinSet};

use engine::{Shutdown, SyncEngine};
use format::Formatter;
use lyrics::{
    follower::LyricFollower,
    spotify::{SpotifyLyrics, StaticToken},
};
use queue::Fanout;
use sender::{OscSender, TransportError};

mod args;
mod bridge;
mod engine;
mod event;
mod format;
mod lyrics;
mod queue;
mod sender;
mod state;

struct Engines {
    target: SocketAddr,
    shutdown: Shutdown,
    heartbeat: std::time::Duration,
    queues: Vec<queue::EventQueue>,
    tasks: JoinSet<Result<(), TransportError>>,
}

impl Engines {
    async fn spawn(&mut self, path: String, formatter: Formatter) -> Result<()> {
        let target = self.target;
        let sender = OscSender::connect(target)
            .await
            .with_context(|| format!("Failed to open OSC socket towards {target}"))?;
        let (queue, events) = queue::channel();
        self.queues.push(queue);
        let engine = SyncEngine::new(
            path,
            formatter,
            sender,
            events,
            self.shutdown.clone(),
            self.heartbeat,
        );
        self.tasks.spawn(engine.run());
        Ok(())
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let args = args::Args::parse();
    args.init_tracing_subscriber();

    let shutdown = Shutdown::default();
    let mut engines = Engines {
        target: SocketAddr::new(args.osc_host, args.osc_port),
        shutdown: shutdown.clone(),
        heartbeat: args.heartbeat()?,
        queues: Vec::new(),
        tasks: JoinSet::new(),
    };
    if !args.no_chatbox {
        engines
            .spawn(
                args.chatbox_path.clone(),
                Formatter::rich(args.chatbox_format.clone()),
            )
            .await?;
    }
    if !args.no_lyrics_param {
        engines
            .spawn(args.lyrics_path.clone(), Formatter::Plain)
            .await?;
    }
    if engines.tasks.is_empty() {
        bail!("Both outputs are disabled, nothing to do");
    }
    let Engines {
        queues, mut tasks, ..
    } = engines;
    let fanout = Fanout::new(queues);

    let follower = match args.spotify_token.as_deref() {
        Some(token) => {
            let provider = SpotifyLyrics::new(StaticToken::new(token));
            provider.verify().await?;
            let (tx, rx) = mpsc::unbounded_channel();
            tokio::spawn(LyricFollower::new(provider, fanout.clone()).run(rx));
            Some(tx)
        }
        None => {
            tracing::info!("No Spotify token given, relying on lyrics from the event input");
            None
        }
    };

    bridge::supervise(
        BufReader::new(tokio::io::stdin()),
        &mut tasks,
        &fanout,
        follower.as_ref(),
        &shutdown,
        tokio::signal::ctrl_c(),
    )
    .await
}
