use std::{fs::File, io, net::IpAddr, sync::Mutex, time::Duration};

use anyhow::{ensure, Context as _, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

/// Command line arguments
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Address of the OSC receiver
    #[clap(long, default_value = "127.0.0.1")]
    pub osc_host: IpAddr,
    /// Port of the OSC receiver
    #[clap(long, default_value_t = 9000)]
    pub osc_port: u16,
    /// Chatbox layout. Available fields: {status}, {name}, {artist}, {mic}, {lyrics}.
    /// Unknown fields fall back to the default layout.
    #[clap(long, env = "VRCLYRICS_CHATBOX_FORMAT")]
    pub chatbox_format: Option<String>,
    /// OSC address of the chatbox
    #[clap(long, default_value = "/chatbox/input")]
    pub chatbox_path: String,
    /// OSC address receiving the bare lyric line
    #[clap(long, default_value = "/Atomikku/VRCSpotifyOSC/Lyrics")]
    pub lyrics_path: String,
    /// Do not write to the chatbox
    #[clap(long)]
    pub no_chatbox: bool,
    /// Do not send the bare lyric line
    #[clap(long)]
    pub no_lyrics_param: bool,
    /// Resend the current state after X seconds without events
    #[clap(long, short = 'r', default_value_t = 10.0)]
    pub heartbeat_secs: f64,
    /// Spotify web player access token. Enables fetching synced lyrics.
    #[clap(long, env = "SPOTIFY_BEARER_TOKEN", hide_env_values = true)]
    pub spotify_token: Option<String>,
    /// File to write the log to. If not specified, logs will be written to stderr.
    #[clap(long, short)]
    log_file: Option<String>,
}

impl Args {
    /// Interval after which an idle engine resends its state
    ///
    /// # Errors
    ///
    /// Returns an error if the interval is zero, negative or not finite.
    pub fn heartbeat(&self) -> Result<Duration> {
        let heartbeat = Duration::try_from_secs_f64(self.heartbeat_secs)
            .with_context(|| format!("Invalid heartbeat interval {}", self.heartbeat_secs))?;
        ensure!(!heartbeat.is_zero(), "Heartbeat interval must be positive");
        Ok(heartbeat)
    }

    /// Build the tracing subscriber using parameters from the command line arguments
    ///
    /// # Panics
    ///
    /// Panics if the log file cannot be opened.
    pub fn init_tracing_subscriber(&self) {
        let builder = tracing_subscriber::fmt()
            .pretty()
            .with_env_filter(EnvFilter::from_default_env());

        match self.log_file.as_ref() {
            None => builder.with_writer(io::stderr).init(),
            Some(f) => builder
                .with_writer(Mutex::new(File::create(f).unwrap()))
                .init(),
        }
    }
}
