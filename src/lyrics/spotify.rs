//! Spotify's web player lyric endpoint

use std::future::Future;

use anyhow::{bail, Context as _, Result};
use reqwest::{
    header::{AUTHORIZATION, USER_AGENT},
    Client, StatusCode,
};
use serde::Deserialize;

use super::{LyricsProvider, SyncedLyrics, TimeTag};

const LYRICS_BASE_URL: &str = "https://spclient.wg.spotify.com";
const PROFILE_URL: &str = "https://api.spotify.com/v1/me";
/// Requests made per lookup before an expired token is considered fatal
pub const MAX_AUTH_ATTEMPTS: usize = 2;

/// Hands out bearer tokens for the web player API.
pub trait TokenSource {
    /// Return a token; with `refresh` set the previous one was rejected.
    fn token(&self, refresh: bool) -> impl Future<Output = Result<String>> + Send;
}

/// A token obtained out of band, e.g. copied from a browser session.
#[derive(Debug, Clone)]
pub struct StaticToken(String);

impl StaticToken {
    #[must_use]
    pub fn new(token: &str) -> Self {
        let token = token.trim();
        if token.starts_with("Bearer ") {
            Self(token.to_owned())
        } else {
            Self(format!("Bearer {token}"))
        }
    }
}

impl TokenSource for StaticToken {
    async fn token(&self, refresh: bool) -> Result<String> {
        if refresh {
            tracing::warn!("Configured Spotify token was rejected and cannot be refreshed");
        }
        Ok(self.0.clone())
    }
}

#[derive(Debug, Deserialize)]
struct ColorLyrics {
    lyrics: LyricsBody,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LyricsBody {
    #[serde(default)]
    sync_type: Option<String>,
    lines: Vec<LyricsLine>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LyricsLine {
    start_time_ms: String,
    words: String,
}

impl ColorLyrics {
    fn into_synced(self) -> Result<Option<SyncedLyrics>> {
        if self.lyrics.sync_type.as_deref() == Some("UNSYNCED") {
            tracing::info!("Track only has unsynced lyrics");
            return Ok(None);
        }
        self.lyrics
            .lines
            .into_iter()
            .map(|l| {
                let start = l
                    .start_time_ms
                    .parse::<u64>()
                    .with_context(|| format!("Failed to parse {} as u64", l.start_time_ms))?;
                Ok((TimeTag::from_millis(start), l.words))
            })
            .collect::<Result<SyncedLyrics>>()
            .map(Some)
    }
}

/// Lyric client for the Spotify web player API
pub struct SpotifyLyrics<T> {
    client: Client,
    tokens: T,
    base_url: String,
}

impl<T: TokenSource + Sync> SpotifyLyrics<T> {
    pub fn new(tokens: T) -> Self {
        Self::with_base_url(tokens, LYRICS_BASE_URL)
    }

    pub fn with_base_url(tokens: T, base_url: &str) -> Self {
        Self {
            client: Client::new(),
            tokens,
            base_url: base_url.trim_end_matches('/').to_owned(),
        }
    }

    /// Check that the current token is accepted.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the token is rejected.
    pub async fn verify(&self) -> Result<()> {
        let token = self.tokens.token(false).await?;
        let response = self
            .client
            .get(PROFILE_URL)
            .header(AUTHORIZATION, token)
            .send()
            .await
            .context("Failed to reach the Spotify API")?;
        if response.status() == StatusCode::UNAUTHORIZED {
            bail!("Spotify rejected the configured token");
        }
        Ok(())
    }
}

impl<T: TokenSource + Sync> LyricsProvider for SpotifyLyrics<T> {
    async fn fetch(&self, track_id: &str) -> Result<Option<SyncedLyrics>> {
        let url = format!("{}/color-lyrics/v2/track/{track_id}", self.base_url);
        for attempt in 0..MAX_AUTH_ATTEMPTS {
            let token = self.tokens.token(attempt > 0).await?;
            let response = self
                .client
                .get(&url)
                .query(&[("format", "json"), ("market", "from_token")])
                .header(AUTHORIZATION, token)
                .header(USER_AGENT, "Mozilla/5.0")
                .header("App-Platform", "WebPlayer")
                .send()
                .await
                .with_context(|| format!("Failed to request lyrics for {track_id}"))?;

            match response.status() {
                StatusCode::OK => {
                    let body: ColorLyrics = response
                        .json()
                        .await
                        .with_context(|| format!("Failed to parse lyrics for {track_id}"))?;
                    return body.into_synced();
                }
                StatusCode::NOT_FOUND => {
                    tracing::debug!(%track_id, "No lyrics available");
                    return Ok(None);
                }
                StatusCode::UNAUTHORIZED => {
                    tracing::warn!(%track_id, attempt, "Lyrics request unauthorized");
                }
                status => {
                    let body = response.text().await.unwrap_or_default();
                    bail!("Unexpected status {status} fetching lyrics: {body}");
                }
            }
        }
        bail!("Spotify rejected the access token {MAX_AUTH_ATTEMPTS} times in a row")
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    };

    use tokio::{
        io::{AsyncReadExt as _, AsyncWriteExt as _},
        net::TcpListener,
    };

    use super::*;

    /// Replies to successive HTTP requests with the given status and body.
    async fn serve(responses: Vec<(u16, &'static str)>) -> (String, Arc<AtomicUsize>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("http://{}", listener.local_addr().unwrap());
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&hits);
        tokio::spawn(async move {
            for (status, body) in responses {
                let (mut stream, _) = listener.accept().await.unwrap();
                let mut request = Vec::new();
                let mut buf = [0u8; 1024];
                while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                    let n = stream.read(&mut buf).await.unwrap();
                    if n == 0 {
                        break;
                    }
                    request.extend_from_slice(&buf[..n]);
                }
                counter.fetch_add(1, Ordering::SeqCst);
                let reply = format!(
                    "HTTP/1.1 {status} Status\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                    body.len()
                );
                stream.write_all(reply.as_bytes()).await.unwrap();
                stream.shutdown().await.unwrap();
            }
        });
        (url, hits)
    }

    #[derive(Default)]
    struct CountingToken {
        refreshes: AtomicUsize,
    }

    impl TokenSource for CountingToken {
        async fn token(&self, refresh: bool) -> Result<String> {
            if refresh {
                self.refreshes.fetch_add(1, Ordering::SeqCst);
            }
            Ok("Bearer test".to_owned())
        }
    }

    const BODY: &str = r#"{"lyrics":{"syncType":"LINE_SYNCED","lines":[{"startTimeMs":"960","words":"One"},{"startTimeMs":"3120","words":"♪"}]}}"#;

    #[test]
    fn static_token_prefix() {
        assert_eq!(StaticToken::new(" abc ").0, "Bearer abc");
        assert_eq!(StaticToken::new("Bearer abc").0, "Bearer abc");
    }

    #[test]
    fn unsynced_lyrics_are_skipped() {
        let body: ColorLyrics = serde_json::from_str(
            r#"{"lyrics":{"syncType":"UNSYNCED","lines":[{"startTimeMs":"0","words":"a"}]}}"#,
        )
        .unwrap();
        assert_eq!(body.into_synced().unwrap(), None);
    }

    #[tokio::test]
    async fn fetch_parses_lines() {
        let (url, hits) = serve(vec![(200, BODY)]).await;
        let client = SpotifyLyrics::with_base_url(CountingToken::default(), &url);
        let lyrics = client.fetch("track").await.unwrap().unwrap();
        assert_eq!(lyrics.line_at(TimeTag::from_millis(1000)), Some("One"));
        assert_eq!(lyrics.line_at(TimeTag::from_millis(3120)), Some("♪"));
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn missing_lyrics() {
        let (url, _) = serve(vec![(404, "")]).await;
        let client = SpotifyLyrics::with_base_url(CountingToken::default(), &url);
        assert_eq!(client.fetch("track").await.unwrap(), None);
    }

    #[tokio::test]
    async fn refreshes_token_once() {
        let (url, hits) = serve(vec![(401, ""), (200, BODY)]).await;
        let client = SpotifyLyrics::with_base_url(CountingToken::default(), &url);
        assert!(client.fetch("track").await.unwrap().is_some());
        assert_eq!(client.tokens.refreshes.load(Ordering::SeqCst), 1);
        assert_eq!(hits.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn gives_up_after_repeated_rejection() {
        let (url, hits) = serve(vec![(401, ""), (401, ""), (200, BODY)]).await;
        let client = SpotifyLyrics::with_base_url(CountingToken::default(), &url);
        assert!(client.fetch("track").await.is_err());
        assert_eq!(hits.load(Ordering::SeqCst), MAX_AUTH_ATTEMPTS);
    }

    #[tokio::test]
    async fn unexpected_status_is_error() {
        let (url, _) = serve(vec![(500, "boom")]).await;
        let client = SpotifyLyrics::with_base_url(CountingToken::default(), &url);
        let err = client.fetch("track").await.unwrap_err();
        assert!(err.to_string().contains("500"), "{err}");
    }
}
