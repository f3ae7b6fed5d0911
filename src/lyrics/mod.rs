use crate::audio::track::NowPlaying;
use serde::Deserialize;
use std::future::Future;
use tracing::{debug, warn};

#[cfg(feature = "lyrics")]
pub use self::http::HttpLyricsTransport;

/// Returned for every failed lookup.
pub const LYRICS_NOT_FOUND: &str = "Lyrics not found";

pub const LOADING_TEXT: &str = "Loading lyrics...";
pub const UNAVAILABLE_TEXT: &str = "Lyrics not available for this track";
pub const NO_TRACK_TEXT: &str = "Select a track to view lyrics";

#[derive(Debug, thiserror::Error)]
pub enum LyricsError {
    #[error("lyrics request failed: {0}")]
    Transport(String),

    #[error("lyrics service answered {0}")]
    Status(u16),

    #[error("malformed lyrics response: {0}")]
    Decode(#[from] serde_json::Error),
}

/// One GET against the lyrics service, returning the raw body.
pub trait LyricsTransport {
    fn get(&self, url: &str) -> impl Future<Output = Result<String, LyricsError>> + Send;
}

#[derive(Debug, Deserialize)]
struct LyricsResponse {
    lyrics: Option<String>,
}

/// `{endpoint}/{artist}/{title}` with both segments percent-escaped.
pub fn lyrics_url(endpoint: &str, artist: &str, title: &str) -> String {
    format!(
        "{}/{}/{}",
        endpoint.trim_end_matches('/'),
        urlencoding::encode(artist),
        urlencoding::encode(title)
    )
}

/// Looks lyrics up once per call. Never fails and never retries: anything
/// short of a non-empty `lyrics` field becomes [`LYRICS_NOT_FOUND`].
#[derive(Debug, Clone)]
pub struct LyricsResolver<T> {
    transport: T,
    endpoint: String,
}

impl<T: LyricsTransport> LyricsResolver<T> {
    pub fn new(transport: T, endpoint: impl Into<String>) -> Self {
        Self {
            transport,
            endpoint: endpoint.into(),
        }
    }

    pub async fn resolve(&self, artist: &str, title: &str) -> String {
        let url = lyrics_url(&self.endpoint, artist, title);
        debug!("Fetching lyrics from {}", url);

        match self.fetch(&url).await {
            Ok(Some(lyrics)) => lyrics,
            Ok(None) => {
                debug!("No lyrics for {} - {}", artist, title);
                LYRICS_NOT_FOUND.to_string()
            }
            Err(e) => {
                warn!("Error fetching lyrics for {} - {}: {}", artist, title, e);
                LYRICS_NOT_FOUND.to_string()
            }
        }
    }

    async fn fetch(&self, url: &str) -> Result<Option<String>, LyricsError> {
        let body = self.transport.get(url).await?;
        let response: LyricsResponse = serde_json::from_str(&body)?;
        Ok(response.lyrics.filter(|text| !text.trim().is_empty()))
    }
}

/// What the lyrics pane shows.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum LyricsPane {
    #[default]
    NoTrack,
    Loading,
    Unavailable,
    Ready(String),
}

impl LyricsPane {
    pub fn text(&self) -> &str {
        match self {
            LyricsPane::NoTrack => NO_TRACK_TEXT,
            LyricsPane::Loading => LOADING_TEXT,
            LyricsPane::Unavailable => UNAVAILABLE_TEXT,
            LyricsPane::Ready(text) => text,
        }
    }
}

/// A lookup the caller should run in the background.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LyricsRequest {
    pub id: u64,
    pub artist: String,
    pub title: String,
}

/// Pane state plus request bookkeeping, so a slow answer for a track that is
/// no longer current gets dropped.
#[derive(Debug, Default)]
pub struct LyricsTracker {
    pane: LyricsPane,
    next_id: u64,
    pending: Option<u64>,
}

impl LyricsTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pane(&self) -> &LyricsPane {
        &self.pane
    }

    /// Switches to `track`. Returns the lookup to perform, or `None` when the
    /// artist is unknown and the pane goes straight to unavailable.
    pub fn track_changed(&mut self, track: &NowPlaying) -> Option<LyricsRequest> {
        self.next_id += 1;
        match track.lyrics_query() {
            Some((artist, title)) => {
                self.pending = Some(self.next_id);
                self.pane = LyricsPane::Loading;
                Some(LyricsRequest {
                    id: self.next_id,
                    artist,
                    title,
                })
            }
            None => {
                self.pending = None;
                self.pane = LyricsPane::Unavailable;
                None
            }
        }
    }

    pub fn cleared(&mut self) {
        self.pending = None;
        self.pane = LyricsPane::NoTrack;
    }

    /// Applies a finished lookup. Returns `false` if it was stale.
    pub fn complete(&mut self, id: u64, lyrics: String) -> bool {
        if self.pending != Some(id) {
            debug!("Dropping stale lyrics response {}", id);
            return false;
        }
        self.pending = None;
        self.pane = LyricsPane::Ready(lyrics);
        true
    }
}

#[cfg(feature = "lyrics")]
mod http {
    use super::{LyricsError, LyricsTransport};
    use std::future::Future;
    use std::time::Duration;

    /// `reqwest` client with a fixed per-request timeout.
    #[derive(Debug, Clone)]
    pub struct HttpLyricsTransport {
        client: reqwest::Client,
    }

    impl HttpLyricsTransport {
        pub fn new(timeout: Duration) -> Result<Self, LyricsError> {
            let client = reqwest::Client::builder()
                .timeout(timeout)
                .user_agent(concat!("tunedeck/", env!("CARGO_PKG_VERSION")))
                .build()
                .map_err(|e| LyricsError::Transport(e.to_string()))?;
            Ok(Self { client })
        }
    }

    impl LyricsTransport for HttpLyricsTransport {
        fn get(&self, url: &str) -> impl Future<Output = Result<String, LyricsError>> + Send {
            let request = self.client.get(url);
            async move {
                let response = request
                    .send()
                    .await
                    .map_err(|e| LyricsError::Transport(e.to_string()))?;
                let status = response.status();
                if !status.is_success() {
                    return Err(LyricsError::Status(status.as_u16()));
                }
                response.text().await.map_err(|e| LyricsError::Transport(e.to_string()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;
    use std::sync::Mutex;

    struct StaticTransport {
        body: String,
        seen: Mutex<Vec<String>>,
    }

    impl StaticTransport {
        fn new(body: &str) -> Self {
            Self {
                body: body.to_string(),
                seen: Mutex::new(Vec::new()),
            }
        }
    }

    impl LyricsTransport for StaticTransport {
        fn get(&self, url: &str) -> impl Future<Output = Result<String, LyricsError>> + Send {
            self.seen.lock().unwrap().push(url.to_string());
            let body = self.body.clone();
            async move { Ok(body) }
        }
    }

    struct FailingTransport(fn() -> LyricsError);

    impl LyricsTransport for FailingTransport {
        fn get(&self, _url: &str) -> impl Future<Output = Result<String, LyricsError>> + Send {
            let err = (self.0)();
            async move { Err(err) }
        }
    }

    #[test]
    fn url_escapes_both_segments() {
        assert_eq!(
            lyrics_url("https://api.lyrics.ovh/v1/", "AC/DC", "Back in Black"),
            "https://api.lyrics.ovh/v1/AC%2FDC/Back%20in%20Black"
        );
    }

    #[tokio::test]
    async fn successful_lookup_returns_lyrics_field() {
        let transport = StaticTransport::new(r#"{"lyrics":"la la la"}"#);
        let resolver = LyricsResolver::new(transport, "https://lyrics.test/v1");
        assert_eq!(resolver.resolve("Artist", "Song Name").await, "la la la");
        assert_eq!(
            resolver.transport.seen.lock().unwrap().as_slice(),
            ["https://lyrics.test/v1/Artist/Song%20Name"]
        );
    }

    #[tokio::test]
    async fn transport_failure_yields_sentinel() {
        let resolver = LyricsResolver::new(
            FailingTransport(|| LyricsError::Transport("connection refused".into())),
            "https://lyrics.test/v1",
        );
        assert_eq!(resolver.resolve("a", "b").await, "Lyrics not found");
    }

    #[tokio::test]
    async fn not_found_status_yields_sentinel() {
        let resolver = LyricsResolver::new(FailingTransport(|| LyricsError::Status(404)), "https://lyrics.test/v1");
        assert_eq!(resolver.resolve("a", "b").await, LYRICS_NOT_FOUND);
    }

    #[tokio::test]
    async fn malformed_or_empty_bodies_yield_sentinel() {
        for body in ["<html>nope</html>", r#"{"error":"No lyrics found"}"#, r#"{"lyrics":"  "}"#] {
            let resolver = LyricsResolver::new(StaticTransport::new(body), "https://lyrics.test/v1");
            assert_eq!(resolver.resolve("a", "b").await, LYRICS_NOT_FOUND, "body {body}");
        }
    }

    #[test]
    fn unknown_artist_skips_the_lookup() {
        let mut tracker = LyricsTracker::new();
        let track = NowPlaying::degraded(0, Path::new("/m/SoloTrack.mp3"));
        assert_eq!(tracker.track_changed(&track), None);
        assert_eq!(tracker.pane().text(), UNAVAILABLE_TEXT);
    }

    #[test]
    fn stale_responses_are_dropped() {
        let mut tracker = LyricsTracker::new();
        let first = tracker
            .track_changed(&NowPlaying::degraded(0, Path::new("/m/A - One.mp3")))
            .unwrap();
        assert_eq!(tracker.pane(), &LyricsPane::Loading);

        let second = tracker
            .track_changed(&NowPlaying::degraded(1, Path::new("/m/B - Two.mp3")))
            .unwrap();
        assert_eq!((second.artist.as_str(), second.title.as_str()), ("B", "Two"));

        assert!(!tracker.complete(first.id, "old words".into()));
        assert_eq!(tracker.pane(), &LyricsPane::Loading);
        assert!(tracker.complete(second.id, "new words".into()));
        assert_eq!(tracker.pane().text(), "new words");
    }

    #[test]
    fn clearing_shows_placeholder() {
        let mut tracker = LyricsTracker::new();
        tracker.track_changed(&NowPlaying::degraded(0, Path::new("/m/A - One.mp3")));
        tracker.cleared();
        assert_eq!(tracker.pane().text(), NO_TRACK_TEXT);
    }
}
