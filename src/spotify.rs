use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use log::{debug, warn};
use reqwest::{Client, StatusCode, header};
use serde::Deserialize;
use thiserror::Error;

const TOKEN_URL: &str = "https://accounts.spotify.com/api/token";
const PLAYING_URL: &str = "https://api.spotify.com/v1/me/player/currently-playing";

/// Size of the album art entry we render from. The playback response lists
/// several sizes; only an exact 64x64 match is used.
const COVER_EDGE: u32 = 64;

/// Error type for the token endpoint exchange.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("token endpoint rejected refresh (HTTP {0})")]
    ServerRejected(u16),
    #[error("token request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("malformed token response: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Error type for the playback polling cycle.
///
/// "Nothing currently playing" is not represented here; it is the
/// `Ok(None)` outcome of [`SpotifyClient::poll`].
#[derive(Debug, Error)]
pub enum PollError {
    #[error("authorization failed: {0}")]
    Auth(#[from] AuthError),
    #[error("playback endpoint rejected request (HTTP {0})")]
    ServerRejected(u16),
    #[error("playback request failed: {0}")]
    Transport(reqwest::Error),
    #[error("malformed playback response: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("playback response missing field '{0}'")]
    MissingField(&'static str),
}

/// Spotify application credentials.
///
/// `client_id` and `client_secret` never change; `refresh_token` may be
/// rotated by the token endpoint.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub client_id: String,
    pub client_secret: String,
    pub refresh_token: String,
}

/// One snapshot of the player state, produced fresh each poll.
#[derive(Debug, Clone, PartialEq)]
pub struct NowPlaying {
    pub track: String,
    /// All artist names, joined with ", " in response order.
    pub artists: String,
    /// URL of the 64x64 cover image, or empty when no exact match exists.
    pub cover_url: String,
    pub id: String,
    pub progress_ms: u64,
    pub duration_ms: u64,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    refresh_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PlayingResponse {
    item: Option<Item>,
    progress_ms: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct Item {
    id: String,
    name: String,
    duration_ms: u64,
    artists: Vec<ArtistRef>,
    album: Album,
}

#[derive(Debug, Deserialize)]
struct ArtistRef {
    name: String,
}

#[derive(Debug, Deserialize)]
struct Album {
    images: Vec<ImageRef>,
}

#[derive(Debug, Deserialize)]
struct ImageRef {
    url: String,
    width: Option<u32>,
    height: Option<u32>,
}

/// Owns the access token and its refresh lifecycle.
///
/// There is no expiry bookkeeping: a stale token is discovered reactively
/// when the playback endpoint answers 401.
#[derive(Debug)]
pub struct TokenManager {
    creds: Credentials,
    access_token: Option<String>,
    http: Client,
}

impl TokenManager {
    pub fn new(http: Client, creds: Credentials) -> Self {
        Self {
            creds,
            access_token: None,
            http,
        }
    }

    /// The currently held bearer token, if any.
    pub fn token(&self) -> Option<&str> {
        self.access_token.as_deref()
    }

    /// Obtain a token if none is held yet.
    pub async fn ensure_token(&mut self) -> Result<(), AuthError> {
        if self.access_token.is_none() {
            self.refresh().await?;
        }
        Ok(())
    }

    /// Exchange the refresh token for a new access token, unconditionally.
    ///
    /// A non-200 answer surfaces as `ServerRejected` without retrying. On
    /// success the access token is replaced wholesale, and if the server
    /// rotated the refresh token the stored one is replaced too.
    pub async fn refresh(&mut self) -> Result<(), AuthError> {
        let basic = BASE64.encode(format!("{}:{}", self.creds.client_id, self.creds.client_secret));
        let response = self
            .http
            .post(TOKEN_URL)
            .header(header::AUTHORIZATION, format!("Basic {basic}"))
            .form(&[
                ("grant_type", "refresh_token"),
                ("refresh_token", self.creds.refresh_token.as_str()),
            ])
            .send()
            .await?;

        let status = response.status();
        if status != StatusCode::OK {
            return Err(AuthError::ServerRejected(status.as_u16()));
        }

        let body = response.text().await?;
        let parsed: TokenResponse = serde_json::from_str(&body)?;
        self.access_token = Some(parsed.access_token);
        if let Some(rotated) = parsed.refresh_token {
            debug!("token endpoint rotated the refresh token");
            self.creds.refresh_token = rotated;
        }
        Ok(())
    }
}

/// Polls the currently-playing endpoint, re-authenticating once on 401.
#[derive(Debug)]
pub struct SpotifyClient {
    http: Client,
    tokens: TokenManager,
}

impl SpotifyClient {
    pub fn new(http: Client, creds: Credentials) -> Self {
        let tokens = TokenManager::new(http.clone(), creds);
        Self { http, tokens }
    }

    /// Fetch the current playback state.
    ///
    /// Returns `Ok(None)` for the normal "nothing playing" outcomes (a 204
    /// answer, or a 200 with a null item). A 401 on the first attempt
    /// triggers one token refresh and exactly one retried GET; a 401 on the
    /// retry is terminal for this cycle.
    pub async fn poll(&mut self) -> Result<Option<NowPlaying>, PollError> {
        self.tokens.ensure_token().await?;

        let mut attempt = 0;
        loop {
            let bearer = self.tokens.token().unwrap_or_default().to_owned();
            let response = self
                .http
                .get(PLAYING_URL)
                .bearer_auth(&bearer)
                .send()
                .await
                .map_err(PollError::Transport)?;

            match classify(response.status(), attempt) {
                PollStep::NothingPlaying => return Ok(None),
                PollStep::RefreshAndRetry => {
                    warn!("playback endpoint returned 401, refreshing access token");
                    self.tokens.refresh().await?;
                    attempt += 1;
                }
                PollStep::ParseBody => {
                    let body = response.text().await.map_err(PollError::Transport)?;
                    return parse_playing(&body);
                }
                PollStep::Rejected(code) => return Err(PollError::ServerRejected(code)),
            }
        }
    }
}

/// What to do with one playback response, given how many retries were spent.
#[derive(Debug, PartialEq, Eq)]
enum PollStep {
    NothingPlaying,
    RefreshAndRetry,
    ParseBody,
    Rejected(u16),
}

fn classify(status: StatusCode, attempt: u32) -> PollStep {
    match status {
        StatusCode::NO_CONTENT => PollStep::NothingPlaying,
        StatusCode::UNAUTHORIZED if attempt == 0 => PollStep::RefreshAndRetry,
        StatusCode::OK => PollStep::ParseBody,
        other => PollStep::Rejected(other.as_u16()),
    }
}

/// Map the playback endpoint's JSON shape into the domain record.
fn parse_playing(body: &str) -> Result<Option<NowPlaying>, PollError> {
    let response: PlayingResponse = serde_json::from_str(body)?;
    let Some(item) = response.item else {
        return Ok(None);
    };
    let progress_ms = response
        .progress_ms
        .ok_or(PollError::MissingField("progress_ms"))?;

    let artists = item
        .artists
        .iter()
        .map(|a| a.name.as_str())
        .collect::<Vec<_>>()
        .join(", ");

    let cover_url = item
        .album
        .images
        .iter()
        .find(|img| img.width == Some(COVER_EDGE) && img.height == Some(COVER_EDGE))
        .map(|img| img.url.clone())
        .unwrap_or_default();

    Ok(Some(NowPlaying {
        track: item.name,
        artists,
        cover_url,
        id: item.id,
        progress_ms,
        duration_ms: item.duration_ms,
    }))
}
