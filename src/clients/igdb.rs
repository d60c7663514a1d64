use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::constants::{IGDB_API, TWITCH_OAUTH_URL, USER_AGENT};
use crate::models::media::MediaKind;
use crate::models::metadata::{MetadataMatch, MetadataSource};

use super::throttle::RequestThrottle;

#[derive(Debug, Deserialize)]
struct TwitchTokenResponse {
    access_token: String,
    expires_in: u64,
}

#[derive(Debug, Clone)]
struct CachedToken {
    access_token: String,
    expires_at: Instant,
}

/// Reported by /api/igdb/status.
#[derive(Debug, Clone, Serialize)]
pub struct TokenStatus {
    pub valid: bool,
    pub expires_in_seconds: Option<u64>,
}

/// Client-credentials token cache for the Twitch OAuth endpoint IGDB
/// authenticates against.
///
/// A cached token is considered usable while more than the safety margin
/// remains before expiry; past that point the next caller refreshes it.
/// A failed refresh is retried once before the error propagates.
pub struct TwitchTokenCache {
    http: Client,
    client_id: String,
    client_secret: String,
    safety_margin: Duration,
    cached: RwLock<Option<CachedToken>>,
    oauth_url: String,
}

impl TwitchTokenCache {
    #[must_use]
    pub fn new(http: Client, client_id: String, client_secret: String, safety_margin: Duration) -> Self {
        Self {
            http,
            client_id,
            client_secret,
            safety_margin,
            cached: RwLock::new(None),
            oauth_url: TWITCH_OAUTH_URL.to_string(),
        }
    }

    #[cfg(test)]
    fn with_oauth_url(mut self, url: String) -> Self {
        self.oauth_url = url;
        self
    }

    /// Returns a token with at least the safety margin of validity left,
    /// refreshing if needed.
    pub async fn token(&self) -> Result<String> {
        if let Some(token) = self.usable_token().await {
            return Ok(token);
        }

        match self.refresh().await {
            Ok(token) => Ok(token),
            Err(err) => {
                warn!("Twitch token refresh failed, retrying once: {err}");
                self.refresh().await
            }
        }
    }

    async fn usable_token(&self) -> Option<String> {
        let guard = self.cached.read().await;
        let cached = guard.as_ref()?;
        let remaining = cached.expires_at.checked_duration_since(Instant::now())?;
        (remaining > self.safety_margin).then(|| cached.access_token.clone())
    }

    async fn refresh(&self) -> Result<String> {
        let params = [
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.client_secret.as_str()),
            ("grant_type", "client_credentials"),
        ];

        let response = self.http.post(&self.oauth_url).form(&params).send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("Twitch OAuth error: {status} - {body}");
        }

        let token: TwitchTokenResponse = response.json().await?;
        let expires_at = Instant::now() + Duration::from_secs(token.expires_in);

        debug!("Twitch token refreshed, valid for {}s", token.expires_in);

        *self.cached.write().await = Some(CachedToken {
            access_token: token.access_token.clone(),
            expires_at,
        });

        Ok(token.access_token)
    }

    /// Eagerly refresh when the cached token is inside the safety margin.
    pub async fn warm_up(&self) -> Result<()> {
        self.token().await.map(|_| ())
    }

    pub async fn status(&self) -> TokenStatus {
        let guard = self.cached.read().await;
        match guard.as_ref() {
            Some(cached) => {
                let remaining = cached
                    .expires_at
                    .checked_duration_since(Instant::now())
                    .unwrap_or(Duration::ZERO);
                TokenStatus {
                    valid: remaining > self.safety_margin,
                    expires_in_seconds: Some(remaining.as_secs()),
                }
            }
            None => TokenStatus {
                valid: false,
                expires_in_seconds: None,
            },
        }
    }
}

#[derive(Debug, Deserialize)]
struct IgdbGame {
    id: i64,
    name: String,
    summary: Option<String>,
    cover: Option<IgdbCover>,
    first_release_date: Option<i64>,
    rating: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct IgdbCover {
    image_id: Option<String>,
}

/// Limiter + token state for /api/igdb/status.
#[derive(Debug, Clone, Serialize)]
pub struct IgdbStatus {
    pub token: TokenStatus,
    pub window_in_flight: usize,
    pub window_capacity: usize,
}

/// IGDB v4 client. Every request passes the sliding-window throttle and
/// carries a cached Twitch OAuth token.
#[derive(Clone)]
pub struct IgdbClient {
    http: Client,
    client_id: String,
    tokens: Arc<TwitchTokenCache>,
    throttle: Arc<RequestThrottle>,
    base_url: String,
}

impl IgdbClient {
    #[must_use]
    pub fn new(
        http: Client,
        client_id: String,
        tokens: Arc<TwitchTokenCache>,
        throttle: Arc<RequestThrottle>,
    ) -> Self {
        Self {
            http,
            client_id,
            tokens,
            throttle,
            base_url: IGDB_API.to_string(),
        }
    }

    pub async fn search_games(&self, query: &str) -> Result<Vec<MetadataMatch>> {
        // Apicalypse query body; search is fuzzy on name.
        let body = format!(
            "search \"{}\"; fields name,summary,cover.image_id,first_release_date,rating; limit 10;",
            query.replace('"', "")
        );

        let games: Vec<IgdbGame> = self.post("games", body).await?;
        Ok(games.into_iter().map(map_game).collect())
    }

    pub async fn get_game(&self, id: i64) -> Result<Option<MetadataMatch>> {
        let body = format!(
            "fields name,summary,cover.image_id,first_release_date,rating; where id = {id};"
        );

        let games: Vec<IgdbGame> = self.post("games", body).await?;
        Ok(games.into_iter().next().map(map_game))
    }

    async fn post<T: serde::de::DeserializeOwned>(&self, endpoint: &str, body: String) -> Result<T> {
        self.throttle.acquire().await;
        let token = self.tokens.token().await?;

        let response = self
            .http
            .post(format!("{}/{endpoint}", self.base_url))
            .header("Client-ID", &self.client_id)
            .header("Authorization", format!("Bearer {token}"))
            .header("User-Agent", USER_AGENT)
            .body(body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("IGDB API error: {status} - {body}");
        }

        Ok(response.json().await?)
    }

    pub async fn status(&self) -> IgdbStatus {
        IgdbStatus {
            token: self.tokens.status().await,
            window_in_flight: self.throttle.in_flight().await,
            window_capacity: self.throttle.capacity(),
        }
    }

    /// Delegates to the token cache; used by the scheduler warm-up job.
    pub async fn warm_up(&self) -> Result<()> {
        self.tokens.warm_up().await
    }
}

fn map_game(game: IgdbGame) -> MetadataMatch {
    MetadataMatch {
        external_id: game.id.to_string(),
        source: MetadataSource::Igdb,
        kind: MediaKind::Games,
        title: game.name,
        description: game.summary,
        cover_url: game.cover.and_then(|c| c.image_id).map(|image_id| {
            format!("https://images.igdb.com/igdb/image/upload/t_cover_big/{image_id}.jpg")
        }),
        release_year: game
            .first_release_date
            .and_then(|ts| chrono::DateTime::from_timestamp(ts, 0))
            .map(|dt| {
                use chrono::Datelike;
                dt.year()
            }),
        // IGDB scores are 0-100.
        score: game.rating.map(|r| (r / 20.0) as f32),
        page_count: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_map_game_normalizes_score_and_cover() {
        let game = IgdbGame {
            id: 1942,
            name: "The Witcher 3: Wild Hunt".to_string(),
            summary: Some("A story-driven open world RPG.".to_string()),
            cover: Some(IgdbCover {
                image_id: Some("co1wyy".to_string()),
            }),
            first_release_date: Some(1_431_993_600),
            rating: Some(93.4),
        };

        let m = map_game(game);
        assert_eq!(m.external_id, "1942");
        assert_eq!(m.kind, MediaKind::Games);
        assert_eq!(m.release_year, Some(2015));
        assert!((m.score.unwrap() - 4.67).abs() < 0.01);
        assert!(m.cover_url.unwrap().contains("co1wyy"));
    }

    #[tokio::test]
    async fn test_status_without_token() {
        let cache = TwitchTokenCache::new(
            Client::new(),
            "id".to_string(),
            "secret".to_string(),
            Duration::from_secs(300),
        );

        let status = cache.status().await;
        assert!(!status.valid);
        assert_eq!(status.expires_in_seconds, None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_safety_margin_invalidates_token() {
        let cache = TwitchTokenCache::new(
            Client::new(),
            "id".to_string(),
            "secret".to_string(),
            Duration::from_secs(300),
        )
        .with_oauth_url("http://127.0.0.1:0/unreachable".to_string());

        // Plant a token expiring in 10 minutes: usable now, not usable
        // once less than the 5 minute margin remains.
        *cache.cached.write().await = Some(CachedToken {
            access_token: "tok".to_string(),
            expires_at: Instant::now() + Duration::from_secs(600),
        });

        assert_eq!(cache.usable_token().await.as_deref(), Some("tok"));
        assert!(cache.status().await.valid);

        tokio::time::advance(Duration::from_secs(360)).await;

        assert_eq!(cache.usable_token().await, None);
        assert!(!cache.status().await.valid);
    }
}
