//! Riot Games API client pro match monitor
//!
//! Endpointy (regionální routing host, default `americas`):
//!   GET /riot/account/v1/accounts/by-riot-id/{gameName}/{tagLine}
//!   GET /lol/match/v5/matches/by-puuid/{puuid}/ids?start=0&count={n}
//!   GET /lol/match/v5/matches/{matchId}
//!
//! Data Dragon:
//!   GET https://ddragon.leagueoflegends.com/api/versions.json  (newest first)
//!
//! One call = one HTTP attempt. Retry lives in `match_monitor::RetryingFetcher`.

use anyhow::{Context, Result};
use async_trait::async_trait;
use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use match_monitor::{
    AssetVersions, FetchError, MatchDetail, MatchId, MatchSource, PlayerKey, RiotHandle,
};
use reqwest::{StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::num::NonZeroU32;
use std::time::Duration;
use tracing::debug;

pub const DEFAULT_REGION: &str = "americas";
pub const DEFAULT_RATE_LIMIT_PER_SEC: u32 = 20;
pub const DDRAGON_VERSIONS_URL: &str = "https://ddragon.leagueoflegends.com/api/versions.json";

#[derive(Debug, Clone)]
pub struct RiotConfig {
    pub api_key: String,
    /// Routing value: americas | europe | asia | sea
    pub region: String,
    pub request_timeout: Duration,
    pub rate_limit_per_sec: u32,
}

impl RiotConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            region: DEFAULT_REGION.to_string(),
            request_timeout: Duration::from_secs(10),
            rate_limit_per_sec: DEFAULT_RATE_LIMIT_PER_SEC,
        }
    }

    /// `RIOT_API_KEY` (required), `RIOT_REGION`, `MATCHWATCH_RATE_LIMIT_PER_SEC`.
    pub fn from_env() -> Result<Self> {
        let api_key = std::env::var("RIOT_API_KEY")
            .ok()
            .filter(|k| !k.trim().is_empty())
            .context("RIOT_API_KEY is not set")?;
        let mut cfg = Self::new(api_key);

        if let Ok(region) = std::env::var("RIOT_REGION") {
            if !region.trim().is_empty() {
                cfg.region = region.trim().to_lowercase();
            }
        }
        if let Ok(raw) = std::env::var("MATCHWATCH_RATE_LIMIT_PER_SEC") {
            cfg.rate_limit_per_sec = raw
                .trim()
                .parse()
                .with_context(|| format!("invalid MATCHWATCH_RATE_LIMIT_PER_SEC {raw:?}"))?;
        }
        Ok(cfg)
    }

    pub fn base_url(&self) -> String {
        format!("https://{}.api.riotgames.com", self.region)
    }
}

/// Maps a non-200 status to the fetch taxonomy. Only 404 is definitive;
/// everything else (auth and bad-request answers included) is retried.
pub fn classify_status(status: StatusCode, body: &str) -> FetchError {
    let snippet: String = body.chars().take(200).collect();
    match status {
        StatusCode::NOT_FOUND => FetchError::NotFound,
        _ => FetchError::Transient(format!("HTTP {status}: {snippet}")),
    }
}

fn transport_error(err: reqwest::Error) -> FetchError {
    if err.is_decode() {
        FetchError::Permanent(err.to_string())
    } else {
        FetchError::Transient(err.to_string())
    }
}

fn rate_limiter(per_sec: u32) -> DefaultDirectRateLimiter {
    let per_sec = NonZeroU32::new(per_sec).unwrap_or(NonZeroU32::MIN);
    RateLimiter::direct(Quota::per_second(per_sec))
}

async fn get_json<T: DeserializeOwned>(
    client: &reqwest::Client,
    limiter: &DefaultDirectRateLimiter,
    url: Url,
    api_key: Option<&str>,
) -> std::result::Result<T, FetchError> {
    limiter.until_ready().await;

    let mut req = client.get(url.clone());
    if let Some(key) = api_key {
        req = req.header("X-Riot-Token", key);
    }
    let resp = req.send().await.map_err(transport_error)?;

    let status = resp.status();
    if status != StatusCode::OK {
        let body = resp.text().await.unwrap_or_default();
        debug!("GET {} → {status}", url.path());
        return Err(classify_status(status, &body));
    }

    let raw = resp.text().await.map_err(transport_error)?;
    serde_json::from_str(&raw).map_err(|e| {
        FetchError::Permanent(format!("unexpected body from {}: {e}", url.path()))
    })
}

#[derive(Debug, Deserialize)]
struct AccountDto {
    puuid: String,
}

pub struct RiotClient {
    client: reqwest::Client,
    api_key: String,
    base_url: Url,
    limiter: DefaultDirectRateLimiter,
}

impl RiotClient {
    pub fn new(cfg: &RiotConfig) -> Result<Self> {
        Self::with_base_url(cfg, &cfg.base_url())
    }

    /// Points the client at another host (proxy, local mock).
    pub fn with_base_url(cfg: &RiotConfig, base_url: &str) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent("matchwatch/0.1")
            .timeout(cfg.request_timeout)
            .build()
            .context("failed to build reqwest client")?;
        let base_url = Url::parse(base_url).with_context(|| format!("bad base url {base_url}"))?;

        Ok(Self {
            client,
            api_key: cfg.api_key.clone(),
            base_url,
            limiter: rate_limiter(cfg.rate_limit_per_sec),
        })
    }

    /// Base URL + escaped path segments.
    pub fn endpoint(&self, segments: &[&str]) -> std::result::Result<Url, FetchError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| FetchError::Permanent(format!("base url {} cannot hold a path", self.base_url)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn get<T: DeserializeOwned>(&self, url: Url) -> std::result::Result<T, FetchError> {
        get_json(&self.client, &self.limiter, url, Some(&self.api_key)).await
    }
}

#[async_trait]
impl MatchSource for RiotClient {
    async fn resolve_identity(&self, handle: &RiotHandle) -> std::result::Result<PlayerKey, FetchError> {
        let url = self.endpoint(&[
            "riot", "account", "v1", "accounts", "by-riot-id",
            handle.game_name.as_str(), handle.tag_line.as_str(),
        ])?;
        let account: AccountDto = self.get(url).await?;
        Ok(PlayerKey::new(account.puuid))
    }

    async fn list_recent_matches(
        &self,
        player: &PlayerKey,
        count: u32,
    ) -> std::result::Result<Vec<MatchId>, FetchError> {
        let mut url = self.endpoint(&[
            "lol", "match", "v5", "matches", "by-puuid", player.as_str(), "ids",
        ])?;
        url.query_pairs_mut()
            .append_pair("start", "0")
            .append_pair("count", &count.to_string());

        let ids: Vec<String> = self.get(url).await?;
        Ok(ids.into_iter().map(MatchId::new).collect())
    }

    async fn fetch_match_detail(&self, match_id: &MatchId) -> std::result::Result<MatchDetail, FetchError> {
        let url = self.endpoint(&["lol", "match", "v5", "matches", match_id.as_str()])?;
        self.get(url).await
    }
}

/// Data Dragon `versions.json` lookup; first entry is the live patch.
pub struct DataDragon {
    client: reqwest::Client,
    versions_url: Url,
    limiter: DefaultDirectRateLimiter,
}

impl DataDragon {
    pub fn new() -> Result<Self> {
        Self::with_url(DDRAGON_VERSIONS_URL)
    }

    pub fn with_url(versions_url: &str) -> Result<Self> {
        Ok(Self {
            client: reqwest::Client::builder()
                .timeout(Duration::from_secs(5))
                .build()
                .context("failed to build reqwest client")?,
            versions_url: Url::parse(versions_url)
                .with_context(|| format!("bad versions url {versions_url}"))?,
            limiter: rate_limiter(5),
        })
    }
}

#[async_trait]
impl AssetVersions for DataDragon {
    async fn current_version(&self) -> std::result::Result<String, FetchError> {
        let versions: Vec<String> =
            get_json(&self.client, &self.limiter, self.versions_url.clone(), None).await?;
        versions
            .into_iter()
            .next()
            .ok_or_else(|| FetchError::Permanent("versions.json is empty".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> RiotClient {
        RiotClient::new(&RiotConfig::new("RGAPI-test")).unwrap()
    }

    #[test]
    fn status_classification() {
        assert_eq!(classify_status(StatusCode::NOT_FOUND, ""), FetchError::NotFound);
        assert!(classify_status(StatusCode::TOO_MANY_REQUESTS, "").is_retryable());
        assert!(classify_status(StatusCode::SERVICE_UNAVAILABLE, "down").is_retryable());
        assert!(classify_status(StatusCode::NO_CONTENT, "").is_retryable());
    }

    #[test]
    fn client_errors_other_than_404_are_retryable() {
        for status in [StatusCode::BAD_REQUEST, StatusCode::UNAUTHORIZED, StatusCode::FORBIDDEN] {
            let err = classify_status(status, "bad key");
            assert!(err.is_retryable(), "{status} -> {err:?}");
        }
    }

    #[test]
    fn long_error_bodies_are_truncated() {
        let body = "x".repeat(5000);
        let FetchError::Transient(msg) = classify_status(StatusCode::BAD_GATEWAY, &body) else {
            panic!("expected transient");
        };
        assert!(msg.len() < 300);
    }

    #[test]
    fn riot_ids_are_path_escaped() {
        let url = client()
            .endpoint(&["riot", "account", "v1", "accounts", "by-riot-id", "Hide on bush", "KR1"])
            .unwrap();
        assert_eq!(
            url.as_str(),
            "https://americas.api.riotgames.com/riot/account/v1/accounts/by-riot-id/Hide%20on%20bush/KR1"
        );
    }

    #[test]
    fn region_selects_routing_host() {
        let mut cfg = RiotConfig::new("k");
        cfg.region = "europe".into();
        assert_eq!(cfg.base_url(), "https://europe.api.riotgames.com");
    }

    #[test]
    fn zero_rate_limit_is_clamped() {
        let cfg = RiotConfig { rate_limit_per_sec: 0, ..RiotConfig::new("k") };
        assert!(RiotClient::new(&cfg).is_ok());
    }
}
