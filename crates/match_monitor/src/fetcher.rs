//! Upstream reads wrapped in a bounded retry.

use async_trait::async_trait;
use std::future::Future;
use std::sync::Arc;
use tokio::time::sleep;
use tracing::{debug, warn};

use crate::config::RetryPolicy;
use crate::error::FetchError;
use crate::types::{MatchDetail, MatchId, PlayerKey, RiotHandle};

/// The three logical reads the engine needs from the match-data API.
///
/// One call is one attempt; retrying is [`RetryingFetcher`]'s job.
#[async_trait]
pub trait MatchSource: Send + Sync {
    async fn resolve_identity(&self, handle: &RiotHandle) -> Result<PlayerKey, FetchError>;

    /// Most recent first.
    async fn list_recent_matches(
        &self,
        player: &PlayerKey,
        count: u32,
    ) -> Result<Vec<MatchId>, FetchError>;

    async fn fetch_match_detail(&self, match_id: &MatchId) -> Result<MatchDetail, FetchError>;
}

#[async_trait]
impl<T: MatchSource + ?Sized> MatchSource for Arc<T> {
    async fn resolve_identity(&self, handle: &RiotHandle) -> Result<PlayerKey, FetchError> {
        (**self).resolve_identity(handle).await
    }

    async fn list_recent_matches(
        &self,
        player: &PlayerKey,
        count: u32,
    ) -> Result<Vec<MatchId>, FetchError> {
        (**self).list_recent_matches(player, count).await
    }

    async fn fetch_match_detail(&self, match_id: &MatchId) -> Result<MatchDetail, FetchError> {
        (**self).fetch_match_detail(match_id).await
    }
}

/// Runs `op` until it succeeds, fails non-retryably, or the attempt budget is spent.
///
/// The delay is slept between attempts only, never after the last one.
pub async fn retry<T, F, Fut>(policy: RetryPolicy, what: &str, mut op: F) -> Result<T, FetchError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, FetchError>>,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 0;

    loop {
        attempt += 1;
        match op().await {
            Ok(value) => return Ok(value),
            Err(err) if err.is_retryable() && attempt < max_attempts => {
                warn!(
                    "{what} failed (attempt {attempt}/{max_attempts}): {err}; retrying in {}s",
                    policy.delay.as_secs_f32()
                );
                sleep(policy.delay).await;
            }
            Err(err) => {
                if err.is_retryable() {
                    warn!("{what} gave up after {attempt} attempts: {err}");
                } else {
                    debug!("{what} failed without retry: {err}");
                }
                return Err(err);
            }
        }
    }
}

#[derive(Clone)]
pub struct RetryingFetcher {
    source: Arc<dyn MatchSource>,
    policy: RetryPolicy,
}

impl RetryingFetcher {
    pub fn new(source: Arc<dyn MatchSource>, policy: RetryPolicy) -> Self {
        Self { source, policy }
    }

    pub async fn resolve_identity(&self, handle: &RiotHandle) -> Result<PlayerKey, FetchError> {
        retry(self.policy, "resolve_identity", move || self.source.resolve_identity(handle)).await
    }

    pub async fn list_recent_matches(
        &self,
        player: &PlayerKey,
        count: u32,
    ) -> Result<Vec<MatchId>, FetchError> {
        retry(self.policy, "list_recent_matches", move || {
            self.source.list_recent_matches(player, count)
        })
        .await
    }

    pub async fn fetch_match_detail(&self, match_id: &MatchId) -> Result<MatchDetail, FetchError> {
        retry(self.policy, "fetch_match_detail", move || self.source.fetch_match_detail(match_id)).await
    }
}
