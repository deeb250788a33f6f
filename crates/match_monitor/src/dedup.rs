//! Per-player "already notified" state plus a short-lived result cache.
//!
//! Every player has its own async mutex. The scheduler holds the guard from
//! the gate decision until the record, so two overlapping cycles can never
//! both see `should_notify == true` for the same match.
//!
//! The cache entry is only written together with `last_notified`, so the
//! `last_notified` check always decides first and the TTL never reopens a
//! notified match. The TTL bounds how long the delivered payload stays
//! readable from the cache.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::sync::OwnedMutexGuard;
use tokio::time::Instant;

use crate::types::{MatchId, NotificationPayload, PlayerKey};

#[derive(Debug, Clone)]
struct CacheEntry {
    match_id: MatchId,
    fetched_at: Instant,
    #[cfg_attr(not(test), allow(dead_code))]
    payload: NotificationPayload,
}

#[derive(Debug, Default)]
pub struct DedupState {
    last_notified: Option<MatchId>,
    cache_entry: Option<CacheEntry>,
}

impl DedupState {
    fn should_notify(&self, match_id: &MatchId, ttl: Duration) -> bool {
        if self.last_notified.as_ref() == Some(match_id) {
            return false;
        }
        match &self.cache_entry {
            Some(entry) if &entry.match_id == match_id => entry.fetched_at.elapsed() >= ttl,
            _ => true,
        }
    }

    fn record(&mut self, match_id: MatchId, payload: NotificationPayload) {
        self.cache_entry = Some(CacheEntry {
            match_id: match_id.clone(),
            fetched_at: Instant::now(),
            payload,
        });
        self.last_notified = Some(match_id);
    }
}

/// Exclusive access to one player's dedup state.
pub struct PlayerGuard {
    state: OwnedMutexGuard<DedupState>,
    ttl: Duration,
}

impl PlayerGuard {
    pub fn should_notify(&self, match_id: &MatchId) -> bool {
        self.state.should_notify(match_id, self.ttl)
    }

    /// Only after the sink accepted the payload.
    pub fn record_notified(&mut self, match_id: MatchId, payload: NotificationPayload) {
        self.state.record(match_id, payload);
    }

    fn last_notified(&self) -> Option<&MatchId> {
        self.state.last_notified.as_ref()
    }
}

pub struct DedupCache {
    ttl: Duration,
    players: Mutex<HashMap<PlayerKey, Arc<tokio::sync::Mutex<DedupState>>>>,
}

impl DedupCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            players: Mutex::new(HashMap::new()),
        }
    }

    /// Waits for exclusive access to `player`'s state, creating it on first sight.
    pub async fn lock(&self, player: &PlayerKey) -> PlayerGuard {
        let slot = {
            let mut players = self.players.lock().unwrap_or_else(PoisonError::into_inner);
            Arc::clone(players.entry(player.clone()).or_default())
        };
        PlayerGuard {
            state: slot.lock_owned().await,
            ttl: self.ttl,
        }
    }

    pub async fn should_notify(&self, player: &PlayerKey, match_id: &MatchId) -> bool {
        self.lock(player).await.should_notify(match_id)
    }

    pub async fn record_notified(
        &self,
        player: &PlayerKey,
        match_id: MatchId,
        payload: NotificationPayload,
    ) {
        self.lock(player).await.record_notified(match_id, payload);
    }

    pub async fn last_notified(&self, player: &PlayerKey) -> Option<MatchId> {
        self.lock(player).await.last_notified().cloned()
    }

    /// Payload of a still-fresh cache entry for `(player, match_id)`.
    #[cfg(test)]
    async fn cached_payload(
        &self,
        player: &PlayerKey,
        match_id: &MatchId,
    ) -> Option<NotificationPayload> {
        let guard = self.lock(player).await;
        guard
            .state
            .cache_entry
            .as_ref()
            .filter(|e| &e.match_id == match_id && e.fetched_at.elapsed() < self.ttl)
            .map(|e| e.payload.clone())
    }

    #[cfg(test)]
    fn tracked_players(&self) -> usize {
        self.players.lock().unwrap_or_else(PoisonError::into_inner).len()
    }
}
