//! Read side of the watched-account set.

use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::types::{PlayerKey, WatchEntry};

/// Supplies the watched set; the engine reads one snapshot per cycle.
#[async_trait]
pub trait AccountRegistry: Send + Sync {
    async fn list_watched(&self) -> Result<Vec<WatchEntry>>;
}

#[async_trait]
impl<T: AccountRegistry + ?Sized> AccountRegistry for Arc<T> {
    async fn list_watched(&self) -> Result<Vec<WatchEntry>> {
        (**self).list_watched().await
    }
}

/// In-process registry.
#[derive(Default)]
pub struct MemoryRegistry {
    entries: RwLock<Vec<WatchEntry>>,
}

impl MemoryRegistry {
    pub fn new(entries: Vec<WatchEntry>) -> Self {
        Self { entries: RwLock::new(entries) }
    }

    /// Replaces an existing entry with the same key.
    pub async fn insert(&self, entry: WatchEntry) {
        let mut entries = self.entries.write().await;
        entries.retain(|e| e.player_key != entry.player_key);
        entries.push(entry);
    }

    pub async fn remove(&self, player: &PlayerKey) -> bool {
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|e| &e.player_key != player);
        entries.len() != before
    }
}

#[async_trait]
impl AccountRegistry for MemoryRegistry {
    async fn list_watched(&self) -> Result<Vec<WatchEntry>> {
        Ok(self.entries.read().await.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::RiotHandle;

    fn entry(key: &str, name: &str) -> WatchEntry {
        WatchEntry {
            player_key: PlayerKey::new(key),
            handle: RiotHandle::new(name, "BR1"),
        }
    }

    #[tokio::test]
    async fn insert_replaces_same_key_and_snapshot_is_detached() {
        let registry = MemoryRegistry::default();
        registry.insert(entry("k1", "old")).await;
        registry.insert(entry("k1", "new")).await;
        registry.insert(entry("k2", "other")).await;

        let snapshot = registry.list_watched().await.unwrap();
        assert_eq!(snapshot.len(), 2);
        assert_eq!(snapshot[0].handle.game_name, "new");

        assert!(registry.remove(&PlayerKey::new("k2")).await);
        assert!(!registry.remove(&PlayerKey::new("k2")).await);
        assert_eq!(snapshot.len(), 2);
        assert_eq!(registry.list_watched().await.unwrap().len(), 1);
    }
}
