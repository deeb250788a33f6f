//! `registered_accounts.json`: PUUID → {riot_id, tagline, puuid}
//!
//! Re-read on every `list_watched`, so accounts added by `matchwatch-register`
//! while the watcher runs are picked up on the next cycle.

use anyhow::{Context, Result};
use async_trait::async_trait;
use match_monitor::{AccountRegistry, PlayerKey, RiotHandle, WatchEntry};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct StoredAccount {
    riot_id: String,
    tagline: String,
    puuid: String,
}

impl From<&StoredAccount> for WatchEntry {
    fn from(a: &StoredAccount) -> Self {
        WatchEntry {
            player_key: PlayerKey::new(a.puuid.clone()),
            handle: RiotHandle::new(a.riot_id.clone(), a.tagline.clone()),
        }
    }
}

pub struct JsonFileRegistry {
    path: PathBuf,
}

impl JsonFileRegistry {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn load(&self) -> Result<BTreeMap<String, StoredAccount>> {
        let raw = match tokio::fs::read_to_string(&self.path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(BTreeMap::new()),
            Err(e) => return Err(e).with_context(|| format!("read {}", self.path.display())),
        };
        if raw.trim().is_empty() {
            return Ok(BTreeMap::new());
        }
        serde_json::from_str(&raw).with_context(|| format!("parse {}", self.path.display()))
    }

    async fn save(&self, accounts: &BTreeMap<String, StoredAccount>) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await.ok();
            }
        }
        let tmp = self.path.with_extension("json.tmp");
        let body = serde_json::to_string_pretty(accounts)?;
        tokio::fs::write(&tmp, body)
            .await
            .with_context(|| format!("write {}", tmp.display()))?;
        tokio::fs::rename(&tmp, &self.path)
            .await
            .with_context(|| format!("replace {}", self.path.display()))?;
        Ok(())
    }

    /// Returns `false` when the key was already registered (entry refreshed).
    pub async fn register(&self, entry: &WatchEntry) -> Result<bool> {
        let mut accounts = self.load().await?;
        let key = entry.player_key.to_string();
        let stored = StoredAccount {
            riot_id: entry.handle.game_name.clone(),
            tagline: entry.handle.tag_line.clone(),
            puuid: key.clone(),
        };
        let is_new = accounts.insert(key, stored).is_none();
        self.save(&accounts).await?;
        info!("registered {} ({})", entry.handle, entry.player_key);
        Ok(is_new)
    }

    /// Riot IDs are case-insensitive.
    pub async fn find_by_handle(&self, handle: &RiotHandle) -> Result<Option<WatchEntry>> {
        Ok(self
            .load()
            .await?
            .values()
            .find(|a| same_handle(a, handle))
            .map(WatchEntry::from))
    }

    pub async fn remove_by_handle(&self, handle: &RiotHandle) -> Result<Option<PlayerKey>> {
        let mut accounts = self.load().await?;
        let Some(key) = accounts
            .values()
            .find(|a| same_handle(a, handle))
            .map(|a| a.puuid.clone())
        else {
            return Ok(None);
        };
        accounts.remove(&key);
        self.save(&accounts).await?;
        info!("removed {handle}");
        Ok(Some(PlayerKey::new(key)))
    }
}

fn same_handle(account: &StoredAccount, handle: &RiotHandle) -> bool {
    account.riot_id.eq_ignore_ascii_case(&handle.game_name)
        && account.tagline.eq_ignore_ascii_case(&handle.tag_line)
}

#[async_trait]
impl AccountRegistry for JsonFileRegistry {
    async fn list_watched(&self) -> Result<Vec<WatchEntry>> {
        Ok(self.load().await?.values().map(WatchEntry::from).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(puuid: &str, name: &str, tag: &str) -> WatchEntry {
        WatchEntry {
            player_key: PlayerKey::new(puuid),
            handle: RiotHandle::new(name, tag),
        }
    }

    #[tokio::test]
    async fn missing_file_is_an_empty_registry() {
        let dir = tempfile::tempdir().unwrap();
        let reg = JsonFileRegistry::new(dir.path().join("nope.json"));
        assert!(reg.list_watched().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn register_find_and_remove() {
        let dir = tempfile::tempdir().unwrap();
        let reg = JsonFileRegistry::new(dir.path().join("data/registered_accounts.json"));

        assert!(reg.register(&entry("puuid-1", "Faker", "KR1")).await.unwrap());
        assert!(!reg.register(&entry("puuid-1", "Faker", "KR1")).await.unwrap());
        assert!(reg.register(&entry("puuid-2", "Caps", "EUW")).await.unwrap());
        assert_eq!(reg.list_watched().await.unwrap().len(), 2);

        let found = reg.find_by_handle(&RiotHandle::new("faker", "kr1")).await.unwrap();
        assert_eq!(found.map(|e| e.player_key), Some(PlayerKey::new("puuid-1")));

        let removed = reg.remove_by_handle(&RiotHandle::new("Caps", "EUW")).await.unwrap();
        assert_eq!(removed, Some(PlayerKey::new("puuid-2")));
        assert_eq!(reg.remove_by_handle(&RiotHandle::new("Caps", "EUW")).await.unwrap(), None);
        assert_eq!(reg.list_watched().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn reads_puuid_keyed_file_format() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("registered_accounts.json");
        std::fs::write(
            &path,
            r#"{"abc-123": {"riot_id": "Mago", "tagline": "BR1", "puuid": "abc-123"}}"#,
        )
        .unwrap();

        let watched = JsonFileRegistry::new(&path).list_watched().await.unwrap();
        assert_eq!(watched, vec![entry("abc-123", "Mago", "BR1")]);
    }

    #[tokio::test]
    async fn corrupt_file_is_an_error_not_an_empty_set() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("registered_accounts.json");
        std::fs::write(&path, "{not json").unwrap();
        assert!(JsonFileRegistry::new(&path).list_watched().await.is_err());
    }
}
