//! MatchDetail + PlayerKey → NotificationPayload

use async_trait::async_trait;
use std::sync::Arc;
use tracing::warn;

use crate::error::{ExtractError, FetchError};
use crate::types::{Kda, MatchDetail, MatchId, NotificationPayload, Outcome, PlayerKey};

/// Last-known-good Data Dragon version, used when the live lookup fails.
pub const FALLBACK_ASSET_VERSION: &str = "12.10.1";

/// Source of the current static-asset version (Data Dragon `versions.json`).
#[async_trait]
pub trait AssetVersions: Send + Sync {
    async fn current_version(&self) -> Result<String, FetchError>;
}

/// Always answers with the same version. Handy offline and in tests.
pub struct FixedAssetVersion(pub String);

#[async_trait]
impl AssetVersions for FixedAssetVersion {
    async fn current_version(&self) -> Result<String, FetchError> {
        Ok(self.0.clone())
    }
}

pub fn champion_image_url(version: &str, champion: &str) -> String {
    format!("http://ddragon.leagueoflegends.com/cdn/{version}/img/champion/{champion}.png")
}

/// Pure part of the extraction.
pub fn extract(
    detail: &MatchDetail,
    player: &PlayerKey,
    asset_version: &str,
) -> Result<NotificationPayload, ExtractError> {
    let participant = detail
        .info
        .participants
        .iter()
        .find(|p| p.puuid == player.as_str())
        .ok_or_else(|| ExtractError::PlayerNotInMatch(player.clone()))?;

    Ok(NotificationPayload {
        player_key: player.clone(),
        match_id: MatchId::new(detail.metadata.match_id.clone()),
        player_name: participant.display_name().to_string(),
        unit_played: participant.champion_name.clone(),
        outcome: Outcome::from_win_flag(participant.win),
        stats: Kda {
            kills: participant.kills,
            deaths: participant.deaths,
            assists: participant.assists,
        },
        mode: detail.info.game_mode.clone(),
        image_ref: champion_image_url(asset_version, &participant.champion_name),
    })
}

pub struct MatchInfoExtractor {
    assets: Arc<dyn AssetVersions>,
}

impl MatchInfoExtractor {
    pub fn new(assets: Arc<dyn AssetVersions>) -> Self {
        Self { assets }
    }

    /// Best effort: any lookup failure falls back to [`FALLBACK_ASSET_VERSION`].
    pub async fn asset_version(&self) -> String {
        match self.assets.current_version().await {
            Ok(version) if !version.trim().is_empty() => version,
            Ok(_) => {
                warn!("empty asset version, falling back to {FALLBACK_ASSET_VERSION}");
                FALLBACK_ASSET_VERSION.to_string()
            }
            Err(e) => {
                warn!("asset version lookup failed ({e}), falling back to {FALLBACK_ASSET_VERSION}");
                FALLBACK_ASSET_VERSION.to_string()
            }
        }
    }

    pub async fn extract(
        &self,
        detail: &MatchDetail,
        player: &PlayerKey,
    ) -> Result<NotificationPayload, ExtractError> {
        // cheap check first so a bad match never costs an asset lookup
        if !detail.info.participants.iter().any(|p| p.puuid == player.as_str()) {
            return Err(ExtractError::PlayerNotInMatch(player.clone()));
        }
        let version = self.asset_version().await;
        extract(detail, player, &version)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct BrokenAssets;

    #[async_trait]
    impl AssetVersions for BrokenAssets {
        async fn current_version(&self) -> Result<String, FetchError> {
            Err(FetchError::Transient("HTTP 503".into()))
        }
    }

    fn detail() -> MatchDetail {
        serde_json::from_value(serde_json::json!({
            "metadata": { "matchId": "BR1_100", "participants": ["p1", "p2"] },
            "info": {
                "gameMode": "ARAM",
                "gameDuration": 1260,
                "participants": [
                    { "puuid": "p1", "championName": "Lux", "summonerName": "Alpha",
                      "win": false, "kills": 4, "deaths": 9, "assists": 21 },
                    { "puuid": "p2", "championName": "Garen", "summonerName": "Bravo",
                      "riotIdGameName": "BravoRiot", "win": true, "kills": 12, "deaths": 3, "assists": 5 }
                ]
            }
        }))
        .unwrap()
    }

    #[test]
    fn projects_participant_fields() {
        let payload = extract(&detail(), &PlayerKey::new("p2"), "14.1.1").unwrap();

        assert_eq!(payload.match_id, MatchId::new("BR1_100"));
        assert_eq!(payload.player_name, "BravoRiot");
        assert_eq!(payload.unit_played, "Garen");
        assert_eq!(payload.outcome, Outcome::Win);
        assert_eq!(payload.stats.to_string(), "12/3/5");
        assert_eq!(payload.mode, "ARAM");
        assert_eq!(
            payload.image_ref,
            "http://ddragon.leagueoflegends.com/cdn/14.1.1/img/champion/Garen.png"
        );
    }

    #[test]
    fn loss_is_taken_verbatim() {
        let payload = extract(&detail(), &PlayerKey::new("p1"), "14.1.1").unwrap();
        assert_eq!(payload.outcome, Outcome::Loss);
        assert_eq!(payload.player_name, "Alpha");
    }

    #[test]
    fn missing_player_is_a_skip_not_a_panic() {
        let err = extract(&detail(), &PlayerKey::new("ghost"), "14.1.1").unwrap_err();
        assert_eq!(err, ExtractError::PlayerNotInMatch(PlayerKey::new("ghost")));
    }

    #[tokio::test]
    async fn asset_lookup_failure_uses_fallback_version() {
        let extractor = MatchInfoExtractor::new(Arc::new(BrokenAssets));
        let payload = extractor.extract(&detail(), &PlayerKey::new("p1")).await.unwrap();
        assert_eq!(
            payload.image_ref,
            "http://ddragon.leagueoflegends.com/cdn/12.10.1/img/champion/Lux.png"
        );
    }

    #[tokio::test]
    async fn live_asset_version_is_used_when_available() {
        let extractor = MatchInfoExtractor::new(Arc::new(FixedAssetVersion("14.20.1".into())));
        let payload = extractor.extract(&detail(), &PlayerKey::new("p1")).await.unwrap();
        assert!(payload.image_ref.contains("/cdn/14.20.1/"));
    }
}
