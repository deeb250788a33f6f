//! Domain types shared by the fetcher, dedup cache, extractor and sinks.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Stable account id returned by identity resolution (Riot PUUID).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlayerKey(String);

impl PlayerKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PlayerKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Opaque id of one completed match, e.g. `BR1_2931231231`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MatchId(String);

impl MatchId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MatchId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Human-readable Riot ID, `gameName#tagLine`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RiotHandle {
    pub game_name: String,
    pub tag_line: String,
}

impl RiotHandle {
    pub fn new(game_name: impl Into<String>, tag_line: impl Into<String>) -> Self {
        Self {
            game_name: game_name.into(),
            tag_line: tag_line.into(),
        }
    }
}

impl fmt::Display for RiotHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.game_name, self.tag_line)
    }
}

/// One watched account as exposed by an [`AccountRegistry`](crate::AccountRegistry).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WatchEntry {
    pub player_key: PlayerKey,
    pub handle: RiotHandle,
}

// ====================================================================
// Match-v5 detail (only the fields the extractor reads)
// ====================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct MatchDetail {
    pub metadata: MatchMetadata,
    pub info: MatchInfo,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchMetadata {
    pub match_id: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchInfo {
    pub game_mode: String,
    pub participants: Vec<Participant>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Participant {
    pub puuid: String,
    pub champion_name: String,
    #[serde(default)]
    pub summoner_name: String,
    /// Filled for accounts migrated to Riot IDs; `summonerName` may then be empty.
    #[serde(default)]
    pub riot_id_game_name: Option<String>,
    pub win: bool,
    pub kills: u32,
    pub deaths: u32,
    pub assists: u32,
}

impl Participant {
    pub fn display_name(&self) -> &str {
        match self.riot_id_game_name.as_deref() {
            Some(name) if !name.is_empty() => name,
            _ => &self.summoner_name,
        }
    }
}

// ====================================================================
// Notification payload
// ====================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Win,
    Loss,
}

impl Outcome {
    pub fn from_win_flag(win: bool) -> Self {
        if win { Outcome::Win } else { Outcome::Loss }
    }

    pub fn is_win(self) -> bool {
        self == Outcome::Win
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Kda {
    pub kills: u32,
    pub deaths: u32,
    pub assists: u32,
}

impl fmt::Display for Kda {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.kills, self.deaths, self.assists)
    }
}

/// What a sink receives for one newly detected match.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationPayload {
    pub player_key: PlayerKey,
    pub match_id: MatchId,
    pub player_name: String,
    pub unit_played: String,
    pub outcome: Outcome,
    pub stats: Kda,
    pub mode: String,
    pub image_ref: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    const PARTICIPANT_JSON: &str = r#"{
        "puuid": "abc",
        "championName": "Ahri",
        "summonerName": "",
        "riotIdGameName": "Faker",
        "win": true,
        "kills": 10,
        "deaths": 2,
        "assists": 7,
        "goldEarned": 14000
    }"#;

    #[test]
    fn participant_prefers_riot_id_name() {
        let p: Participant = serde_json::from_str(PARTICIPANT_JSON).unwrap();
        assert_eq!(p.display_name(), "Faker");
        assert_eq!(p.champion_name, "Ahri");
    }

    #[test]
    fn participant_falls_back_to_summoner_name() {
        let p: Participant = serde_json::from_str(
            r#"{"puuid":"x","championName":"Jinx","summonerName":"Old Name","win":false,"kills":1,"deaths":5,"assists":3}"#,
        )
        .unwrap();
        assert_eq!(p.display_name(), "Old Name");
    }

    #[test]
    fn kda_formats_as_slash_triplet() {
        let kda = Kda { kills: 3, deaths: 0, assists: 12 };
        assert_eq!(kda.to_string(), "3/0/12");
        assert_eq!(RiotHandle::new("Faker", "KR1").to_string(), "Faker#KR1");
    }
}
