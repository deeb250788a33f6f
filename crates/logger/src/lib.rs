/// matchwatch: Logger
/// JSONL event stream, NTFY alerts

use anyhow::{Context, Result};
use chrono::Utc;
use serde::Serialize;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone)]
pub struct EventLogger {
    log_dir: PathBuf,
}

impl EventLogger {
    pub fn new(log_dir: impl Into<PathBuf>) -> Self {
        let dir = log_dir.into();
        fs::create_dir_all(&dir).ok();
        Self { log_dir: dir }
    }

    pub fn log_dir(&self) -> &Path {
        &self.log_dir
    }

    /// Appends one JSON line to today's `{date}.jsonl`.
    pub fn log<T: Serialize>(&self, event: &T) -> Result<()> {
        let date  = Utc::now().format("%Y-%m-%d").to_string();
        let path  = self.log_dir.join(format!("{date}.jsonl"));
        let line  = serde_json::to_string(event)?;
        let mut f = OpenOptions::new().create(true).append(true).open(&path)?;
        writeln!(f, "{line}")?;
        Ok(())
    }
}

pub fn now_iso() -> String {
    Utc::now().to_rfc3339()
}

// ── Event typy ────────────────────────────────────────────────────────────────

#[derive(Serialize, Debug)]
pub struct MatchNotifiedEvent {
    pub ts:          String,
    pub event:       &'static str,   // "MATCH_NOTIFIED"
    pub player_key:  String,
    pub player_name: String,
    pub match_id:    String,
    pub champion:    String,
    pub win:         bool,
    pub kda:         String,
    pub game_mode:   String,
}

#[derive(Serialize, Debug)]
pub struct ApiStatusEvent {
    pub ts:         String,
    pub event:      &'static str,    // "API_STATUS"
    pub source:     String,          // "list_recent_matches" | "fetch_match_detail" | "deliver" ...
    pub scope:      String,          // player key
    pub ok:         bool,
    pub message:    String,
}

#[derive(Serialize, Debug)]
pub struct CycleHeartbeatEvent {
    pub ts:                 String,
    pub event:              &'static str,   // "CYCLE_HEARTBEAT"
    pub cycle:              u64,
    pub poll_interval_secs: u64,
    pub players:            usize,
    pub notified:           usize,
    pub up_to_date:         usize,
    pub skipped:            usize,
}

/// Pošli čitelný push alert na ntfy topic
pub async fn send_ntfy_alert(
    client: &reqwest::Client,
    topic_url: &str,
    title: &str,
    msg: &str,
    tags: &str,
) -> Result<()> {
    let resp = client
        .post(topic_url)
        .header("Title", title)
        .header("Priority", "high")
        .header("Tags", tags)
        .body(msg.to_string())
        .send()
        .await
        .context("NTFY request failed")?;

    let status = resp.status();
    if !status.is_success() {
        let body = resp.text().await.unwrap_or_default();
        let snippet: String = body.chars().take(200).collect();
        anyhow::bail!("NTFY HTTP {status}: {snippet}");
    }
    tracing::info!("NTFY sent: {}", title);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_appends_one_json_line_per_event() {
        let dir = tempfile::tempdir().unwrap();
        let logger = EventLogger::new(dir.path().join("logs"));

        for cycle in 1..=2 {
            logger
                .log(&CycleHeartbeatEvent {
                    ts: now_iso(),
                    event: "CYCLE_HEARTBEAT",
                    cycle,
                    poll_interval_secs: 60,
                    players: 3,
                    notified: 1,
                    up_to_date: 1,
                    skipped: 1,
                })
                .unwrap();
        }

        let date = Utc::now().format("%Y-%m-%d").to_string();
        let raw = fs::read_to_string(logger.log_dir().join(format!("{date}.jsonl"))).unwrap();
        let lines: Vec<serde_json::Value> = raw
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();

        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0]["event"], "CYCLE_HEARTBEAT");
        assert_eq!(lines[1]["cycle"], 2);
    }
}
