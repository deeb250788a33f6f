//! Notification transports: Discord webhook embed, ntfy push, log line.

use anyhow::{Context, Result};
use async_trait::async_trait;
use match_monitor::{FanoutSink, NotificationPayload, NotificationSink, Outcome};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

const COLOR_WIN: u32 = 0x3498db;
const COLOR_LOSS: u32 = 0xe74c3c;

pub fn render_title(p: &NotificationPayload) -> String {
    match p.outcome {
        Outcome::Win => format!("{} won as {}", p.player_name, p.unit_played),
        Outcome::Loss => format!("{} lost as {}", p.player_name, p.unit_played),
    }
}

pub fn render_body(p: &NotificationPayload) -> String {
    format!("KDA: {}\nMode: {}\nMatch: {}", p.stats, p.mode, p.match_id)
}

/// Discord embed: blue on a win, red on a loss, champion portrait as image.
pub fn discord_embed(p: &NotificationPayload) -> serde_json::Value {
    let (color, result) = match p.outcome {
        Outcome::Win => (COLOR_WIN, "Victory"),
        Outcome::Loss => (COLOR_LOSS, "Defeat"),
    };
    json!({
        "embeds": [{
            "title": render_title(p),
            "color": color,
            "fields": [{
                "name": format!("Result: {result}"),
                "value": format!("KDA: {}\n{}", p.stats, p.mode),
                "inline": false,
            }],
            "image": { "url": p.image_ref },
            "footer": { "text": p.match_id.to_string() },
        }]
    })
}

pub struct DiscordWebhookSink {
    client: reqwest::Client,
    webhook_url: String,
}

impl DiscordWebhookSink {
    pub fn new(client: reqwest::Client, webhook_url: impl Into<String>) -> Self {
        Self { client, webhook_url: webhook_url.into() }
    }
}

#[async_trait]
impl NotificationSink for DiscordWebhookSink {
    async fn deliver(&self, payload: &NotificationPayload) -> Result<()> {
        let resp = self
            .client
            .post(&self.webhook_url)
            .json(&discord_embed(payload))
            .send()
            .await
            .context("Discord webhook request failed")?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            let snippet: String = body.chars().take(200).collect();
            warn!("Discord webhook failed: {status} {snippet}");
            anyhow::bail!("Discord webhook HTTP {status}");
        }
        Ok(())
    }
}

pub struct NtfySink {
    client: reqwest::Client,
    topic_url: String,
}

impl NtfySink {
    /// `topic` is either a bare topic name on ntfy.sh or a full URL.
    pub fn new(client: reqwest::Client, topic: &str) -> Self {
        let topic_url = if topic.starts_with("http://") || topic.starts_with("https://") {
            topic.to_string()
        } else {
            format!("https://ntfy.sh/{topic}")
        };
        Self { client, topic_url }
    }

    pub fn topic_url(&self) -> &str {
        &self.topic_url
    }
}

#[async_trait]
impl NotificationSink for NtfySink {
    async fn deliver(&self, payload: &NotificationPayload) -> Result<()> {
        let tags = if payload.outcome.is_win() { "trophy" } else { "skull" };
        logger::send_ntfy_alert(
            &self.client,
            &self.topic_url,
            &render_title(payload),
            &render_body(payload),
            tags,
        )
        .await
    }
}

/// Always succeeds; keeps a trace of every hand-off in the process log.
pub struct LogSink;

#[async_trait]
impl NotificationSink for LogSink {
    async fn deliver(&self, payload: &NotificationPayload) -> Result<()> {
        info!("🔔 {} | {}", render_title(payload), render_body(payload).replace('\n', " | "));
        Ok(())
    }
}

/// `DISCORD_WEBHOOK_URL` and `NTFY_TOPIC` switch the remote transports on.
pub fn sinks_from_env() -> Result<Arc<dyn NotificationSink>> {
    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(10))
        .build()
        .context("failed to build reqwest client")?;

    let mut fanout = FanoutSink::new().with("log", Arc::new(LogSink));

    if let Some(url) = env_non_empty("DISCORD_WEBHOOK_URL") {
        fanout = fanout.with("discord", Arc::new(DiscordWebhookSink::new(client.clone(), url)));
    }
    if let Some(topic) = env_non_empty("NTFY_TOPIC") {
        let sink = NtfySink::new(client.clone(), &topic);
        info!("ntfy notifications → {}", sink.topic_url());
        fanout = fanout.with("ntfy", Arc::new(sink));
    }
    if fanout.len() == 1 {
        warn!("no DISCORD_WEBHOOK_URL / NTFY_TOPIC set, notifications only go to the log");
    }
    Ok(Arc::new(fanout))
}

fn env_non_empty(var: &str) -> Option<String> {
    std::env::var(var).ok().filter(|v| !v.trim().is_empty())
}
