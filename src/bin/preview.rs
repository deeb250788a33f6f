//! Render the latest match of a registered account and push it through the
//! configured sinks, without touching any dedup state.
//!
//! Spuštění:
//!   cargo run --bin matchwatch-preview -- Faker KR1
//!   cargo run --bin matchwatch-preview -- Faker KR1 --dry-run

use anyhow::{bail, Context, Result};
use clap::Parser;
use dotenv::dotenv;
use match_monitor::{MatchInfoExtractor, MonitorConfig, NotificationSink, RetryingFetcher, RiotHandle};
use matchwatch::{sinks, JsonFileRegistry, DEFAULT_REGISTRY_PATH};
use riot_client::{DataDragon, RiotClient, RiotConfig};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt};

#[derive(Parser, Debug)]
#[command(name = "matchwatch-preview", about = "Send a test notification for a registered account's latest match")]
struct Args {
    game_name: String,
    tag_line: String,
    /// Print the payload and embed instead of delivering
    #[arg(long)]
    dry_run: bool,
    #[arg(long, env = "MATCHWATCH_REGISTRY_PATH", default_value = DEFAULT_REGISTRY_PATH)]
    registry: PathBuf,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();
    fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();
    let handle = RiotHandle::new(args.game_name.trim(), args.tag_line.trim_start_matches('#').trim());

    let Some(entry) = JsonFileRegistry::new(&args.registry).find_by_handle(&handle).await? else {
        bail!("{handle} is not registered (use matchwatch-register first)");
    };

    let config = MonitorConfig::from_env()?;
    let fetcher = RetryingFetcher::new(
        Arc::new(RiotClient::new(&RiotConfig::from_env()?)?),
        config.retry,
    );

    let ids = fetcher
        .list_recent_matches(&entry.player_key, 1)
        .await
        .with_context(|| format!("listing matches of {handle}"))?;
    let Some(latest) = ids.into_iter().next() else {
        bail!("no recent matches for {handle}");
    };

    let detail = fetcher
        .fetch_match_detail(&latest)
        .await
        .with_context(|| format!("fetching match {latest}"))?;
    let payload = MatchInfoExtractor::new(Arc::new(DataDragon::new()?))
        .extract(&detail, &entry.player_key)
        .await?;

    if args.dry_run {
        println!("{}", serde_json::to_string_pretty(&payload)?);
        println!("{}", serde_json::to_string_pretty(&sinks::discord_embed(&payload))?);
        return Ok(());
    }

    sinks::sinks_from_env()?.deliver(&payload).await?;
    info!("preview of {latest} delivered for {handle}");
    Ok(())
}
