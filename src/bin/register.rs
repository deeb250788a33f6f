//! Add (or remove) a watched account by Riot ID.
//!
//! Spuštění:
//!   cargo run --bin matchwatch-register -- Faker KR1
//!   cargo run --bin matchwatch-register -- Faker KR1 --remove

use anyhow::{bail, Result};
use clap::Parser;
use dotenv::dotenv;
use match_monitor::{FetchError, MonitorConfig, RetryingFetcher, RiotHandle, WatchEntry};
use matchwatch::{JsonFileRegistry, DEFAULT_REGISTRY_PATH};
use riot_client::{RiotClient, RiotConfig};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt};

#[derive(Parser, Debug)]
#[command(name = "matchwatch-register", about = "Register a Riot account for match notifications")]
struct Args {
    /// Game name part of the Riot ID (before `#`)
    game_name: String,
    /// Tag line part of the Riot ID (after `#`)
    tag_line: String,
    /// Stop watching the account instead of adding it
    #[arg(long)]
    remove: bool,
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
    let registry = JsonFileRegistry::new(&args.registry);

    if args.remove {
        match registry.remove_by_handle(&handle).await? {
            Some(key) => info!("{handle} ({key}) is no longer watched"),
            None => info!("{handle} was not registered"),
        }
        return Ok(());
    }

    let config = MonitorConfig::from_env()?;
    let client = RiotClient::new(&RiotConfig::from_env()?)?;
    let fetcher = RetryingFetcher::new(Arc::new(client), config.retry);

    let player_key = match fetcher.resolve_identity(&handle).await {
        Ok(key) => key,
        Err(FetchError::NotFound) => {
            bail!("Riot ID {handle} not found, check the name and tag line")
        }
        Err(e) => bail!("could not resolve {handle}: {e}"),
    };

    let entry = WatchEntry { player_key, handle };
    if registry.register(&entry).await? {
        info!("✅ {} registered, notifications start with the next finished match", entry.handle);
    } else {
        info!("{} was already registered, entry refreshed", entry.handle);
    }
    Ok(())
}
