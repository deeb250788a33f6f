/// matchwatch: Match Watcher
///
/// Co dělá:
///   1. Každých N sekund (default 60, minimum 10) projde registrované účty
///   2. Pro každý účet stáhne poslední zápas (Riot match-v5) s retry
///   3. Nový zápas → právě jedna notifikace (Discord webhook / ntfy / log)
///   4. Výpadek API = tichý skip hráče v tomto cyklu, nikdy pád smyčky
///
/// Ovládání za běhu (stdin):
///   interval <secs>   změní interval od příštího spánku
///   quit              dokončí běžící cyklus a skončí
///
/// Spuštění:
///   cargo run --bin match-watch

use anyhow::{Context, Result};
use dotenv::dotenv;
use logger::EventLogger;
use match_monitor::{MonitorConfig, PollingScheduler, SchedulerHandle};
use matchwatch::{registry_path_from_env, sinks::sinks_from_env, JsonFileRegistry};
use riot_client::{DataDragon, RiotClient, RiotConfig};
use std::env;
use std::fs::File;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, fmt};

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();

    fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info"))
        )
        .init();

    info!("=== matchwatch: LoL match notifier ===");

    // Single instance lock
    let lock_file_path = env::temp_dir().join("matchwatch.lock");
    let lock_file = match File::create(&lock_file_path) {
        Ok(f) => f,
        Err(e) => {
            warn!("Failed to create lock file at {:?}: {}", lock_file_path, e);
            return Ok(());
        }
    };

    let mut lock = fd_lock::RwLock::new(lock_file);
    let _write_guard = match lock.try_write() {
        Ok(guard) => {
            info!("Acquired single-instance lock.");
            guard
        }
        Err(_) => {
            warn!("Another instance of match-watch is already running! Exiting.");
            return Ok(());
        }
    };

    let config = MonitorConfig::from_env().context("invalid MATCHWATCH_* configuration")?;
    let riot_cfg = RiotConfig::from_env()?;
    let registry_path = registry_path_from_env();
    let log_dir = env::var("MATCHWATCH_LOG_DIR").unwrap_or_else(|_| "logs".to_string());

    info!(
        "Poll interval: {}s | cache TTL: {}min | retry: {}x / {}s | region: {}",
        config.poll_interval.as_secs(),
        config.cache_ttl.as_secs() / 60,
        config.retry.max_attempts,
        config.retry.delay.as_secs(),
        riot_cfg.region,
    );
    info!("Registry: {registry_path} | Logs: ./{log_dir}/");

    let scheduler = PollingScheduler::new(
        &config,
        Arc::new(RiotClient::new(&riot_cfg)?),
        Arc::new(DataDragon::new()?),
        Arc::new(JsonFileRegistry::new(&registry_path)),
        sinks_from_env()?,
    )
    .with_event_logger(EventLogger::new(&log_dir));

    let handle = scheduler.handle();
    tokio::spawn(shutdown_on_ctrl_c(handle.clone()));
    tokio::spawn(operator_console(handle));

    scheduler.run().await;
    info!("Bye.");
    Ok(())
}

async fn shutdown_on_ctrl_c(handle: SchedulerHandle) {
    if tokio::signal::ctrl_c().await.is_ok() {
        info!("Ctrl-C: finishing current cycle, then stopping");
        handle.shutdown();
    }
}

async fn operator_console(handle: SchedulerHandle) {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Ok(Some(line)) = lines.next_line().await {
        let mut parts = line.split_whitespace();
        match (parts.next(), parts.next()) {
            (Some("interval"), Some(raw)) => match raw.parse::<u64>() {
                Ok(secs) => {
                    if let Err(e) = handle.set_interval_secs(secs) {
                        warn!("interval not changed: {e}");
                    }
                }
                Err(_) => warn!("interval expects whole seconds, got {raw:?}"),
            },
            (Some("interval"), None) => {
                info!("current interval: {}s", handle.interval().as_secs());
            }
            (Some("quit"), _) | (Some("exit"), _) => {
                handle.shutdown();
                break;
            }
            (None, _) => {}
            (Some(other), _) => warn!("unknown command {other:?} (try: interval <secs> | quit)"),
        }
    }
}
