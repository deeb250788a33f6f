/// matchwatch: Match Monitor
///
/// Hlídá sledované účty a pro každý nově dohraný zápas vydá právě jednu notifikaci.
/// - RetryingFetcher: tři upstream čtení s omezeným retry
/// - DedupCache: poslední notifikovaný zápas per hráč + krátká TTL cache
/// - MatchInfoExtractor: detail zápasu → NotificationPayload
/// - PollingScheduler: periodický cyklus přes všechny hráče, chyby izolované per hráč

pub mod config;
pub mod dedup;
pub mod error;
pub mod extractor;
pub mod fetcher;
pub mod registry;
pub mod scheduler;
pub mod sink;
pub mod types;

pub use config::{MonitorConfig, RetryPolicy, MIN_POLL_INTERVAL_SECS};
pub use dedup::{DedupCache, PlayerGuard};
pub use error::{ConfigError, ExtractError, FetchError};
pub use extractor::{AssetVersions, FixedAssetVersion, MatchInfoExtractor, FALLBACK_ASSET_VERSION};
pub use fetcher::{retry, MatchSource, RetryingFetcher};
pub use registry::{AccountRegistry, MemoryRegistry};
pub use scheduler::{CycleReport, PlayerOutcome, PollingScheduler, SchedulerHandle, SchedulerState};
pub use sink::{FanoutSink, NotificationSink};
pub use types::{
    Kda, MatchDetail, MatchId, NotificationPayload, Outcome, Participant, PlayerKey, RiotHandle,
    WatchEntry,
};
