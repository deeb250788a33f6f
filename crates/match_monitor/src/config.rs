//! Operator-facing knobs: poll interval, cache TTL, retry budget.

use std::str::FromStr;
use std::time::Duration;

use crate::error::ConfigError;

pub const MIN_POLL_INTERVAL_SECS: u64 = 10;
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 60;
pub const DEFAULT_CACHE_TTL_MINS: u64 = 10;
pub const DEFAULT_RETRY_ATTEMPTS: u32 = 3;
pub const DEFAULT_RETRY_DELAY_SECS: u64 = 2;
/// Ids requested per player and cycle; only the newest one is evaluated.
pub const DEFAULT_RECENT_COUNT: u32 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_RETRY_ATTEMPTS,
            delay: Duration::from_secs(DEFAULT_RETRY_DELAY_SECS),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonitorConfig {
    pub poll_interval: Duration,
    pub cache_ttl: Duration,
    pub retry: RetryPolicy,
    pub recent_count: u32,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(DEFAULT_POLL_INTERVAL_SECS),
            cache_ttl: Duration::from_secs(DEFAULT_CACHE_TTL_MINS * 60),
            retry: RetryPolicy::default(),
            recent_count: DEFAULT_RECENT_COUNT,
        }
    }
}

/// Enforces the 10 s floor.
pub fn validate_poll_interval(secs: u64) -> Result<Duration, ConfigError> {
    if secs < MIN_POLL_INTERVAL_SECS {
        return Err(ConfigError::IntervalBelowFloor(secs));
    }
    Ok(Duration::from_secs(secs))
}

impl MonitorConfig {
    pub fn with_poll_interval_secs(mut self, secs: u64) -> Result<Self, ConfigError> {
        self.poll_interval = validate_poll_interval(secs)?;
        Ok(self)
    }

    pub fn with_cache_ttl_mins(mut self, mins: u64) -> Result<Self, ConfigError> {
        if mins == 0 {
            return Err(ConfigError::Zero("cache TTL"));
        }
        self.cache_ttl = Duration::from_secs(mins * 60);
        Ok(self)
    }

    pub fn with_retry(mut self, max_attempts: u32, delay: Duration) -> Result<Self, ConfigError> {
        if max_attempts == 0 {
            return Err(ConfigError::Zero("retry attempts"));
        }
        self.retry = RetryPolicy { max_attempts, delay };
        Ok(self)
    }

    /// Reads `MATCHWATCH_*` variables from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut cfg = Self::default();

        if let Some(secs) = parse_var::<u64>(&lookup, "MATCHWATCH_POLL_INTERVAL_SECS")? {
            cfg = cfg.with_poll_interval_secs(secs)?;
        }
        if let Some(mins) = parse_var::<u64>(&lookup, "MATCHWATCH_CACHE_TTL_MINS")? {
            cfg = cfg.with_cache_ttl_mins(mins)?;
        }

        let attempts = parse_var::<u32>(&lookup, "MATCHWATCH_RETRY_ATTEMPTS")?
            .unwrap_or(cfg.retry.max_attempts);
        let delay = parse_var::<u64>(&lookup, "MATCHWATCH_RETRY_DELAY_SECS")?
            .map(Duration::from_secs)
            .unwrap_or(cfg.retry.delay);
        cfg = cfg.with_retry(attempts, delay)?;

        if let Some(count) = parse_var::<u32>(&lookup, "MATCHWATCH_RECENT_COUNT")? {
            if count == 0 {
                return Err(ConfigError::Zero("recent match count"));
            }
            cfg.recent_count = count;
        }

        Ok(cfg)
    }
}

pub fn parse_var<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    var: &str,
) -> Result<Option<T>, ConfigError> {
    match lookup(var) {
        None => Ok(None),
        Some(raw) if raw.trim().is_empty() => Ok(None),
        Some(raw) => raw.trim().parse::<T>().map(Some).map_err(|_| ConfigError::Invalid {
            var: var.to_string(),
            value: raw,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn defaults_when_nothing_is_set() {
        let cfg = MonitorConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(cfg.poll_interval, Duration::from_secs(60));
        assert_eq!(cfg.cache_ttl, Duration::from_secs(600));
        assert_eq!(cfg.retry, RetryPolicy { max_attempts: 3, delay: Duration::from_secs(2) });
        assert_eq!(cfg.recent_count, 2);
    }

    #[test]
    fn interval_floor_is_ten_seconds() {
        assert_eq!(validate_poll_interval(5), Err(ConfigError::IntervalBelowFloor(5)));
        assert_eq!(validate_poll_interval(10), Ok(Duration::from_secs(10)));
    }

    #[test]
    fn rejected_interval_keeps_previous_config() {
        let cfg = MonitorConfig::default().with_poll_interval_secs(30).unwrap();
        let err = cfg.clone().with_poll_interval_secs(9).unwrap_err();
        assert_eq!(err, ConfigError::IntervalBelowFloor(9));
        assert_eq!(cfg.poll_interval, Duration::from_secs(30));
    }

    #[test]
    fn env_overrides_are_parsed() {
        let cfg = MonitorConfig::from_lookup(lookup(&[
            ("MATCHWATCH_POLL_INTERVAL_SECS", "15"),
            ("MATCHWATCH_CACHE_TTL_MINS", "3"),
            ("MATCHWATCH_RETRY_ATTEMPTS", "5"),
            ("MATCHWATCH_RETRY_DELAY_SECS", "1"),
        ]))
        .unwrap();
        assert_eq!(cfg.poll_interval, Duration::from_secs(15));
        assert_eq!(cfg.cache_ttl, Duration::from_secs(180));
        assert_eq!(cfg.retry.max_attempts, 5);
        assert_eq!(cfg.retry.delay, Duration::from_secs(1));
    }

    #[test]
    fn garbage_values_are_config_errors() {
        let err = MonitorConfig::from_lookup(lookup(&[("MATCHWATCH_CACHE_TTL_MINS", "ten")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { ref var, .. } if var == "MATCHWATCH_CACHE_TTL_MINS"));

        let err = MonitorConfig::from_lookup(lookup(&[("MATCHWATCH_RETRY_ATTEMPTS", "0")]))
            .unwrap_err();
        assert_eq!(err, ConfigError::Zero("retry attempts"));

        let err = MonitorConfig::from_lookup(lookup(&[("MATCHWATCH_POLL_INTERVAL_SECS", "5")]))
            .unwrap_err();
        assert_eq!(err, ConfigError::IntervalBelowFloor(5));
    }
}
