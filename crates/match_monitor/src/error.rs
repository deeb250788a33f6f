use thiserror::Error;

use crate::types::PlayerKey;

/// Outcome taxonomy of one upstream read.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    /// Definitive 404. Never retried.
    #[error("not found")]
    NotFound,

    /// Network failure, 5xx, rate limit or any other non-200 answer.
    #[error("transient upstream error: {0}")]
    Transient(String),

    /// The answer arrived but cannot be used (undecodable body, bad shape).
    #[error("permanent upstream error: {0}")]
    Permanent(String),
}

impl FetchError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, FetchError::Transient(_))
    }
}

/// Rejected operator input. The previous configuration stays in effect.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("poll interval {0}s is below the {floor}s floor", floor = crate::config::MIN_POLL_INTERVAL_SECS)]
    IntervalBelowFloor(u64),

    #[error("{0} must be greater than zero")]
    Zero(&'static str),

    #[error("invalid value {value:?} for {var}")]
    Invalid { var: String, value: String },

    #[error("missing required variable {0}")]
    Missing(&'static str),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExtractError {
    /// Upstream inconsistency: the match does not list the watched player.
    #[error("player {0} not found among match participants")]
    PlayerNotInMatch(PlayerKey),
}
