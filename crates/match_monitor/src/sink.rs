//! Hand-off point for newly detected matches.

use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::warn;

use crate::types::NotificationPayload;

/// Renders and delivers a payload. `Ok` means the hand-off succeeded and
/// the match will be recorded as notified; `Err` means it is retried next cycle.
#[async_trait]
pub trait NotificationSink: Send + Sync {
    async fn deliver(&self, payload: &NotificationPayload) -> Result<()>;
}

#[async_trait]
impl<T: NotificationSink + ?Sized> NotificationSink for Arc<T> {
    async fn deliver(&self, payload: &NotificationPayload) -> Result<()> {
        (**self).deliver(payload).await
    }
}

/// Delivers to every inner sink; fails if any of them failed.
///
/// A partial failure re-delivers to all sinks on the next cycle.
#[derive(Default)]
pub struct FanoutSink {
    sinks: Vec<(String, Arc<dyn NotificationSink>)>,
}

impl FanoutSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: impl Into<String>, sink: Arc<dyn NotificationSink>) -> Self {
        self.sinks.push((name.into(), sink));
        self
    }

    pub fn len(&self) -> usize {
        self.sinks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }
}

#[async_trait]
impl NotificationSink for FanoutSink {
    async fn deliver(&self, payload: &NotificationPayload) -> Result<()> {
        let mut failed = Vec::new();
        for (name, sink) in &self.sinks {
            if let Err(e) = sink.deliver(payload).await {
                warn!("sink {name} failed for {}: {e:#}", payload.match_id);
                failed.push(name.as_str());
            }
        }
        if !failed.is_empty() {
            anyhow::bail!("delivery failed on: {}", failed.join(", "));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Kda, MatchId, Outcome, PlayerKey};
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recording {
        seen: Mutex<Vec<MatchId>>,
        fail: bool,
    }

    #[async_trait]
    impl NotificationSink for Recording {
        async fn deliver(&self, payload: &NotificationPayload) -> Result<()> {
            self.seen.lock().unwrap().push(payload.match_id.clone());
            if self.fail {
                anyhow::bail!("boom");
            }
            Ok(())
        }
    }

    fn payload() -> NotificationPayload {
        NotificationPayload {
            player_key: PlayerKey::new("p"),
            match_id: MatchId::new("M1"),
            player_name: "P".into(),
            unit_played: "Ashe".into(),
            outcome: Outcome::Loss,
            stats: Kda { kills: 0, deaths: 1, assists: 0 },
            mode: "CLASSIC".into(),
            image_ref: String::new(),
        }
    }

    #[tokio::test]
    async fn fanout_reaches_all_sinks_and_reports_failures() {
        let ok = Arc::new(Recording::default());
        let bad = Arc::new(Recording { fail: true, ..Default::default() });
        let fanout = FanoutSink::new()
            .with("ok", ok.clone())
            .with("bad", bad.clone());

        let err = fanout.deliver(&payload()).await.unwrap_err();
        assert!(err.to_string().contains("bad"));
        assert_eq!(ok.seen.lock().unwrap().len(), 1);
        assert_eq!(bad.seen.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn empty_fanout_accepts() {
        assert!(FanoutSink::new().deliver(&payload()).await.is_ok());
    }
}
