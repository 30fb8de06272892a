//! Timer trigger
//!
//! Fires the pipeline at wall-clock multiples of the configured interval
//! (hh:00 and hh:30 UTC for the default 30 minutes). Boundaries that pass
//! while a run is still in progress are skipped, not queued.

use crate::config::ScheduleConfig;
use blobsync_core::{SyncPipeline, Trigger};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

/// Next boundary strictly after `now`.
pub fn next_fire_after(now: DateTime<Utc>, period: Duration) -> DateTime<Utc> {
    let period_ms = (period.as_millis() as i64).max(1);
    let next_ms = (now.timestamp_millis().div_euclid(period_ms) + 1) * period_ms;
    DateTime::from_timestamp_millis(next_ms).unwrap_or(now)
}

/// Periodic entry point into the pipeline.
pub struct TimerTrigger {
    config: ScheduleConfig,
    pipeline: Arc<SyncPipeline>,
}

impl TimerTrigger {
    pub fn new(config: ScheduleConfig, pipeline: Arc<SyncPipeline>) -> Self {
        Self { config, pipeline }
    }

    /// Run until `shutdown` flips to `true` or its sender is dropped.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        let period = self.config.interval();
        tracing::info!(interval_secs = period.as_secs(), "Timer trigger started");

        if self.config.run_on_startup {
            self.pipeline.run(Trigger::Timer).await;
        }

        let mut last_fire: Option<DateTime<Utc>> = None;
        loop {
            if *shutdown.borrow() {
                break;
            }

            let now = Utc::now();
            // Never fire the same boundary twice if the clock lags the sleep.
            let from = last_fire.map_or(now, |last| last.max(now));
            let next = next_fire_after(from, period);
            let wait = (next - now).to_std().unwrap_or_default();
            tracing::debug!(next_run = %next, "Timer armed");

            tokio::select! {
                _ = tokio::time::sleep(wait) => {
                    last_fire = Some(next);
                    self.pipeline.run(Trigger::Timer).await;
                }
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
            }
        }

        tracing::info!("Timer trigger stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use blobsync_core::{
        DocumentFetcher, FileSource, InMemoryUserTable, RecordingNotifier, Reconciler,
    };
    use chrono::TimeZone;
    use std::io::Write;

    #[test]
    fn fires_on_half_hour_boundaries() {
        let period = Duration::from_secs(1800);

        let now = Utc.with_ymd_and_hms(2024, 5, 1, 10, 7, 13).unwrap();
        assert_eq!(
            next_fire_after(now, period),
            Utc.with_ymd_and_hms(2024, 5, 1, 10, 30, 0).unwrap()
        );

        let now = Utc.with_ymd_and_hms(2024, 5, 1, 10, 45, 0).unwrap();
        assert_eq!(
            next_fire_after(now, period),
            Utc.with_ymd_and_hms(2024, 5, 1, 11, 0, 0).unwrap()
        );
    }

    #[test]
    fn boundary_itself_moves_to_the_next_one() {
        let period = Duration::from_secs(1800);
        let boundary = Utc.with_ymd_and_hms(2024, 5, 1, 23, 30, 0).unwrap();
        assert_eq!(
            next_fire_after(boundary, period),
            Utc.with_ymd_and_hms(2024, 5, 2, 0, 0, 0).unwrap()
        );
    }

    #[tokio::test]
    async fn runs_on_startup_then_stops_on_shutdown() {
        let mut doc = tempfile::NamedTempFile::new().unwrap();
        doc.write_all(br#"[{"id":1,"name":"Ann","age":30}]"#).unwrap();

        let table = Arc::new(InMemoryUserTable::new());
        let notifier = Arc::new(RecordingNotifier::new());
        let pipeline = Arc::new(SyncPipeline::new(
            DocumentFetcher::new(Arc::new(FileSource::new(doc.path())), notifier.clone()),
            Reconciler::new(table.clone(), notifier),
        ));

        let config = ScheduleConfig {
            enabled: true,
            interval_secs: 24 * 60 * 60,
            run_on_startup: true,
        };
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let handle = tokio::spawn(TimerTrigger::new(config, pipeline).run(shutdown_rx));

        for _ in 0..100 {
            if !table.snapshot().await.is_empty() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert_eq!(table.snapshot().await.len(), 1);

        shutdown_tx.send(true).unwrap();
        tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .unwrap()
            .unwrap();
    }
}
