//! One sync run: fetch, then reconcile.

use crate::fetch::DocumentFetcher;
use crate::reconcile::{ReconcileReport, Reconciler};
use crate::record::duplicate_ids;
use chrono::Utc;
use serde::Serialize;
use tracing::Instrument;
use uuid::Uuid;

/// What caused a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Trigger {
    /// Wall-clock schedule.
    Timer,
    /// External event notification.
    Event,
    /// Operator-initiated single run.
    Manual,
}

impl std::fmt::Display for Trigger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Trigger::Timer => write!(f, "timer"),
            Trigger::Event => write!(f, "event"),
            Trigger::Manual => write!(f, "manual"),
        }
    }
}

/// How a run ended. Only for logs and tests; triggers report nothing outward.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum RunOutcome {
    /// Fetch failed; reconciliation was skipped.
    NoData,
    /// The batch was committed.
    Applied(ReconcileReport),
    /// Reconciliation failed; nothing was committed.
    Failed,
}

/// Stateless fetch-then-reconcile sequence shared by every trigger.
///
/// Runs are not coordinated with each other. Overlapping runs rely on the
/// per-key upsert being idempotent.
#[derive(Clone)]
pub struct SyncPipeline {
    fetcher: DocumentFetcher,
    reconciler: Reconciler,
}

impl SyncPipeline {
    pub fn new(fetcher: DocumentFetcher, reconciler: Reconciler) -> Self {
        Self {
            fetcher,
            reconciler,
        }
    }

    pub async fn run(&self, trigger: Trigger) -> RunOutcome {
        let run_id = Uuid::new_v4();
        let span = tracing::info_span!("sync_run", %trigger, %run_id);
        self.run_inner(trigger).instrument(span).await
    }

    async fn run_inner(&self, trigger: Trigger) -> RunOutcome {
        tracing::info!(%trigger, started_at = %Utc::now().to_rfc3339(), "Sync triggered");

        let Some(records) = self.fetcher.fetch().await else {
            return RunOutcome::NoData;
        };

        let duplicates = duplicate_ids(&records);
        if !duplicates.is_empty() {
            tracing::warn!(
                ?duplicates,
                "Source document repeats ids; the surviving row per id is unspecified"
            );
        }

        let outcome = match self.reconciler.reconcile(&records).await {
            Some(report) => RunOutcome::Applied(report),
            None => RunOutcome::Failed,
        };
        tracing::info!(?outcome, "Sync finished");
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FetchError;
    use crate::fetch::DocumentSource;
    use crate::notify::RecordingNotifier;
    use crate::reconcile::InMemoryUserTable;
    use async_trait::async_trait;
    use bytes::Bytes;
    use std::sync::Arc;

    struct StaticSource(&'static [u8]);

    #[async_trait]
    impl DocumentSource for StaticSource {
        async fn fetch_bytes(&self) -> Result<Bytes, FetchError> {
            Ok(Bytes::from_static(self.0))
        }

        fn describe(&self) -> String {
            "static".to_string()
        }
    }

    fn pipeline(
        doc: &'static [u8],
        table: Arc<InMemoryUserTable>,
        notifier: Arc<RecordingNotifier>,
    ) -> SyncPipeline {
        SyncPipeline::new(
            DocumentFetcher::new(Arc::new(StaticSource(doc)), notifier.clone()),
            Reconciler::new(table, notifier),
        )
    }

    #[tokio::test]
    async fn malformed_document_never_reaches_the_table() {
        let table = Arc::new(InMemoryUserTable::missing());
        let notifier = Arc::new(RecordingNotifier::new());

        let outcome = pipeline(b"[{\"id\":", table, notifier.clone())
            .run(Trigger::Timer)
            .await;

        assert_eq!(outcome, RunOutcome::NoData);
        // A reconcile attempt against the missing table would add a second message.
        assert_eq!(notifier.messages().await.len(), 1);
    }

    #[tokio::test]
    async fn applies_document() {
        let table = Arc::new(InMemoryUserTable::new());
        let notifier = Arc::new(RecordingNotifier::new());

        let outcome = pipeline(
            br#"[{"id":1,"name":"Ann","age":30}]"#,
            table.clone(),
            notifier.clone(),
        )
        .run(Trigger::Event)
        .await;

        assert!(matches!(outcome, RunOutcome::Applied(ref r) if r.rows_applied == 1));
        assert_eq!(table.snapshot().await.len(), 1);
        assert!(notifier.messages().await.is_empty());
    }

    #[tokio::test]
    async fn reconcile_failure_is_reported() {
        let table = Arc::new(InMemoryUserTable::missing());
        let notifier = Arc::new(RecordingNotifier::new());

        let outcome = pipeline(
            br#"[{"id":1,"name":"Ann","age":30}]"#,
            table,
            notifier.clone(),
        )
        .run(Trigger::Manual)
        .await;

        assert_eq!(outcome, RunOutcome::Failed);
        assert_eq!(notifier.messages().await.len(), 1);
    }

    #[test]
    fn trigger_display() {
        assert_eq!(Trigger::Timer.to_string(), "timer");
        assert_eq!(Trigger::Event.to_string(), "event");
    }
}
