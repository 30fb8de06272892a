//! Builds the sync pipeline from configuration.

use crate::config::{DaemonConfig, DatabaseBackend, SourceKind};
use crate::error::{DaemonError, DaemonResult};
use blobsync_core::{
    AzureBlobSource, DocumentFetcher, DocumentSource, FileSource, InMemoryUserTable, Notifier,
    PostgresUserTable, Reconciler, SendGridNotifier, SqliteUserTable, SyncPipeline, UserTable,
};
use std::sync::Arc;
use std::time::Duration;

/// Wire source, destination and notifier into one shared pipeline.
pub async fn build_pipeline(config: &DaemonConfig) -> DaemonResult<SyncPipeline> {
    if !config.email.is_complete() {
        tracing::warn!("Email notification is not fully configured; failures will only be logged");
    }
    let notifier: Arc<dyn Notifier> = Arc::new(SendGridNotifier::new(config.email.settings())?);

    let source = build_source(config)?;
    let table = build_table(config).await?;
    tracing::info!(
        source = %source.describe(),
        backend = table.backend(),
        "Sync pipeline ready"
    );

    Ok(SyncPipeline::new(
        DocumentFetcher::new(source, notifier.clone()),
        Reconciler::new(table, notifier),
    ))
}

fn build_source(config: &DaemonConfig) -> DaemonResult<Arc<dyn DocumentSource>> {
    let source = &config.source;
    match source.kind {
        SourceKind::Azure => {
            let connection_string = source
                .connection_string
                .as_deref()
                .filter(|s| !s.trim().is_empty())
                .ok_or_else(|| {
                    DaemonError::Config(
                        "source.connection_string (AzureWebJobsStorage) is required".to_string(),
                    )
                })?;
            Ok(Arc::new(AzureBlobSource::from_connection_string(
                connection_string,
                source.container.clone(),
                source.blob_name.clone(),
                Duration::from_secs(source.request_timeout_secs),
            )?))
        }
        SourceKind::File => {
            let path = source.path.clone().ok_or_else(|| {
                DaemonError::Config("source.path is required for a file source".to_string())
            })?;
            Ok(Arc::new(FileSource::new(path)))
        }
    }
}

async fn build_table(config: &DaemonConfig) -> DaemonResult<Arc<dyn UserTable>> {
    let db = &config.database;
    match db.backend {
        DatabaseBackend::Memory => Ok(Arc::new(InMemoryUserTable::new())),
        DatabaseBackend::Sqlite => {
            let url = db.connection_url().map_err(DaemonError::Config)?;
            Ok(Arc::new(SqliteUserTable::connect(&url, db.max_connections).await?))
        }
        DatabaseBackend::Postgres => {
            let url = db.connection_url().map_err(DaemonError::Config)?;
            Ok(Arc::new(PostgresUserTable::connect_lazy(
                &url,
                db.max_connections,
                db.connect_timeout(),
            )?))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn azure_source_requires_connection_string() {
        let config = DaemonConfig::default();
        let err = build_pipeline(&config).await.err().unwrap();
        assert!(err.to_string().contains("AzureWebJobsStorage"));
    }

    #[tokio::test]
    async fn file_source_with_memory_table_builds() {
        let mut config = DaemonConfig::default();
        config.source.kind = SourceKind::File;
        config.source.path = Some("data.json".into());
        assert!(build_pipeline(&config).await.is_ok());
    }

    #[tokio::test]
    async fn postgres_backend_connects_lazily() {
        let mut config = DaemonConfig::default();
        config.source.connection_string = Some("UseDevelopmentStorage=true".to_string());
        config.database.backend = DatabaseBackend::Postgres;
        config.database.server = Some("127.0.0.1".to_string());
        config.database.port = 1;
        config.database.database = Some("users".to_string());
        assert!(build_pipeline(&config).await.is_ok());
    }
}
