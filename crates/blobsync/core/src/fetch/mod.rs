//! Source document retrieval.
//!
//! A [`DocumentSource`] moves bytes; the [`DocumentFetcher`] decodes them and
//! turns every failure into a single operator notification.

mod azure;
mod connection;
mod file;

pub use azure::AzureBlobSource;
pub use connection::StorageConnection;
pub use file::FileSource;

use crate::error::FetchError;
use crate::notify::Notifier;
use crate::record::{parse_document, UserRecord};
use async_trait::async_trait;
use bytes::Bytes;
use std::sync::Arc;

/// Transport for the raw source document.
#[async_trait]
pub trait DocumentSource: Send + Sync {
    /// Read the full object content.
    async fn fetch_bytes(&self) -> Result<Bytes, FetchError>;

    /// Human-readable location for logs, without credentials.
    fn describe(&self) -> String;
}

/// Fetches and decodes the source document, notifying on failure.
#[derive(Clone)]
pub struct DocumentFetcher {
    source: Arc<dyn DocumentSource>,
    notifier: Arc<dyn Notifier>,
}

impl DocumentFetcher {
    pub fn new(source: Arc<dyn DocumentSource>, notifier: Arc<dyn Notifier>) -> Self {
        Self { source, notifier }
    }

    /// Fetch the document. `None` means the run must stop; the failure has
    /// already been logged and reported.
    pub async fn fetch(&self) -> Option<Vec<UserRecord>> {
        match self.try_fetch().await {
            Ok(records) => Some(records),
            Err(e) => {
                let message = format!("Blob download failed: {}", e);
                tracing::error!(location = %self.source.describe(), error = %e, "Blob download failed");
                self.notifier.notify(&message).await;
                None
            }
        }
    }

    /// Fetch without the notification side effect.
    pub async fn try_fetch(&self) -> Result<Vec<UserRecord>, FetchError> {
        let bytes = self.source.fetch_bytes().await?;
        tracing::info!(
            location = %self.source.describe(),
            bytes = bytes.len(),
            "Downloaded source document"
        );
        parse_document(&bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::RecordingNotifier;

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

    struct MissingSource;

    #[async_trait]
    impl DocumentSource for MissingSource {
        async fn fetch_bytes(&self) -> Result<Bytes, FetchError> {
            Err(FetchError::NotFound("container/data.json".to_string()))
        }

        fn describe(&self) -> String {
            "container/data.json".to_string()
        }
    }

    #[tokio::test]
    async fn returns_records_without_notifying() {
        let notifier = Arc::new(RecordingNotifier::new());
        let fetcher = DocumentFetcher::new(
            Arc::new(StaticSource(br#"[{"id":1,"name":"Ann","age":30}]"#)),
            notifier.clone(),
        );

        let records = fetcher.fetch().await.unwrap();
        assert_eq!(records.len(), 1);
        assert!(notifier.messages().await.is_empty());
    }

    #[tokio::test]
    async fn malformed_json_notifies_once() {
        let notifier = Arc::new(RecordingNotifier::new());
        let fetcher = DocumentFetcher::new(Arc::new(StaticSource(b"not json")), notifier.clone());

        assert!(fetcher.fetch().await.is_none());

        let messages = notifier.messages().await;
        assert_eq!(messages.len(), 1);
        assert!(messages[0].starts_with("Blob download failed:"));
        assert!(messages[0].contains("malformed JSON"));
    }

    #[tokio::test]
    async fn missing_object_notifies_once() {
        let notifier = Arc::new(RecordingNotifier::new());
        let fetcher = DocumentFetcher::new(Arc::new(MissingSource), notifier.clone());

        assert!(fetcher.fetch().await.is_none());

        let messages = notifier.messages().await;
        assert_eq!(messages.len(), 1);
        assert!(messages[0].contains("object not found"));
    }
}
