use super::DocumentSource;
use crate::error::FetchError;
use async_trait::async_trait;
use bytes::Bytes;
use std::path::PathBuf;

/// Reads the source document from the local filesystem.
#[derive(Debug, Clone)]
pub struct FileSource {
    path: PathBuf,
}

impl FileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl DocumentSource for FileSource {
    async fn fetch_bytes(&self) -> Result<Bytes, FetchError> {
        match tokio::fs::read(&self.path).await {
            Ok(data) => Ok(Bytes::from(data)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(FetchError::NotFound(self.describe()))
            }
            Err(e) => Err(FetchError::Io {
                location: self.describe(),
                reason: e.to_string(),
            }),
        }
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[tokio::test]
    async fn reads_file_content() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"[]").unwrap();

        let source = FileSource::new(file.path());
        assert_eq!(source.fetch_bytes().await.unwrap().as_ref(), b"[]");
    }

    #[tokio::test]
    async fn missing_file_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let source = FileSource::new(dir.path().join("absent.json"));

        let err = source.fetch_bytes().await.unwrap_err();
        assert!(matches!(err, FetchError::NotFound(_)));
    }
}
