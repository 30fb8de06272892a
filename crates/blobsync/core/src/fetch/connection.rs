//! Azure Storage connection strings.

use crate::error::FetchError;
use base64::prelude::*;
use url::Url;

const DEV_ACCOUNT_NAME: &str = "devstoreaccount1";
const DEV_ACCOUNT_KEY: &str =
    "Eby8vdM02xNOcqFlqUwJPLlmEtlCDXJ1OUzFT50uSRZ6IFsuFq2UVErCz4I6tq/K1SZFPTOtr/KBHBeksoGMGw==";
const DEV_BLOB_ENDPOINT: &str = "http://127.0.0.1:10000/devstoreaccount1";
const DEFAULT_ENDPOINT_SUFFIX: &str = "core.windows.net";

/// Parsed storage account credentials and blob endpoint.
#[derive(Clone)]
pub struct StorageConnection {
    pub account_name: Option<String>,
    account_key: Option<Vec<u8>>,
    sas_token: Option<String>,
    pub blob_endpoint: Url,
}

impl std::fmt::Debug for StorageConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StorageConnection")
            .field("account_name", &self.account_name)
            .field("account_key", &self.account_key.as_ref().map(|_| "<redacted>"))
            .field("sas_token", &self.sas_token.as_ref().map(|_| "<redacted>"))
            .field("blob_endpoint", &self.blob_endpoint.as_str())
            .finish()
    }
}

impl StorageConnection {
    /// Parse a `Key=Value;Key=Value` connection string.
    pub fn parse(connection_string: &str) -> Result<Self, FetchError> {
        let mut protocol = "https".to_string();
        let mut suffix = DEFAULT_ENDPOINT_SUFFIX.to_string();
        let mut account_name = None;
        let mut account_key = None;
        let mut sas_token = None;
        let mut blob_endpoint = None;
        let mut development = false;

        for part in connection_string.split(';') {
            let part = part.trim();
            if part.is_empty() {
                continue;
            }
            let (key, value) = part.split_once('=').ok_or_else(|| {
                FetchError::Config(format!("connection string segment without '=': {}", key_of(part)))
            })?;
            let value = value.trim().to_string();
            match key.trim().to_ascii_lowercase().as_str() {
                "defaultendpointsprotocol" => protocol = value,
                "endpointsuffix" => suffix = value,
                "accountname" => account_name = Some(value),
                "accountkey" => account_key = Some(value),
                "sharedaccesssignature" => sas_token = Some(value),
                "blobendpoint" => blob_endpoint = Some(value),
                "usedevelopmentstorage" => development = value.eq_ignore_ascii_case("true"),
                _ => {}
            }
        }

        if development {
            account_name.get_or_insert_with(|| DEV_ACCOUNT_NAME.to_string());
            account_key.get_or_insert_with(|| DEV_ACCOUNT_KEY.to_string());
            blob_endpoint.get_or_insert_with(|| DEV_BLOB_ENDPOINT.to_string());
        }

        let endpoint = match blob_endpoint {
            Some(endpoint) => endpoint,
            None => {
                let account = account_name.as_deref().ok_or_else(|| {
                    FetchError::Config("connection string has neither AccountName nor BlobEndpoint".to_string())
                })?;
                format!("{}://{}.blob.{}", protocol, account, suffix)
            }
        };
        let blob_endpoint = Url::parse(&endpoint)
            .map_err(|e| FetchError::Config(format!("invalid blob endpoint {}: {}", endpoint, e)))?;

        let account_key = match account_key {
            Some(key) => {
                if account_name.is_none() {
                    return Err(FetchError::Config(
                        "AccountKey requires AccountName".to_string(),
                    ));
                }
                Some(
                    BASE64_STANDARD
                        .decode(key.as_bytes())
                        .map_err(|e| FetchError::Config(format!("AccountKey is not base64: {}", e)))?,
                )
            }
            None => None,
        };

        if account_key.is_none() && sas_token.is_none() {
            return Err(FetchError::Config(
                "connection string has neither AccountKey nor SharedAccessSignature".to_string(),
            ));
        }

        Ok(Self {
            account_name,
            account_key,
            sas_token: sas_token.map(|t| t.trim_start_matches('?').to_string()),
            blob_endpoint,
        })
    }

    /// URL of one blob, with the SAS query attached when present.
    pub fn blob_url(&self, container: &str, blob_name: &str) -> Result<Url, FetchError> {
        let mut url = self.blob_endpoint.clone();
        url.path_segments_mut()
            .map_err(|_| {
                FetchError::Config(format!(
                    "blob endpoint cannot be a base: {}",
                    self.blob_endpoint
                ))
            })?
            .pop_if_empty()
            .push(container)
            .extend(blob_name.split('/'));
        if let Some(sas) = &self.sas_token {
            url.set_query(Some(sas));
        }
        Ok(url)
    }

    pub(crate) fn shared_key(&self) -> Option<(&str, &[u8])> {
        if self.sas_token.is_some() {
            return None;
        }
        match (&self.account_name, &self.account_key) {
            (Some(name), Some(key)) => Some((name.as_str(), key.as_slice())),
            _ => None,
        }
    }
}

fn key_of(segment: &str) -> &str {
    segment.get(..segment.len().min(24)).unwrap_or("")
}
