//! Object store client for log uploads.

use std::path::Path;

use async_trait::async_trait;
use reqwest::Client;
use tracing::info;

use super::RemoteLogPath;
use crate::error::LogUploadError;
use crate::provision::ExecutionToken;
use crate::runner::RuntimeConfig;

/// Destination for uploaded files.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Uploads the file at `local` to `remote`.
    async fn upload(&self, local: &Path, remote: &RemoteLogPath) -> Result<(), LogUploadError>;
}

/// Object store reached over HTTP: `PUT <base>/objects/<key>` with raw bytes.
pub struct HttpObjectStore {
    client: Client,
    base_url: String,
    token_env: String,
    auth_scheme: String,
}

impl HttpObjectStore {
    pub fn new(config: &RuntimeConfig) -> Result<Self, LogUploadError> {
        let client = Client::builder().timeout(config.http_timeout).build()?;
        Ok(Self {
            client,
            base_url: config.object_store_url.trim_end_matches('/').to_string(),
            token_env: config.token_env.clone(),
            auth_scheme: config.auth_scheme.clone(),
        })
    }

    fn object_url(&self, remote: &RemoteLogPath) -> String {
        format!("{}/objects/{}", self.base_url, remote.object_key())
    }
}

#[async_trait]
impl ObjectStore for HttpObjectStore {
    async fn upload(&self, local: &Path, remote: &RemoteLogPath) -> Result<(), LogUploadError> {
        let content = tokio::fs::read(local)
            .await
            .map_err(|source| LogUploadError::Read {
                path: local.to_path_buf(),
                source,
            })?;
        let size = content.len();

        let mut req = self
            .client
            .put(self.object_url(remote))
            .header(reqwest::header::CONTENT_TYPE, "application/octet-stream")
            .body(content);
        if let Some(token) = ExecutionToken::from_env(&self.token_env) {
            req = req.header(
                reqwest::header::AUTHORIZATION,
                token.header_value(&self.auth_scheme),
            );
        }

        let resp = req.send().await?;
        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            return Err(LogUploadError::Upload(format!(
                "object store returned {}: {}",
                status, text
            )));
        }

        info!(remote = %remote, bytes = size, "Uploaded file to object store");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_object_url_strips_scheme() {
        let config = RuntimeConfig::default().with_object_store("http://store.local/");
        let store = HttpObjectStore::new(&config).unwrap();
        let remote = RemoteLogPath::new("latch:///your_log_dir", "nf_nf_core_readsimulator", "run-1");
        assert_eq!(
            store.object_url(&remote),
            "http://store.local/objects/your_log_dir/nf_nf_core_readsimulator/run-1/nextflow.log"
        );
    }

    #[tokio::test]
    async fn test_missing_local_file() {
        let temp = tempfile::TempDir::new().unwrap();
        let store = HttpObjectStore::new(&RuntimeConfig::default()).unwrap();
        let remote = RemoteLogPath::new("latch:///logs", "p", "r");

        let err = store
            .upload(&temp.path().join("absent.log"), &remote)
            .await
            .unwrap_err();
        assert!(matches!(err, LogUploadError::Read { .. }));
    }
}
