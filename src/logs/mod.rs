//! Engine log upload.
//!
//! After every run, successful or not, the engine log is pushed to remote
//! storage under the execution's name. Nothing in this module fails the run:
//! every problem ends up as a [`LogUploadOutcome`] for the caller to report.

pub mod name;
pub mod store;

use std::fmt;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{info, warn};

use crate::error::LogUploadError;
use crate::runner::RuntimeConfig;

pub use name::{ControlPlaneExecutionName, ExecutionNameSource, StaticExecutionName};
pub use store::{HttpObjectStore, ObjectStore};

/// File name of the log in remote storage.
pub const REMOTE_LOG_NAME: &str = "nextflow.log";

/// Remote location of an execution's log:
/// `<root>/<pipeline id>/<execution name>/nextflow.log`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteLogPath {
    root: String,
    pipeline_id: String,
    execution_name: String,
}

impl RemoteLogPath {
    pub fn new(
        root: impl Into<String>,
        pipeline_id: impl Into<String>,
        execution_name: impl Into<String>,
    ) -> Self {
        Self {
            root: root.into(),
            pipeline_id: pipeline_id.into(),
            execution_name: execution_name.into(),
        }
    }

    pub fn execution_name(&self) -> &str {
        &self.execution_name
    }

    /// Path without its scheme or leading slashes.
    pub fn object_key(&self) -> String {
        let full = self.to_string();
        let rest = match full.split_once("://") {
            Some((_, rest)) => rest,
            None => full.as_str(),
        };
        rest.trim_start_matches('/').to_string()
    }
}

impl fmt::Display for RemoteLogPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{}/{}/{}",
            self.root.trim_end_matches('/'),
            self.pipeline_id.trim_matches('/'),
            self.execution_name.trim_matches('/'),
            REMOTE_LOG_NAME
        )
    }
}

/// What happened to the engine log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum LogUploadOutcome {
    Uploaded { remote: String },
    Skipped { reason: String },
    Failed { reason: String },
}

impl LogUploadOutcome {
    pub fn is_uploaded(&self) -> bool {
        matches!(self, LogUploadOutcome::Uploaded { .. })
    }
}

impl fmt::Display for LogUploadOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogUploadOutcome::Uploaded { remote } => write!(f, "uploaded to {}", remote),
            LogUploadOutcome::Skipped { reason } => write!(f, "skipped: {}", reason),
            LogUploadOutcome::Failed { reason } => write!(f, "failed: {}", reason),
        }
    }
}

/// Uploads the engine log from the working directory.
pub struct LogUploader {
    log_path: PathBuf,
    log_root: String,
    pipeline_id: String,
    names: Box<dyn ExecutionNameSource>,
    store: Box<dyn ObjectStore>,
}

impl LogUploader {
    pub fn new(
        config: &RuntimeConfig,
        names: Box<dyn ExecutionNameSource>,
        store: Box<dyn ObjectStore>,
    ) -> Self {
        Self {
            log_path: config.log_path(),
            log_root: config.log_root.clone(),
            pipeline_id: config.pipeline_id.clone(),
            names,
            store,
        }
    }

    /// Builds the uploader from configuration.
    ///
    /// An explicit execution name is used as is; otherwise the name is looked
    /// up on the control plane at upload time.
    pub fn from_config(config: &RuntimeConfig) -> Result<Self, LogUploadError> {
        let names: Box<dyn ExecutionNameSource> = match &config.execution_name {
            Some(name) => Box::new(StaticExecutionName::new(name.clone())),
            None => Box::new(ControlPlaneExecutionName::new(config)?),
        };
        let store = Box::new(HttpObjectStore::new(config)?);
        Ok(Self::new(config, names, store))
    }

    pub fn log_path(&self) -> &Path {
        &self.log_path
    }

    /// Attempts the upload once. Never fails.
    pub async fn upload(&self) -> LogUploadOutcome {
        if !self.log_path.is_file() {
            let reason = format!("no engine log at {}", self.log_path.display());
            warn!("Skipping log upload: {}", reason);
            return LogUploadOutcome::Skipped { reason };
        }

        let name = match self.names.resolve().await {
            Ok(name) => name,
            Err(e) => {
                warn!("Skipping log upload: {}", e);
                return LogUploadOutcome::Skipped {
                    reason: e.to_string(),
                };
            }
        };

        let remote = RemoteLogPath::new(&self.log_root, &self.pipeline_id, name);
        info!(remote = %remote, "Uploading engine log");
        match self.store.upload(&self.log_path, &remote).await {
            Ok(()) => LogUploadOutcome::Uploaded {
                remote: remote.to_string(),
            },
            Err(e) => {
                warn!("Log upload failed: {}", e);
                LogUploadOutcome::Failed {
                    reason: e.to_string(),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use tempfile::TempDir;

    struct FailingNames;

    #[async_trait::async_trait]
    impl ExecutionNameSource for FailingNames {
        async fn resolve(&self) -> Result<String, LogUploadError> {
            Err(LogUploadError::Resolution("lookup refused".to_string()))
        }
    }

    #[derive(Default)]
    struct RecordingStore {
        calls: Arc<AtomicUsize>,
        fail: bool,
    }

    #[async_trait::async_trait]
    impl ObjectStore for RecordingStore {
        async fn upload(&self, _local: &Path, _remote: &RemoteLogPath) -> Result<(), LogUploadError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                Err(LogUploadError::Upload("store unavailable".to_string()))
            } else {
                Ok(())
            }
        }
    }

    fn config_in(dir: &Path) -> RuntimeConfig {
        RuntimeConfig::default().with_dirs(dir.join("src"), dir)
    }

    #[test]
    fn test_remote_log_path() {
        let path = RemoteLogPath::new("latch:///your_log_dir", "nf_nf_core_readsimulator", "exec-7");
        assert_eq!(
            path.to_string(),
            "latch:///your_log_dir/nf_nf_core_readsimulator/exec-7/nextflow.log"
        );
        assert_eq!(
            path.object_key(),
            "your_log_dir/nf_nf_core_readsimulator/exec-7/nextflow.log"
        );
    }

    #[tokio::test]
    async fn test_missing_log_is_skipped() {
        let temp = TempDir::new().unwrap();
        let calls = Arc::new(AtomicUsize::new(0));
        let uploader = LogUploader::new(
            &config_in(temp.path()),
            Box::new(StaticExecutionName::new("exec")),
            Box::new(RecordingStore {
                calls: calls.clone(),
                fail: false,
            }),
        );

        let outcome = uploader.upload().await;
        assert!(matches!(outcome, LogUploadOutcome::Skipped { .. }));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_name_failure_is_skipped() {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join(".nextflow.log"), "log").unwrap();
        let calls = Arc::new(AtomicUsize::new(0));
        let uploader = LogUploader::new(
            &config_in(temp.path()),
            Box::new(FailingNames),
            Box::new(RecordingStore {
                calls: calls.clone(),
                fail: false,
            }),
        );

        match uploader.upload().await {
            LogUploadOutcome::Skipped { reason } => assert!(reason.contains("lookup refused")),
            other => panic!("unexpected outcome: {:?}", other),
        }
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_upload_success_and_failure() {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join(".nextflow.log"), "log").unwrap();

        let uploader = LogUploader::new(
            &config_in(temp.path()),
            Box::new(StaticExecutionName::new("exec-1")),
            Box::new(RecordingStore::default()),
        );
        assert_eq!(
            uploader.upload().await,
            LogUploadOutcome::Uploaded {
                remote: "latch:///your_log_dir/nf_nf_core_readsimulator/exec-1/nextflow.log"
                    .to_string()
            }
        );

        let uploader = LogUploader::new(
            &config_in(temp.path()),
            Box::new(StaticExecutionName::new("exec-1")),
            Box::new(RecordingStore {
                calls: Arc::new(AtomicUsize::new(0)),
                fail: true,
            }),
        );
        assert!(matches!(
            uploader.upload().await,
            LogUploadOutcome::Failed { .. }
        ));
    }

    #[test]
    fn test_outcome_serializes_with_status_tag() {
        let outcome = LogUploadOutcome::Skipped {
            reason: "no log".to_string(),
        };
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["status"], "skipped");
        assert_eq!(json["reason"], "no log");
    }
}
