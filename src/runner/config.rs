//! Runtime configuration for provisioning, engine launch and log upload.
//!
//! Defaults match the managed task environment: the pipeline source lives in
//! `/root`, runs from `/nf-workdir`, and talks to the in-cluster dispatcher.

use std::path::PathBuf;
use std::time::Duration;

use crate::error::ConfigError;

/// Names excluded from the workspace copy at every depth.
pub const DEFAULT_EXCLUDES: &[&str] = &[
    "latch",
    ".latch",
    "nextflow",
    ".nextflow",
    "work",
    "results",
    "miniconda",
    "anaconda3",
    "mambaforge",
];

/// Fixed pipeline identifier used to namespace uploaded logs.
pub const PIPELINE_ID: &str = "nf_nf_core_readsimulator";

/// Configuration for one pipeline run.
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    // Control plane
    /// Base URL of the dispatcher service.
    pub control_plane_url: String,
    /// Environment variable holding the execution token.
    pub token_env: String,
    /// Scheme used in the `Authorization` header.
    pub auth_scheme: String,
    /// Size of the shared volume to request.
    pub storage_gib: u64,
    /// Timeout applied to every HTTP request.
    pub http_timeout: Duration,

    // Workspace
    /// Tree copied into the working directory.
    pub source_dir: PathBuf,
    /// Working directory the engine runs in.
    pub work_dir: PathBuf,
    /// Names skipped during the copy.
    pub excludes: Vec<String>,

    // Engine
    pub engine_binary: PathBuf,
    /// Entry script, relative to the working directory.
    pub entry_script: String,
    pub profile: String,
    /// Engine config file passed with `-c`.
    pub engine_config: String,
    /// Value for `NXF_HOME`.
    pub engine_home: PathBuf,
    /// Value for `NXF_OPTS`.
    pub engine_opts: String,

    // Logs
    /// Engine log file, relative to the working directory.
    pub log_file: String,
    /// Root of the remote log destination.
    pub log_root: String,
    pub pipeline_id: String,
    /// Object store endpoint receiving log uploads.
    pub object_store_url: String,
    /// Explicit execution name; skips the control-plane lookup when set.
    pub execution_name: Option<String>,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            control_plane_url: "http://nf-dispatcher-service.flyte.svc.cluster.local".to_string(),
            token_env: "FLYTE_INTERNAL_EXECUTION_ID".to_string(),
            auth_scheme: "Latch-Execution-Token".to_string(),
            storage_gib: 100,
            http_timeout: Duration::from_secs(60),

            source_dir: PathBuf::from("/root"),
            work_dir: PathBuf::from("/nf-workdir"),
            excludes: DEFAULT_EXCLUDES.iter().map(|s| s.to_string()).collect(),

            engine_binary: PathBuf::from("/root/nextflow"),
            entry_script: "main.nf".to_string(),
            profile: "docker".to_string(),
            engine_config: "latch.config".to_string(),
            engine_home: PathBuf::from("/root/.nextflow"),
            engine_opts: "-Xms2048M -Xmx8G -XX:ActiveProcessorCount=4".to_string(),

            log_file: ".nextflow.log".to_string(),
            log_root: "latch:///your_log_dir".to_string(),
            pipeline_id: PIPELINE_ID.to_string(),
            object_store_url: "http://nf-dispatcher-service.flyte.svc.cluster.local".to_string(),
            execution_name: None,
        }
    }
}

impl RuntimeConfig {
    /// Creates a configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates configuration from environment variables.
    ///
    /// # Environment Variables
    ///
    /// - `READSIM_CONTROL_PLANE_URL`: dispatcher base URL
    /// - `READSIM_TOKEN_ENV`: name of the execution token variable
    /// - `READSIM_STORAGE_GIB`: volume size (default: 100)
    /// - `READSIM_HTTP_TIMEOUT_SECS`: HTTP timeout in seconds (default: 60)
    /// - `READSIM_SOURCE_DIR`: source tree (default: /root)
    /// - `READSIM_WORK_DIR`: working directory (default: /nf-workdir)
    /// - `READSIM_ENGINE_BINARY`: engine executable (default: /root/nextflow)
    /// - `READSIM_OBJECT_STORE_URL`: object store endpoint for log uploads
    /// - `READSIM_EXECUTION_NAME`: explicit execution name
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Ok(val) = std::env::var("READSIM_CONTROL_PLANE_URL") {
            config.control_plane_url = val;
        }

        if let Ok(val) = std::env::var("READSIM_TOKEN_ENV") {
            config.token_env = val;
        }

        if let Ok(val) = std::env::var("READSIM_STORAGE_GIB") {
            config.storage_gib = parse_env_value(&val, "READSIM_STORAGE_GIB")?;
        }

        if let Ok(val) = std::env::var("READSIM_HTTP_TIMEOUT_SECS") {
            let secs: u64 = parse_env_value(&val, "READSIM_HTTP_TIMEOUT_SECS")?;
            config.http_timeout = Duration::from_secs(secs);
        }

        if let Ok(val) = std::env::var("READSIM_SOURCE_DIR") {
            config.source_dir = PathBuf::from(val);
        }

        if let Ok(val) = std::env::var("READSIM_WORK_DIR") {
            config.work_dir = PathBuf::from(val);
        }

        if let Ok(val) = std::env::var("READSIM_ENGINE_BINARY") {
            config.engine_binary = PathBuf::from(val);
        }

        if let Ok(val) = std::env::var("READSIM_OBJECT_STORE_URL") {
            config.object_store_url = val;
        }

        if let Ok(val) = std::env::var("READSIM_EXECUTION_NAME") {
            if !val.trim().is_empty() {
                config.execution_name = Some(val);
            }
        }

        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration values.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.control_plane_url.is_empty() {
            return Err(ConfigError::ValidationFailed(
                "control_plane_url cannot be empty".to_string(),
            ));
        }

        if self.token_env.is_empty() {
            return Err(ConfigError::ValidationFailed(
                "token_env cannot be empty".to_string(),
            ));
        }

        if self.storage_gib == 0 {
            return Err(ConfigError::ValidationFailed(
                "storage_gib must be greater than 0".to_string(),
            ));
        }

        if self.source_dir == self.work_dir {
            return Err(ConfigError::ValidationFailed(
                "source_dir and work_dir must differ".to_string(),
            ));
        }

        if self.work_dir.starts_with(&self.source_dir) {
            let nested = self
                .work_dir
                .strip_prefix(&self.source_dir)
                .ok()
                .and_then(|rest| rest.components().next())
                .map(|c| c.as_os_str().to_string_lossy().to_string());
            if !nested.map(|n| self.excludes.contains(&n)).unwrap_or(false) {
                return Err(ConfigError::ValidationFailed(
                    "work_dir inside source_dir must be covered by an exclude".to_string(),
                ));
            }
        }

        if self.log_file.is_empty() {
            return Err(ConfigError::ValidationFailed(
                "log_file cannot be empty".to_string(),
            ));
        }

        Ok(())
    }

    /// Sets the control plane URL.
    pub fn with_control_plane(mut self, url: impl Into<String>) -> Self {
        self.control_plane_url = url.into();
        self
    }

    /// Sets the object store URL.
    pub fn with_object_store(mut self, url: impl Into<String>) -> Self {
        self.object_store_url = url.into();
        self
    }

    /// Sets the execution token variable name.
    pub fn with_token_env(mut self, var: impl Into<String>) -> Self {
        self.token_env = var.into();
        self
    }

    /// Sets source and working directories.
    pub fn with_dirs(mut self, source: impl Into<PathBuf>, work: impl Into<PathBuf>) -> Self {
        self.source_dir = source.into();
        self.work_dir = work.into();
        self
    }

    /// Sets the engine executable.
    pub fn with_engine_binary(mut self, binary: impl Into<PathBuf>) -> Self {
        self.engine_binary = binary.into();
        self
    }

    /// Sets an explicit execution name.
    pub fn with_execution_name(mut self, name: impl Into<String>) -> Self {
        self.execution_name = Some(name.into());
        self
    }

    /// Absolute path of the entry script inside the working directory.
    pub fn entry_script_path(&self) -> PathBuf {
        self.work_dir.join(&self.entry_script)
    }

    /// Absolute path of the engine log inside the working directory.
    pub fn log_path(&self) -> PathBuf {
        self.work_dir.join(&self.log_file)
    }
}

/// Parses an environment variable value into the specified type.
fn parse_env_value<T: std::str::FromStr>(value: &str, key: &str) -> Result<T, ConfigError>
where
    T::Err: std::fmt::Display,
{
    value.parse().map_err(|e: T::Err| ConfigError::InvalidValue {
        key: key.to_string(),
        message: e.to_string(),
    })
}
