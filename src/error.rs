//! Error types for readsim-runtime operations.
//!
//! Defines error types for each stage of a pipeline run:
//! - Storage provisioning against the control plane
//! - Run argument loading
//! - Workspace materialization
//! - Engine subprocess supervision
//! - Log upload (never fatal)
//! - Runtime configuration

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while provisioning shared storage.
#[derive(Debug, Error)]
pub enum ProvisionError {
    /// No execution token is available in the environment.
    #[error("Authentication error: execution token variable '{0}' is not set")]
    Authentication(String),

    #[error("Provisioning request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Provisioning rejected by control plane ({status}): {body}")]
    Rejected { status: u16, body: String },

    #[error("Invalid provisioning response: {0}")]
    InvalidResponse(String),
}

/// Errors that can occur while loading run arguments.
#[derive(Debug, Error)]
pub enum ArgumentError {
    #[error("Unknown parameter '{0}'")]
    UnknownParameter(String),

    #[error("Parameter '{name}' expects {expected}, got {actual}")]
    TypeMismatch {
        name: String,
        expected: &'static str,
        actual: String,
    },

    #[error("Run arguments must be a mapping of parameter names to values")]
    NotAMapping,

    #[error("Unsupported arguments file format: {0}")]
    UnsupportedFormat(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// Errors that can occur while materializing the working directory.
#[derive(Debug, Error)]
pub enum WorkspaceError {
    #[error("Source directory '{0}' does not exist")]
    MissingSource(PathBuf),

    #[error("Failed to walk source tree: {0}")]
    Walk(#[from] walkdir::Error),

    #[error("Failed to copy '{path}': {source}")]
    Copy {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Errors raised by the engine subprocess.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Failed to spawn engine '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to wait for engine: {0}")]
    Wait(#[source] std::io::Error),

    #[error("Engine exited with non-zero code {code}")]
    NonZeroExit { code: i32 },

    #[error("Engine was terminated by a signal")]
    KilledBySignal,
}

impl EngineError {
    /// Exit code reported by the engine, if it exited normally.
    pub fn exit_code(&self) -> Option<i32> {
        match self {
            EngineError::NonZeroExit { code } => Some(*code),
            _ => None,
        }
    }
}

/// Errors in the log upload step. These are reported, never escalated.
#[derive(Debug, Error)]
pub enum LogUploadError {
    #[error("Failed to resolve execution name: {0}")]
    Resolution(String),

    #[error("Failed to read log file '{path}': {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Log upload failed: {0}")]
    Upload(String),
}

impl From<reqwest::Error> for LogUploadError {
    fn from(e: reqwest::Error) -> Self {
        LogUploadError::Upload(e.to_string())
    }
}

/// Errors in runtime configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid value for {key}: {message}")]
    InvalidValue { key: String, message: String },

    #[error("Configuration validation failed: {0}")]
    ValidationFailed(String),
}

/// Fatal errors that abort a pipeline run.
#[derive(Debug, Error)]
pub enum RunError {
    #[error(transparent)]
    Provision(#[from] ProvisionError),

    #[error("Workspace error: {0}")]
    Workspace(#[from] WorkspaceError),

    #[error("Engine execution error: {0}")]
    Engine(#[from] EngineError),
}

impl RunError {
    /// Process exit code the CLI should report for this error.
    ///
    /// Engine failures keep the engine's own exit code.
    pub fn exit_code(&self) -> i32 {
        match self {
            RunError::Engine(e) => e.exit_code().unwrap_or(1),
            _ => 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_engine_exit_code_propagates() {
        let err = RunError::from(EngineError::NonZeroExit { code: 3 });
        assert_eq!(err.exit_code(), 3);

        let err = RunError::from(EngineError::KilledBySignal);
        assert_eq!(err.exit_code(), 1);
    }

    #[test]
    fn test_authentication_message_names_variable() {
        let err = ProvisionError::Authentication("FLYTE_INTERNAL_EXECUTION_ID".to_string());
        assert!(err.to_string().contains("FLYTE_INTERNAL_EXECUTION_ID"));
    }

    #[test]
    fn test_workspace_error_exit_code() {
        let err = RunError::from(WorkspaceError::MissingSource(PathBuf::from("/nope")));
        assert_eq!(err.exit_code(), 1);
    }
}
