//! readsim-runtime: runtime wrapper for the nf-core/readsimulator pipeline.
//!
//! This library describes the pipeline's parameters, provisions shared
//! storage, runs the workflow engine over a prepared working directory and
//! uploads the engine log after every run.

// Core modules
pub mod cli;
pub mod engine;
pub mod error;
pub mod logs;
pub mod params;
pub mod provision;
pub mod runner;
pub mod workspace;

// Re-export commonly used error types
pub use error::{
    ArgumentError, ConfigError, EngineError, LogUploadError, ProvisionError, RunError,
    WorkspaceError,
};
