//! Command-line interface for readsim-runtime.
//!
//! Provides commands for storage provisioning, pipeline runs and parameter
//! inspection.

mod commands;

pub use commands::{exit_code, parse_cli, run, run_with_cli, Cli, Commands};
