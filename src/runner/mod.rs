//! Pipeline run orchestration.
//!
//! # Architecture
//!
//! ```text
//! VolumeHandle + RunArguments → Workspace → EngineCommand → engine process
//!                                                                 ↓
//!                                              (always) LogUploader → RunReport
//! ```
//!
//! The runner:
//! 1. Copies the pipeline source into the working directory
//! 2. Builds the engine command line from the bound arguments
//! 3. Runs the engine and waits for it to exit
//! 4. Uploads the engine log, whatever happened before
//!
//! # Example
//!
//! ```ignore
//! use readsim_runtime::provision::Provisioner;
//! use readsim_runtime::runner::{Runner, RuntimeConfig};
//!
//! let config = RuntimeConfig::from_env()?;
//! let volume = Provisioner::new(&config)?.provision().await?;
//! let runner = Runner::from_config(config)?;
//! let report = runner.run(volume, &args).await?;
//! println!("Log {}", report.log_upload);
//! ```

pub mod config;
pub mod executor;
pub mod result;

pub use config::{RuntimeConfig, DEFAULT_EXCLUDES, PIPELINE_ID};
pub use executor::Runner;
pub use result::{RunReport, RunState};
