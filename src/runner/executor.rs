//! Pipeline runner: workspace, arguments, engine, then the log upload.

use std::time::Instant;

use chrono::Utc;
use tracing::{debug, error, info};
use uuid::Uuid;

use super::config::RuntimeConfig;
use super::result::{RunReport, RunState};
use crate::engine::EngineCommand;
use crate::error::{LogUploadError, RunError};
use crate::logs::LogUploader;
use crate::params::RunArguments;
use crate::provision::VolumeHandle;
use crate::workspace::{MaterializeResult, Workspace};

/// Drives one pipeline run against a provisioned volume.
pub struct Runner {
    config: RuntimeConfig,
    uploader: LogUploader,
}

/// Mutable bookkeeping shared between the body and the finalization step.
struct Progress {
    states: Vec<RunState>,
    workspace: Option<MaterializeResult>,
    command: Option<EngineCommand>,
}

impl Progress {
    fn new() -> Self {
        Self {
            states: vec![RunState::Init],
            workspace: None,
            command: None,
        }
    }

    fn current(&self) -> RunState {
        self.states.last().copied().unwrap_or(RunState::Init)
    }

    fn advance(&mut self, next: RunState) {
        let current = self.current();
        debug_assert!(
            current.can_transition_to(next),
            "invalid transition {} -> {}",
            current,
            next
        );
        debug!("Run state {} -> {}", current, next);
        self.states.push(next);
    }
}

impl Runner {
    pub fn new(config: RuntimeConfig, uploader: LogUploader) -> Self {
        Self { config, uploader }
    }

    /// Builds a runner with the HTTP-backed log uploader.
    pub fn from_config(config: RuntimeConfig) -> Result<Self, LogUploadError> {
        let uploader = LogUploader::from_config(&config)?;
        Ok(Self::new(config, uploader))
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    /// Runs the pipeline and reports every outcome, failures included.
    ///
    /// The log upload is attempted exactly once after the body finishes,
    /// whatever the body's result.
    pub async fn execute(&self, volume: VolumeHandle, args: &RunArguments) -> RunReport {
        let run_id = format!("run-{}", Uuid::new_v4());
        let started_at = Utc::now();
        let start = Instant::now();

        info!(run_id = %run_id, volume = %volume, "Starting pipeline run");

        let mut progress = Progress::new();
        let outcome = self.run_body(&volume, args, &mut progress).await;

        if let Err(e) = &outcome {
            error!(run_id = %run_id, "Pipeline run failed: {}", e);
        }

        let log_upload = self.uploader.upload().await;
        progress.advance(RunState::LogUploadAttempted);
        info!(run_id = %run_id, "Engine log {}", log_upload);
        progress.advance(RunState::Done);

        let duration = start.elapsed();
        info!(run_id = %run_id, "Run finished in {:?}", duration);

        RunReport {
            run_id,
            volume,
            started_at,
            completed_at: Utc::now(),
            duration,
            states: progress.states,
            workspace: progress.workspace,
            command: progress.command,
            outcome,
            log_upload,
        }
    }

    /// Runs the pipeline, returning the body's error after the log upload.
    pub async fn run(
        &self,
        volume: VolumeHandle,
        args: &RunArguments,
    ) -> Result<RunReport, RunError> {
        self.execute(volume, args).await.into_result()
    }

    async fn run_body(
        &self,
        volume: &VolumeHandle,
        args: &RunArguments,
        progress: &mut Progress,
    ) -> Result<(), RunError> {
        let workspace = Workspace::new(&self.config.source_dir, &self.config.work_dir)
            .with_excludes(self.config.excludes.iter().cloned());
        match workspace.materialize() {
            Ok(result) => {
                progress.workspace = Some(result);
                progress.advance(RunState::WorkspaceReady);
            }
            Err(e) => {
                progress.advance(RunState::Aborted);
                return Err(e.into());
            }
        }

        let command = EngineCommand::build(&self.config, volume, args);
        progress.advance(RunState::ArgsBuilt);

        println!("Launching engine");
        println!("{}", command.command_line());

        progress.advance(RunState::EngineRunning);
        let result = command.run().await;
        progress.command = Some(command);

        match result {
            Ok(()) => {
                progress.advance(RunState::EngineSucceeded);
                Ok(())
            }
            Err(e) => {
                progress.advance(RunState::EngineFailed);
                Err(e.into())
            }
        }
    }
}
