//! Run states and the report produced by every run.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::engine::EngineCommand;
use crate::error::RunError;
use crate::logs::LogUploadOutcome;
use crate::provision::VolumeHandle;
use crate::workspace::MaterializeResult;

/// Lifecycle states of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunState {
    Init,
    WorkspaceReady,
    ArgsBuilt,
    EngineRunning,
    EngineSucceeded,
    EngineFailed,
    /// Failed before the engine started.
    Aborted,
    LogUploadAttempted,
    Done,
}

impl RunState {
    /// Checks whether `next` may follow `self`.
    pub fn can_transition_to(self, next: RunState) -> bool {
        use RunState::*;
        matches!(
            (self, next),
            (Init, WorkspaceReady)
                | (Init, Aborted)
                | (WorkspaceReady, ArgsBuilt)
                | (ArgsBuilt, EngineRunning)
                | (EngineRunning, EngineSucceeded)
                | (EngineRunning, EngineFailed)
                | (EngineSucceeded, LogUploadAttempted)
                | (EngineFailed, LogUploadAttempted)
                | (Aborted, LogUploadAttempted)
                | (LogUploadAttempted, Done)
        )
    }
}

impl std::fmt::Display for RunState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            RunState::Init => "init",
            RunState::WorkspaceReady => "workspace_ready",
            RunState::ArgsBuilt => "args_built",
            RunState::EngineRunning => "engine_running",
            RunState::EngineSucceeded => "engine_succeeded",
            RunState::EngineFailed => "engine_failed",
            RunState::Aborted => "aborted",
            RunState::LogUploadAttempted => "log_upload_attempted",
            RunState::Done => "done",
        };
        write!(f, "{}", name)
    }
}

/// Everything known about a finished run.
#[derive(Debug)]
pub struct RunReport {
    /// Unique identifier for this run.
    pub run_id: String,
    pub volume: VolumeHandle,
    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
    pub duration: Duration,
    /// States visited, in order.
    pub states: Vec<RunState>,
    pub workspace: Option<MaterializeResult>,
    /// The engine launch, once arguments were built.
    pub command: Option<EngineCommand>,
    /// Result of the fallible body (workspace, arguments, engine).
    pub outcome: Result<(), RunError>,
    pub log_upload: LogUploadOutcome,
}

impl RunReport {
    pub fn is_success(&self) -> bool {
        self.outcome.is_ok()
    }

    pub fn final_state(&self) -> Option<RunState> {
        self.states.last().copied()
    }

    /// Splits off the body error, if any.
    ///
    /// The log upload has always been attempted by the time a report exists.
    pub fn into_result(mut self) -> Result<RunReport, RunError> {
        match std::mem::replace(&mut self.outcome, Ok(())) {
            Ok(()) => Ok(self),
            Err(e) => Err(e),
        }
    }
}
