//! Engine invocation and subprocess supervision.
//!
//! An [`EngineCommand`] is the complete, reproducible description of one
//! engine launch: program, argument vector, environment overlay and working
//! directory. Building one requires a [`VolumeHandle`], so no argument vector
//! exists before storage has been provisioned.

use std::path::PathBuf;
use std::process::Stdio;

use tokio::process::Command;
use tracing::{debug, info};

use crate::error::EngineError;
use crate::params::{engine_flags, RunArguments};
use crate::provision::VolumeHandle;
use crate::runner::RuntimeConfig;

/// Engine home directory variable.
pub const ENV_ENGINE_HOME: &str = "NXF_HOME";
/// JVM heap and processor tuning variable.
pub const ENV_ENGINE_OPTS: &str = "NXF_OPTS";
/// Volume claim the engine mounts for task scratch space.
pub const ENV_STORAGE_CLAIM: &str = "K8S_STORAGE_CLAIM_NAME";
/// Disables the engine's self-update check.
pub const ENV_DISABLE_UPDATE_CHECK: &str = "NXF_DISABLE_CHECK_LATEST";

/// A fully resolved engine launch.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineCommand {
    program: PathBuf,
    args: Vec<String>,
    env: Vec<(String, String)>,
    cwd: PathBuf,
}

impl EngineCommand {
    /// Builds the launch for `args` against the provisioned `volume`.
    pub fn build(config: &RuntimeConfig, volume: &VolumeHandle, args: &RunArguments) -> Self {
        let mut argv = vec![
            "run".to_string(),
            config.entry_script_path().display().to_string(),
            "-work-dir".to_string(),
            config.work_dir.display().to_string(),
            "-profile".to_string(),
            config.profile.clone(),
            "-c".to_string(),
            config.engine_config.clone(),
        ];
        argv.extend(engine_flags(args));

        Self {
            program: config.engine_binary.clone(),
            args: argv,
            env: engine_env(config, volume),
            cwd: config.work_dir.clone(),
        }
    }

    pub fn program(&self) -> &PathBuf {
        &self.program
    }

    /// Arguments after the program name.
    pub fn args(&self) -> &[String] {
        &self.args
    }

    /// Environment overlay applied on top of the inherited environment.
    pub fn env(&self) -> &[(String, String)] {
        &self.env
    }

    pub fn cwd(&self) -> &PathBuf {
        &self.cwd
    }

    /// Full argument vector including the program.
    pub fn argv(&self) -> Vec<String> {
        std::iter::once(self.program.display().to_string())
            .chain(self.args.iter().cloned())
            .collect()
    }

    /// Space-joined command line, for printing and reproducing the launch.
    pub fn command_line(&self) -> String {
        self.argv().join(" ")
    }

    /// Runs the engine to completion.
    ///
    /// The child inherits stdio so engine output streams straight to the task
    /// log. Blocks the calling task until the child exits.
    pub async fn run(&self) -> Result<(), EngineError> {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args)
            .current_dir(&self.cwd)
            .envs(self.env.iter().map(|(k, v)| (k.as_str(), v.as_str())))
            .stdin(Stdio::null())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit());

        info!(
            "Starting engine {} in {}",
            self.program.display(),
            self.cwd.display()
        );

        let mut child = cmd.spawn().map_err(|source| EngineError::Spawn {
            program: self.program.display().to_string(),
            source,
        })?;

        let status = child.wait().await.map_err(EngineError::Wait)?;
        debug!(?status, "Engine exited");

        if status.success() {
            return Ok(());
        }
        match status.code() {
            Some(code) => Err(EngineError::NonZeroExit { code }),
            None => Err(EngineError::KilledBySignal),
        }
    }
}

/// Environment overlay injected into the engine process.
pub fn engine_env(config: &RuntimeConfig, volume: &VolumeHandle) -> Vec<(String, String)> {
    vec![
        (
            ENV_ENGINE_HOME.to_string(),
            config.engine_home.display().to_string(),
        ),
        (ENV_ENGINE_OPTS.to_string(), config.engine_opts.clone()),
        (ENV_STORAGE_CLAIM.to_string(), volume.as_str().to_string()),
        (ENV_DISABLE_UPDATE_CHECK.to_string(), "true".to_string()),
    ]
}
