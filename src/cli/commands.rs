//! CLI command definitions for readsim-runtime.
//!
//! Each subcommand covers one step of a pipeline execution, and `launch`
//! chains provisioning and the run the way the managed task does.

use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::Parser;
use serde::Serialize;
use tracing::info;

use crate::engine::EngineCommand;
use crate::error::RunError;
use crate::logs::LogUploadOutcome;
use crate::params::{sections, RunArguments};
use crate::provision::{Provisioner, VolumeHandle};
use crate::runner::{RunReport, RunState, Runner, RuntimeConfig};

/// Volume name shown when previewing a command before provisioning.
const PREVIEW_VOLUME: &str = "<unprovisioned>";

/// Runtime wrapper for the nf-core/readsimulator pipeline.
#[derive(Parser)]
#[command(name = "readsim-runtime")]
#[command(about = "Provision storage and run the nf-core/readsimulator pipeline")]
#[command(version)]
#[command(
    long_about = "readsim-runtime provisions a shared volume, copies the pipeline into its working directory, runs the workflow engine with the selected parameters and uploads the engine log.\n\nExample usage:\n  readsim-runtime launch --params run.json"
)]
pub struct Cli {
    /// The subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,

    /// Log level (trace, debug, info, warn, error).
    #[arg(short, long, default_value = "info", global = true)]
    pub log_level: String,
}

/// Available CLI subcommands.
#[derive(clap::Subcommand)]
pub enum Commands {
    /// Provision a shared storage volume and print its name.
    Provision(ProvisionArgs),

    /// Run the pipeline against an already provisioned volume.
    Run(RunArgs),

    /// Provision a volume, then run the pipeline on it.
    Launch(LaunchArgs),

    /// List the pipeline parameters grouped by section.
    #[command(alias = "parameters")]
    Params(ParamsArgs),

    /// Print the engine command line without running it.
    Command(CommandArgs),
}

/// Overrides for the runtime configuration.
#[derive(clap::Args, Debug, Default)]
pub struct RuntimeArgs {
    /// Control plane base URL.
    #[arg(long)]
    pub control_plane_url: Option<String>,

    /// Object store base URL for log uploads.
    #[arg(long)]
    pub object_store_url: Option<String>,

    /// Environment variable holding the execution token.
    #[arg(long)]
    pub token_env: Option<String>,

    /// Pipeline source tree to copy.
    #[arg(long)]
    pub source_dir: Option<PathBuf>,

    /// Working directory the engine runs in.
    #[arg(long)]
    pub work_dir: Option<PathBuf>,

    /// Engine executable.
    #[arg(long)]
    pub engine_binary: Option<PathBuf>,

    /// Execution name used for the remote log path.
    #[arg(long, env = "READSIM_EXECUTION_NAME")]
    pub execution_name: Option<String>,
}

impl RuntimeArgs {
    /// Resolves the configuration: defaults, then `READSIM_*` variables, then flags.
    fn resolve(&self) -> anyhow::Result<RuntimeConfig> {
        let mut config = RuntimeConfig::from_env().context("Invalid runtime configuration")?;

        if let Some(url) = &self.control_plane_url {
            config.control_plane_url = url.clone();
        }
        if let Some(url) = &self.object_store_url {
            config.object_store_url = url.clone();
        }
        if let Some(var) = &self.token_env {
            config.token_env = var.clone();
        }
        if let Some(dir) = &self.source_dir {
            config.source_dir = dir.clone();
        }
        if let Some(dir) = &self.work_dir {
            config.work_dir = dir.clone();
        }
        if let Some(binary) = &self.engine_binary {
            config.engine_binary = binary.clone();
        }
        if let Some(name) = self.execution_name.as_ref().filter(|n| !n.trim().is_empty()) {
            config.execution_name = Some(name.clone());
        }

        config.validate().context("Invalid runtime configuration")?;
        Ok(config)
    }
}

/// Arguments for `readsim-runtime provision`.
#[derive(Parser, Debug)]
pub struct ProvisionArgs {
    #[command(flatten)]
    pub runtime: RuntimeArgs,
}

/// Arguments for `readsim-runtime run`.
#[derive(Parser, Debug)]
pub struct RunArgs {
    /// Name of the provisioned volume.
    #[arg(long, env = "READSIM_VOLUME")]
    pub volume: String,

    /// Run arguments file (JSON or YAML).
    #[arg(short, long)]
    pub params: PathBuf,

    /// Print the run report as JSON.
    #[arg(short = 'j', long)]
    pub json: bool,

    #[command(flatten)]
    pub runtime: RuntimeArgs,
}

/// Arguments for `readsim-runtime launch`.
#[derive(Parser, Debug)]
pub struct LaunchArgs {
    /// Run arguments file (JSON or YAML).
    #[arg(short, long)]
    pub params: PathBuf,

    /// Print the run report as JSON.
    #[arg(short = 'j', long)]
    pub json: bool,

    #[command(flatten)]
    pub runtime: RuntimeArgs,
}

/// Arguments for `readsim-runtime params`.
#[derive(Parser, Debug)]
pub struct ParamsArgs {
    /// Output the registry as JSON.
    #[arg(short = 'j', long)]
    pub json: bool,
}

/// Arguments for `readsim-runtime command`.
#[derive(Parser, Debug)]
pub struct CommandArgs {
    /// Run arguments file (JSON or YAML).
    #[arg(short, long)]
    pub params: PathBuf,

    /// Volume name to place in the environment overlay.
    #[arg(long)]
    pub volume: Option<String>,

    #[command(flatten)]
    pub runtime: RuntimeArgs,
}

/// Parse CLI arguments and return the Cli struct.
///
/// This allows main.rs to access CLI arguments (like log_level) before running commands.
pub fn parse_cli() -> Cli {
    Cli::parse()
}

/// Run the CLI by parsing arguments and executing the command.
pub async fn run() -> anyhow::Result<()> {
    run_with_cli(parse_cli()).await
}

/// Run the CLI with the parsed arguments.
///
/// Run failures come back as [`RunError`] inside the `anyhow::Error`, so the
/// caller can recover the engine's exit code with [`exit_code`].
pub async fn run_with_cli(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Commands::Provision(args) => run_provision_command(args).await,
        Commands::Run(args) => run_run_command(args).await,
        Commands::Launch(args) => run_launch_command(args).await,
        Commands::Params(args) => run_params_command(args),
        Commands::Command(args) => run_command_command(args),
    }
}

/// Process exit code for an error returned by [`run_with_cli`].
pub fn exit_code(err: &anyhow::Error) -> i32 {
    err.downcast_ref::<RunError>()
        .map(RunError::exit_code)
        .unwrap_or(1)
}

// ============================================================================
// Command Implementation
// ============================================================================

async fn run_provision_command(args: ProvisionArgs) -> anyhow::Result<()> {
    let config = args.runtime.resolve()?;
    let volume = provision(&config).await?;
    println!("{}", volume);
    Ok(())
}

async fn run_run_command(args: RunArgs) -> anyhow::Result<()> {
    let config = args.runtime.resolve()?;
    let run_args = load_arguments(&args.params)?;
    execute_run(config, VolumeHandle::new(args.volume), &run_args, args.json).await
}

async fn run_launch_command(args: LaunchArgs) -> anyhow::Result<()> {
    let config = args.runtime.resolve()?;
    // Load arguments before provisioning so a bad file costs no volume.
    let run_args = load_arguments(&args.params)?;
    let volume = provision(&config).await?;
    execute_run(config, volume, &run_args, args.json).await
}

fn run_params_command(args: ParamsArgs) -> anyhow::Result<()> {
    let sections = sections();
    if args.json {
        println!("{}", serde_json::to_string_pretty(&sections)?);
        return Ok(());
    }

    for section in &sections {
        println!("{}", section.title);
        for spec in &section.parameters {
            let mut line = format!("  {} <{}>", spec.flag(), spec.kind);
            if !spec.optional {
                line.push_str(" (required)");
            }
            if let Some(default) = &spec.default_value {
                line.push_str(&format!(" [default: {}]", default));
            }
            println!("{}", line);
            println!("      {}", spec.description);
        }
        println!();
    }
    Ok(())
}

fn run_command_command(args: CommandArgs) -> anyhow::Result<()> {
    let config = args.runtime.resolve()?;
    let run_args = load_arguments(&args.params)?;
    let volume = VolumeHandle::new(args.volume.unwrap_or_else(|| PREVIEW_VOLUME.to_string()));

    let command = EngineCommand::build(&config, &volume, &run_args);
    for (key, value) in command.env() {
        println!("{}={}", key, value);
    }
    println!("{}", command.command_line());
    Ok(())
}

async fn provision(config: &RuntimeConfig) -> Result<VolumeHandle, RunError> {
    let provisioner = Provisioner::new(config)?;
    let volume = provisioner.provision().await?;
    info!(volume = %volume, "Volume ready");
    Ok(volume)
}

fn load_arguments(path: &Path) -> anyhow::Result<RunArguments> {
    let args = RunArguments::from_file(path)
        .with_context(|| format!("Failed to load run arguments from {}", path.display()))?;
    info!(count = args.len(), "Loaded run arguments");
    Ok(args)
}

async fn execute_run(
    config: RuntimeConfig,
    volume: VolumeHandle,
    args: &RunArguments,
    json: bool,
) -> anyhow::Result<()> {
    let runner = Runner::from_config(config).context("Failed to initialize log uploader")?;
    let report = runner.execute(volume, args).await;

    let summary = RunSummary::from_report(&report);
    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        println!("Run {}: {}", summary.run_id, summary.status);
        println!("Engine log {}", report.log_upload);
    }

    report.into_result()?;
    Ok(())
}

/// Serializable view of a [`RunReport`].
#[derive(Debug, Serialize)]
struct RunSummary {
    run_id: String,
    volume: String,
    status: &'static str,
    started_at: String,
    duration_secs: f64,
    states: Vec<RunState>,
    #[serde(skip_serializing_if = "Option::is_none")]
    command: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    exit_code: Option<i32>,
    log_upload: LogUploadOutcome,
}

impl RunSummary {
    fn from_report(report: &RunReport) -> Self {
        let (status, error, exit_code) = match &report.outcome {
            Ok(()) => ("succeeded", None, None),
            Err(e) => ("failed", Some(e.to_string()), Some(e.exit_code())),
        };
        Self {
            run_id: report.run_id.clone(),
            volume: report.volume.to_string(),
            status,
            started_at: report.started_at.to_rfc3339(),
            duration_secs: report.duration.as_secs_f64(),
            states: report.states.clone(),
            command: report.command.as_ref().map(EngineCommand::argv),
            error,
            exit_code,
            log_upload: report.log_upload.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::EngineError;
    use clap::CommandFactory;

    #[test]
    fn test_cli_parses() {
        // Verify CLI definition is valid
        Cli::command().debug_assert();
    }

    #[test]
    fn test_run_command() {
        let args = vec![
            "readsim-runtime",
            "run",
            "--volume",
            "pvc-1",
            "--params",
            "run.json",
            "--work-dir",
            "/tmp/nf",
        ];
        let cli = Cli::try_parse_from(args).expect("should parse");

        match cli.command {
            Commands::Run(args) => {
                assert_eq!(args.volume, "pvc-1");
                assert_eq!(args.params, PathBuf::from("run.json"));
                assert_eq!(args.runtime.work_dir, Some(PathBuf::from("/tmp/nf")));
                assert!(!args.json);
            }
            _ => panic!("Expected Run command"),
        }
    }

    #[test]
    fn test_launch_requires_params() {
        assert!(Cli::try_parse_from(["readsim-runtime", "launch"]).is_err());
    }

    #[test]
    fn test_params_alias_and_log_level() {
        let cli = Cli::try_parse_from(["readsim-runtime", "parameters", "--json", "-l", "debug"])
            .expect("should parse with alias");
        assert_eq!(cli.log_level, "debug");
        match cli.command {
            Commands::Params(args) => assert!(args.json),
            _ => panic!("Expected Params command"),
        }
    }

    #[test]
    fn test_command_volume_is_optional() {
        let cli = Cli::try_parse_from(["readsim-runtime", "command", "-p", "run.yaml"])
            .expect("should parse");
        match cli.command {
            Commands::Command(args) => assert!(args.volume.is_none()),
            _ => panic!("Expected Command command"),
        }
    }

    #[test]
    fn test_exit_code_from_run_error() {
        let err = anyhow::Error::new(RunError::from(EngineError::NonZeroExit { code: 42 }));
        assert_eq!(exit_code(&err), 42);

        let err = anyhow::anyhow!("bad params file");
        assert_eq!(exit_code(&err), 1);
    }

    #[test]
    fn test_runtime_args_override_config() {
        let args = RuntimeArgs {
            control_plane_url: Some("http://localhost:8080".to_string()),
            source_dir: Some(PathBuf::from("/pipeline")),
            work_dir: Some(PathBuf::from("/scratch/run")),
            execution_name: Some("exec-1".to_string()),
            ..Default::default()
        };
        let config = args.resolve().unwrap();
        assert_eq!(config.control_plane_url, "http://localhost:8080");
        assert_eq!(config.work_dir, PathBuf::from("/scratch/run"));
        assert_eq!(config.execution_name.as_deref(), Some("exec-1"));
    }
}
