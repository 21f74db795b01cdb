use anyhow::{Context, Result};
use bvs::config::BvsConfig;
use bvs::gates::DEFAULT_MAX_ITERATIONS;
use bvs::logging::{LogLevel, init_logging};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod cmd;

#[derive(Parser)]
#[command(name = "bvs")]
#[command(version, about = "Task scheduling and quality gates for parallel coding agents")]
pub struct Cli {
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[arg(long, global = true)]
    pub project_dir: Option<PathBuf>,

    /// Log level (overrides BVS_LOG)
    #[arg(long, global = true, value_enum)]
    pub log_level: Option<LogLevel>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Level a task file into parallel groups
    Schedule {
        /// Path to a JSON task list
        tasks: PathBuf,
        /// Print the schedule report as JSON
        #[arg(long)]
        json: bool,
    },
    /// Check a task file for unknown, self and circular dependencies
    Validate {
        /// Path to a JSON task list
        tasks: PathBuf,
    },
    /// List tasks whose dependencies are all completed
    Ready {
        /// Path to a JSON task list
        tasks: PathBuf,
        /// Completed task ids (comma-separated)
        #[arg(long, value_delimiter = ',')]
        completed: Vec<String>,
        #[arg(long)]
        json: bool,
    },
    /// Run the quality gate for a section
    Gate {
        /// Section identifier the run is recorded against
        #[arg(long)]
        section: String,
        /// Run all enabled checks concurrently
        #[arg(long)]
        parallel: bool,
        /// Fix attempts before the section counts as exhausted
        #[arg(long)]
        max_fix_attempts: Option<u32>,
        /// Print the gate result as JSON
        #[arg(long)]
        json: bool,
    },
    /// Re-run only the failing checks until they pass or stop improving
    Rereview {
        #[arg(long)]
        section: String,
        /// Previous gate result (JSON); a fresh gate run is used when omitted
        #[arg(long)]
        previous: Option<PathBuf>,
        #[arg(long, default_value_t = DEFAULT_MAX_ITERATIONS)]
        max_iterations: u32,
        #[arg(long)]
        parallel: bool,
        #[arg(long)]
        json: bool,
    },
    /// View or validate configuration
    Config {
        #[command(subcommand)]
        command: Option<ConfigCommands>,
    },
}

#[derive(Subcommand, Clone)]
pub enum ConfigCommands {
    /// Show current configuration
    Show,
    /// Validate configuration and show any warnings
    Validate,
    /// Initialize a default bvs.toml file
    Init,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.log_level, cli.verbose)?;

    let project_dir = match cli.project_dir.clone() {
        Some(dir) => dir,
        None => std::env::current_dir().context("Failed to get current directory")?,
    };

    let (parallel, max_fix_attempts) = match &cli.command {
        Commands::Gate {
            parallel,
            max_fix_attempts,
            ..
        } => (parallel.then_some(true), *max_fix_attempts),
        Commands::Rereview { parallel, .. } => (parallel.then_some(true), None),
        _ => (None, None),
    };
    let config = BvsConfig::with_cli_args(project_dir, cli.verbose, parallel, max_fix_attempts)?;

    let success = match &cli.command {
        Commands::Schedule { tasks, json } => {
            cmd::cmd_schedule(tasks, config.scheduler_limits(), *json)?
        }
        Commands::Validate { tasks } => cmd::cmd_validate(tasks, config.scheduler_limits())?,
        Commands::Ready {
            tasks,
            completed,
            json,
        } => {
            cmd::cmd_ready(tasks, completed, *json)?;
            true
        }
        Commands::Gate { section, json, .. } => cmd::cmd_gate(&config, section, *json).await?,
        Commands::Rereview {
            section,
            previous,
            max_iterations,
            json,
            ..
        } => {
            cmd::cmd_rereview(
                &config,
                section,
                previous.as_deref(),
                *max_iterations,
                *json,
            )
            .await?
        }
        Commands::Config { command } => cmd::cmd_config(&config, command.clone())?,
    };

    if !success {
        std::process::exit(1);
    }
    Ok(())
}
