//! CLI entry and dispatch.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use ttop_core::config::Config;

mod commands;

#[derive(Parser)]
#[command(name = "ttop")]
#[command(version = "0.1")]
#[command(about = "Live thread/resource monitor with a terminal dashboard")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    #[command(flatten)]
    run_args: RunArgs,
}

/// Options for the `run` command (also accepted at the top level, since
/// running the dashboard is the default).
#[derive(clap::Args, Debug, Clone, Default)]
struct RunArgs {
    /// Process to monitor (default: ttop's own process)
    #[arg(long, value_name = "PID")]
    pid: Option<i32>,

    /// Sampling interval in milliseconds
    #[arg(long, value_name = "MS")]
    interval_ms: Option<u64>,

    /// Append diagnostics to this file (the dashboard owns the terminal)
    #[arg(long, value_name = "PATH")]
    log_file: Option<PathBuf>,
}

impl RunArgs {
    /// CLI flags override config values. The interval is clamped to at
    /// least 1ms; a zero period would panic the sampling task's timer.
    fn merged(self, config: Config) -> commands::run::RunOptions {
        commands::run::RunOptions {
            pid: self.pid.or(config.pid),
            interval: Duration::from_millis(
                self.interval_ms.unwrap_or(config.interval_ms).max(1),
            ),
            log_file: self.log_file.or(config.log_file),
        }
    }
}

#[derive(clap::Subcommand)]
enum Commands {
    /// Run the dashboard until Ctrl+C (default)
    Run {
        #[command(flatten)]
        args: RunArgs,
    },
    /// Config file management
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(clap::Subcommand)]
enum ConfigCommands {
    /// Show the path to the config file
    Path,
    /// Initialize a default config file (if not present)
    Init,
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();
    let config = Config::load().context("load config")?;

    match cli.command {
        Some(Commands::Config { command }) => match command {
            ConfigCommands::Path => {
                commands::config::path();
                Ok(())
            }
            ConfigCommands::Init => commands::config::init(),
        },
        Some(Commands::Run { args }) => commands::run::run(args.merged(config)),
        // default to the dashboard
        None => commands::run::run(cli.run_args.merged(config)),
    }
}
