// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! # Quobyte Docker Plugin Host
//!
//! The `quobyte-docker-plugin` binary hosts the fixed-user mount watcher.
//!
//! ## Commands
//!
//! - `quobyte-docker-plugin [run]` - Watch Docker events and recreate labelled containers
//! - `quobyte-docker-plugin config show|validate|generate` - Configuration management
//!
//! The watcher only starts when `--allow-fixed-user-mounts` is given or the
//! config file enables it.

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use quobyte_docker_plugin::commands::{self, ConfigCommand, RunOverrides};
use quobyte_docker_plugin::logging::{init_logging, LogFormat};

/// Quobyte Docker plugin host
#[derive(Parser)]
#[command(name = "quobyte-docker-plugin")]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Path to configuration file (overrides discovery)
    #[arg(
        short,
        long,
        global = true,
        env = "QUOBYTE_PLUGIN_CONFIG",
        value_name = "FILE"
    )]
    config: Option<PathBuf>,

    /// Recreate containers labelled quobyte.user / quobyte.group with user-qualified mounts
    #[arg(long, global = true)]
    allow_fixed_user_mounts: bool,

    /// Docker daemon socket path (default: auto-detect)
    #[arg(long, global = true, value_name = "PATH")]
    docker_socket: Option<String>,

    /// Timeout in seconds for each Docker API call
    #[arg(long, global = true, value_name = "SECONDS")]
    api_timeout: Option<u64>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// Log output format
    #[arg(long, global = true, value_enum)]
    log_format: Option<LogFormat>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the plugin host (default)
    #[command(name = "run")]
    Run,

    /// Configuration management
    #[command(name = "config")]
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Config { command }) => {
            init_logging(
                cli.log_level.as_deref().unwrap_or("warn"),
                cli.log_format.unwrap_or(LogFormat::Text),
            )?;
            commands::config::handle_command(command, cli.config).await
        }
        Some(Commands::Run) | None => {
            let overrides = RunOverrides {
                allow_fixed_user_mounts: cli.allow_fixed_user_mounts,
                docker_socket: cli.docker_socket,
                api_timeout_seconds: cli.api_timeout,
                log_level: cli.log_level,
                log_format: cli.log_format,
            };
            commands::run::execute(cli.config, overrides).await
        }
    }
}
