// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! # Arena CLI
//!
//! The `arena` binary hosts the battle orchestration engine.
//!
//! ## Commands
//!
//! - `arena serve` - HTTP API with SSE spectator streams
//! - `arena run <battle.yaml>` - run one battle in-process and print it
//! - `arena config show|validate|generate` - Configuration management

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::info;

use arena_core::domain::config::ArenaConfig;
use arena_orchestrator::commands::{self, run::RunArgs, ConfigCommand};
use arena_orchestrator::logging::init_logging;

/// Agent Arena - orchestrate multi-agent battles
#[derive(Parser)]
#[command(name = "arena")]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Path to configuration file (overrides discovery)
    #[arg(
        short,
        long,
        global = true,
        env = "ARENA_CONFIG_PATH",
        value_name = "FILE"
    )]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error); defaults to the configured level
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// Log format (text, json); defaults to the configured format
    #[arg(long, global = true)]
    log_format: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP API server
    #[command(name = "serve")]
    Serve {
        /// Bind address (overrides server.bind_address)
        #[arg(long)]
        host: Option<String>,

        /// Port (overrides server.port)
        #[arg(long)]
        port: Option<u16>,
    },

    /// Run a single battle from a YAML definition
    #[command(name = "run")]
    Run(RunArgs),

    /// Configuration management
    #[command(name = "config")]
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // A missing .env is fine
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    match cli.command {
        Commands::Serve { host, port } => {
            let config = ArenaConfig::load_or_default(cli.config)
                .context("Failed to load configuration")?;
            init_logging(
                cli.log_level.as_deref().unwrap_or(&config.logging.level),
                cli.log_format.as_deref().unwrap_or(&config.logging.format),
            )?;
            info!("Starting arena server");
            commands::serve::start_server(config, host, port).await
        }
        Commands::Run(args) => {
            init_logging(
                cli.log_level.as_deref().unwrap_or("warn"),
                cli.log_format.as_deref().unwrap_or("text"),
            )?;
            commands::run::execute(args, cli.config).await
        }
        Commands::Config { command } => {
            init_logging(
                cli.log_level.as_deref().unwrap_or("warn"),
                cli.log_format.as_deref().unwrap_or("text"),
            )?;
            commands::config::handle_command(command, cli.config).await
        }
    }
}
