// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Configuration management commands
//!
//! Commands: show, validate, generate

use anyhow::{Context, Result};
use clap::Subcommand;
use colored::Colorize;
use std::path::PathBuf;

use arena_core::domain::config::{ArchiveConfig, ArenaConfig};

#[derive(Subcommand)]
pub enum ConfigCommand {
    /// Show current configuration
    Show {
        /// Show config file paths checked
        #[arg(long)]
        paths: bool,
    },

    /// Validate configuration file
    Validate {
        /// Path to config file (default: discover)
        #[arg(value_name = "FILE")]
        file: Option<PathBuf>,
    },

    /// Generate sample configuration
    Generate {
        /// Output path (default: ./arena-config.yaml)
        #[arg(short, long, default_value = "./arena-config.yaml")]
        output: PathBuf,

        /// Include examples and comments
        #[arg(long)]
        examples: bool,
    },
}

pub async fn handle_command(
    command: ConfigCommand,
    config_override: Option<PathBuf>,
) -> Result<()> {
    match command {
        ConfigCommand::Show { paths } => show(config_override, paths),
        ConfigCommand::Validate { file } => validate(file.or(config_override)),
        ConfigCommand::Generate { output, examples } => generate(output, examples),
    }
}

fn show(config_override: Option<PathBuf>, show_paths: bool) -> Result<()> {
    let config = ArenaConfig::load_or_default(config_override.clone())
        .context("Failed to load configuration")?;

    if show_paths {
        println!("{}", "Configuration discovery paths:".bold());
        if let Some(path) = &config_override {
            println!("  1. --config flag: {}", path.display());
        } else {
            println!("  1. --config flag: {}", "(not set)".dimmed());
        }
        println!(
            "  2. ARENA_CONFIG_PATH: {}",
            std::env::var("ARENA_CONFIG_PATH")
                .unwrap_or_else(|_| "(not set)".to_string())
                .dimmed()
        );
        println!("  3. ./arena-config.yaml");
        println!("  4. ~/.arena/config.yaml");
        println!("  5. /etc/arena/config.yaml");
        println!();
    }

    println!("{}", "Current configuration:".bold());
    println!();

    println!("{}", "Scheduler:".bold());
    println!("  Attempts per turn: {}", config.scheduler.max_attempts);
    println!(
        "  Backoff: {}ms doubling to {}ms",
        config.scheduler.base_backoff_ms, config.scheduler.max_backoff_ms
    );
    println!("  Provider timeout: {}ms", config.scheduler.provider_timeout_ms);
    println!("  Cancel grace: {}ms", config.scheduler.cancel_grace_ms);
    println!();

    println!("{}", "Limits:".bold());
    println!("  Agents per battle: {}", config.limits.max_agents);
    println!("  Turns per battle: {}", config.limits.max_turns);
    println!("  Turn delay: up to {}ms", config.limits.max_turn_delay_ms);
    println!();

    println!("{}", "Providers:".bold());
    if config.providers.is_empty() {
        println!("  {}", "(none configured)".dimmed());
    }
    for provider in &config.providers {
        let status = if provider.enabled {
            "enabled".green()
        } else {
            "disabled".dimmed()
        };
        println!("  {} ({}) {}", provider.name.bold(), provider.provider_type, status);
        if !provider.replies.is_empty() {
            println!("    Replies: {}", provider.replies.len());
        }
    }
    println!();

    println!("{}", "Archive:".bold());
    match &config.archive {
        ArchiveConfig::Memory => println!("  Backend: memory"),
        ArchiveConfig::Directory { path } => {
            println!("  Backend: directory ({})", path.display())
        }
    }
    println!();

    println!("{}", "Server:".bold());
    println!(
        "  Listen: {}:{}",
        config.server.bind_address, config.server.port
    );
    println!(
        "  Metrics: {}",
        if config.metrics.enabled {
            format!("port {}", config.metrics.port)
        } else {
            "disabled".to_string()
        }
    );
    println!(
        "  Logging: {} ({})",
        config.logging.level, config.logging.format
    );

    Ok(())
}

fn validate(config_path: Option<PathBuf>) -> Result<()> {
    println!("Validating configuration...");

    // load_or_default runs validation after env overrides are applied
    ArenaConfig::load_or_default(config_path).context("Configuration validation failed")?;

    println!("{}", "✓ Configuration is valid".green());

    Ok(())
}

fn generate(output: PathBuf, with_examples: bool) -> Result<()> {
    let sample = if with_examples {
        include_str!("../../templates/config-with-examples.yaml")
    } else {
        include_str!("../../templates/config-minimal.yaml")
    };

    std::fs::write(&output, sample)
        .with_context(|| format!("Failed to write config to {:?}", output))?;

    println!(
        "{}",
        format!("✓ Configuration generated: {}", output.display()).green()
    );

    Ok(())
}

#[cfg(test)]
mod tests {
    #[test]
    fn test_templates_parse() {
        for template in [
            include_str!("../../templates/config-minimal.yaml"),
            include_str!("../../templates/config-with-examples.yaml"),
        ] {
            let config = arena_core::domain::config::ArenaConfig::from_yaml_str(template).unwrap();
            assert!(config.validate().is_ok());
            assert!(!config.providers.is_empty());
        }
    }
}
