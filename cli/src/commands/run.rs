// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! `arena run` - run a single battle in-process and print it as it happens
//!
//! Battle files are YAML:
//!
//! ```yaml
//! agents:
//!   - id: ada
//!     displayName: Ada
//!     provider: scripted
//!     model: house
//!   - id: bob
//!     displayName: Bob
//!     provider: scripted
//!     model: house
//! config:
//!   maxTurns: 6
//!   promptMode: { mode: shared, prompt: "Tabs or spaces?" }
//! ```

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

use arena_core::domain::agent::Agent;
use arena_core::domain::archive::{ArchiveRecord, ArchiveStore};
use arena_core::domain::battle::{BattleConfig, BattleSnapshot, BattleState};
use arena_core::domain::config::ArenaConfig;
use arena_core::domain::events::BattleEvent;
use arena_core::infrastructure::broadcaster::ChannelSink;
use arena_core::infrastructure::providers::{ProviderRegistry, ScriptedProvider};

use super::{build_registry, open_archive};

#[derive(Args)]
pub struct RunArgs {
    /// Battle definition (YAML)
    #[arg(value_name = "BATTLE")]
    pub file: PathBuf,

    /// Print raw JSON events instead of formatted turns
    #[arg(long)]
    pub json: bool,

    /// Write the final snapshot to this file
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Archive the finished battle to the configured archive backend
    #[arg(long)]
    pub archive: bool,
}

#[derive(Debug, Deserialize)]
pub struct BattleFile {
    pub agents: Vec<Agent>,
    pub config: BattleConfig,
}

impl BattleFile {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read battle file {:?}", path))?;
        serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse battle file {:?}", path))
    }
}

pub async fn execute(args: RunArgs, config_override: Option<PathBuf>) -> Result<()> {
    let config = ArenaConfig::load_or_default(config_override)
        .context("Failed to load configuration")?;
    let battle_file = BattleFile::load(&args.file)?;

    let mut providers = ProviderRegistry::from_config(&config.providers);
    if !providers.contains("scripted") {
        providers.register("scripted", Arc::new(ScriptedProvider::new(vec![])));
    }

    let registry = build_registry(&config, providers);
    let battle = registry
        .create(battle_file.agents, battle_file.config)
        .context("Battle rejected")?;

    let (sink, mut events) = ChannelSink::new(config.spectators.queue_capacity);
    registry.broadcaster().attach(battle.id(), sink)?;

    let names: HashMap<String, String> = battle
        .agents()
        .iter()
        .map(|agent| (agent.id.clone(), agent.display_name.clone()))
        .collect();

    info!(battle_id = %battle.id(), "Starting battle");
    battle.start()?;

    loop {
        tokio::select! {
            payload = events.recv() => {
                let Some(payload) = payload else { break };
                if args.json {
                    println!("{}", payload);
                } else {
                    print_event(&payload, &names)?;
                }
            }
            _ = tokio::signal::ctrl_c() => {
                println!("{}", "Interrupted, cancelling battle".yellow());
                battle.cancel();
            }
        }
    }

    let snapshot = battle.snapshot();
    print_summary(&snapshot);

    if let Some(output) = &args.output {
        let json = serde_json::to_string_pretty(&snapshot)?;
        std::fs::write(output, json)
            .with_context(|| format!("Failed to write snapshot to {:?}", output))?;
        println!("Snapshot written to {}", output.display());
    }

    if args.archive {
        let store = open_archive(&config.archive).await?;
        if let Some(record) = ArchiveRecord::from_snapshot(snapshot) {
            store.save(record).await.context("Failed to archive battle")?;
            println!("{}", "✓ Battle archived".green());
        }
    }

    Ok(())
}

fn print_event(payload: &str, names: &HashMap<String, String>) -> Result<()> {
    let event: BattleEvent = serde_json::from_str(payload).context("Malformed battle event")?;
    match event {
        BattleEvent::Turn { turn, .. } => {
            let name = names.get(&turn.agent_id).unwrap_or(&turn.agent_id);
            println!("{} {}", format!("[{}] {}:", turn.index, name).bold().cyan(), turn.content);
        }
        BattleEvent::State { from, to, reason, .. } => {
            let line = format!("-- {} → {}", from, to);
            match reason {
                Some(reason) => println!("{} ({})", line.dimmed(), reason.red()),
                None => println!("{}", line.dimmed()),
            }
        }
    }
    Ok(())
}

fn print_summary(snapshot: &BattleSnapshot) {
    println!();
    let state = match snapshot.state {
        BattleState::Completed => snapshot.state.as_str().green(),
        BattleState::Failed => snapshot.state.as_str().red(),
        _ => snapshot.state.as_str().yellow(),
    };
    println!("{} {} ({} turns)", "Battle".bold(), state, snapshot.transcript.len());
    if let Some(reason) = &snapshot.failure_reason {
        println!("  Reason: {}", reason);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arena_core::domain::battle::PromptMode;

    #[test]
    fn test_battle_file_parses() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("battle.yaml");
        std::fs::write(
            &path,
            r#"
agents:
  - id: ada
    displayName: Ada
    provider: scripted
    model: house
    soul: "You prefer tabs."
  - id: bob
    displayName: Bob
    provider: scripted
    model: house
    anonymous: true
config:
  maxTurns: 6
  maxWordsPerTurn: 40
  promptMode: { mode: shared, prompt: "Tabs or spaces?" }
"#,
        )
        .unwrap();

        let file = BattleFile::load(&path).unwrap();
        assert_eq!(file.agents.len(), 2);
        assert!(file.agents[1].anonymous);
        assert_eq!(file.config.max_turns, 6);
        assert_eq!(file.config.max_words_per_turn, Some(40));
        assert_eq!(
            file.config.prompt_mode,
            PromptMode::Shared {
                prompt: "Tabs or spaces?".to_string()
            }
        );
    }

    #[test]
    fn test_demo_battle_is_valid() {
        let file: BattleFile =
            serde_yaml::from_str(include_str!("../../../demos/debate.yaml")).unwrap();
        assert_eq!(file.agents.len(), 3);
        assert!(file
            .config
            .validate(&file.agents, &Default::default())
            .is_ok());
    }

    #[test]
    fn test_missing_battle_file_is_an_error() {
        assert!(BattleFile::load(Path::new("/nonexistent/battle.yaml")).is_err());
    }
}
