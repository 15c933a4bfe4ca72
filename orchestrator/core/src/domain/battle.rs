// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Battle Domain Types
//!
//! Value types shared by the battle state machine, the turn scheduler and the
//! spectator stream.
//!
//! ## Lifecycle
//!
//! ```text
//! Pending ──start──▶ Running ◀──resume── Paused
//!                       │ ──pause──▶ ───┘  │
//!                       ▼                  ▼
//!          Completed | Failed | Cancelled (terminal)
//! ```
//!
//! `Running` and `Paused` are the only states in which a turn may be
//! committed; a turn already in flight when `pause()` lands is still recorded.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use thiserror::Error;
use uuid::Uuid;

use crate::domain::agent::{Agent, AgentSummary};
use crate::domain::config::LimitsConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BattleId(pub Uuid);

impl BattleId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn from_string(s: &str) -> Result<Self, uuid::Error> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

impl Default for BattleId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for BattleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BattleState {
    Pending,
    Running,
    Paused,
    Completed,
    Cancelled,
    Failed,
}

impl BattleState {
    /// `Completed`, `Cancelled` and `Failed` are final.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled | Self::Failed)
    }

    /// States in which a finished provider call may still be committed as a turn.
    pub fn accepts_turns(self) -> bool {
        matches!(self, Self::Running | Self::Paused)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::Paused => "paused",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for BattleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How the opening prompt reaches the agents. The two modes are exclusive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(tag = "mode", rename_all = "camelCase")]
pub enum PromptMode {
    /// One opening prompt visible to every agent.
    Shared { prompt: String },

    /// Each agent receives only its own `opening_prompt`.
    #[default]
    PerAgent,
}

/// Stopping and prompting configuration for a single battle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BattleConfig {
    pub max_turns: u32,

    #[serde(default)]
    pub turn_delay_ms: u64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_words_per_turn: Option<u32>,

    #[serde(default)]
    pub prompt_mode: PromptMode,

    /// Redact every agent's identity from the other agents.
    #[serde(default)]
    pub anonymous: bool,
}

impl BattleConfig {
    pub fn new(max_turns: u32) -> Self {
        Self {
            max_turns,
            turn_delay_ms: 0,
            max_words_per_turn: None,
            prompt_mode: PromptMode::PerAgent,
            anonymous: false,
        }
    }

    /// Check the configuration and the agent roster against the arena limits.
    ///
    /// Provider availability is checked separately by the registry, which is
    /// the only place that knows which adapters exist.
    pub fn validate(&self, agents: &[Agent], limits: &LimitsConfig) -> Result<(), BattleError> {
        if agents.len() < 2 {
            return Err(BattleError::CreationInvalid(format!(
                "a battle needs at least 2 agents, got {}",
                agents.len()
            )));
        }
        if agents.len() > limits.max_agents {
            return Err(BattleError::CreationInvalid(format!(
                "a battle accepts at most {} agents, got {}",
                limits.max_agents,
                agents.len()
            )));
        }

        let mut seen = HashSet::new();
        for agent in agents {
            if agent.id.trim().is_empty() {
                return Err(BattleError::CreationInvalid(
                    "agent identifier must not be empty".to_string(),
                ));
            }
            if !seen.insert(agent.id.as_str()) {
                return Err(BattleError::CreationInvalid(format!(
                    "duplicate agent identifier '{}'",
                    agent.id
                )));
            }
        }

        if self.max_turns == 0 || self.max_turns > limits.max_turns {
            return Err(BattleError::CreationInvalid(format!(
                "maxTurns must be between 1 and {}, got {}",
                limits.max_turns, self.max_turns
            )));
        }
        if self.max_words_per_turn == Some(0) {
            return Err(BattleError::CreationInvalid(
                "maxWordsPerTurn must be at least 1 when set".to_string(),
            ));
        }
        if self.turn_delay_ms > limits.max_turn_delay_ms {
            return Err(BattleError::CreationInvalid(format!(
                "turnDelayMs must not exceed {}, got {}",
                limits.max_turn_delay_ms, self.turn_delay_ms
            )));
        }
        if let PromptMode::Shared { prompt } = &self.prompt_mode {
            if prompt.trim().is_empty() {
                return Err(BattleError::CreationInvalid(
                    "shared prompt mode requires a non-empty prompt".to_string(),
                ));
            }
        }

        Ok(())
    }
}

/// One agent's single contribution to the transcript. Append-only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Turn {
    /// 0-based, contiguous within a battle.
    pub index: u32,
    pub agent_id: String,
    pub content: String,
    pub timestamp: DateTime<Utc>,
    pub word_count: u32,
}

impl Turn {
    pub fn new(index: u32, agent_id: impl Into<String>, content: String) -> Self {
        let word_count = count_words(&content);
        Self {
            index,
            agent_id: agent_id.into(),
            content,
            timestamp: Utc::now(),
            word_count,
        }
    }
}

pub fn count_words(text: &str) -> u32 {
    text.split_whitespace().count() as u32
}

/// Consistent point-in-time view of a battle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BattleSnapshot {
    pub id: BattleId,
    pub state: BattleState,
    pub agents: Vec<AgentSummary>,
    pub transcript: Vec<Turn>,
    pub config: BattleConfig,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,
    /// Set when the battle ended in `Failed`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure_reason: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BattleError {
    #[error("Invalid battle: {0}")]
    CreationInvalid(String),

    #[error("Battle already started (state: {0})")]
    AlreadyStarted(BattleState),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn agents(n: usize) -> Vec<Agent> {
        (0..n)
            .map(|i| Agent::new(format!("agent-{i}"), format!("Agent {i}"), "scripted", "m"))
            .collect()
    }

    #[test]
    fn test_state_classification() {
        assert!(BattleState::Completed.is_terminal());
        assert!(BattleState::Cancelled.is_terminal());
        assert!(BattleState::Failed.is_terminal());
        assert!(!BattleState::Paused.is_terminal());

        assert!(BattleState::Running.accepts_turns());
        assert!(BattleState::Paused.accepts_turns());
        assert!(!BattleState::Pending.accepts_turns());
        assert!(!BattleState::Cancelled.accepts_turns());
    }

    #[test]
    fn test_single_agent_is_rejected() {
        let err = BattleConfig::new(4)
            .validate(&agents(1), &LimitsConfig::default())
            .unwrap_err();
        assert!(matches!(err, BattleError::CreationInvalid(_)));
    }

    #[test]
    fn test_duplicate_and_empty_identifiers_are_rejected() {
        let mut roster = agents(2);
        roster[1].id = roster[0].id.clone();
        assert!(BattleConfig::new(4).validate(&roster, &LimitsConfig::default()).is_err());

        let mut roster = agents(2);
        roster[0].id = "  ".to_string();
        assert!(BattleConfig::new(4).validate(&roster, &LimitsConfig::default()).is_err());
    }

    #[test]
    fn test_malformed_config_is_rejected() {
        let limits = LimitsConfig::default();
        assert!(BattleConfig::new(0).validate(&agents(2), &limits).is_err());
        assert!(BattleConfig::new(limits.max_turns + 1).validate(&agents(2), &limits).is_err());

        let mut config = BattleConfig::new(4);
        config.max_words_per_turn = Some(0);
        assert!(config.validate(&agents(2), &limits).is_err());

        let mut config = BattleConfig::new(4);
        config.prompt_mode = PromptMode::Shared { prompt: " ".to_string() };
        assert!(config.validate(&agents(2), &limits).is_err());

        let mut config = BattleConfig::new(4);
        config.turn_delay_ms = limits.max_turn_delay_ms + 1;
        assert!(config.validate(&agents(2), &limits).is_err());
    }

    #[test]
    fn test_valid_config_passes() {
        let mut config = BattleConfig::new(5);
        config.max_words_per_turn = Some(50);
        config.prompt_mode = PromptMode::Shared { prompt: "Debate tabs vs spaces".to_string() };
        assert!(config.validate(&agents(3), &LimitsConfig::default()).is_ok());
    }

    #[test]
    fn test_prompt_mode_wire_format() {
        let config: BattleConfig = serde_json::from_str(
            r#"{"maxTurns":4,"promptMode":{"mode":"shared","prompt":"hi"}}"#,
        )
        .unwrap();
        assert_eq!(config.prompt_mode, PromptMode::Shared { prompt: "hi".to_string() });
        assert_eq!(config.turn_delay_ms, 0);

        let config: BattleConfig = serde_json::from_str(r#"{"maxTurns":4}"#).unwrap();
        assert_eq!(config.prompt_mode, PromptMode::PerAgent);
    }

    #[test]
    fn test_turn_counts_words() {
        let turn = Turn::new(0, "a", "  one two\tthree\n".to_string());
        assert_eq!(turn.word_count, 3);
        assert_eq!(Turn::new(1, "b", String::new()).word_count, 0);
    }
}
