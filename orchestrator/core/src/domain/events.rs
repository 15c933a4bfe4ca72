// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::agent::AgentSummary;
use crate::domain::battle::{BattleId, BattleSnapshot, BattleState, Turn};

/// Per-battle spectator stream. Turn and state events share one ordered stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BattleEvent {
    Turn {
        battle_id: BattleId,
        turn: Turn,
    },
    State {
        battle_id: BattleId,
        from: BattleState,
        to: BattleState,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        reason: Option<String>,
        at: DateTime<Utc>,
    },
}

impl BattleEvent {
    pub fn battle_id(&self) -> BattleId {
        match self {
            BattleEvent::Turn { battle_id, .. } => *battle_id,
            BattleEvent::State { battle_id, .. } => *battle_id,
        }
    }

    /// True for the state event that closes a battle's stream.
    pub fn is_terminal(&self) -> bool {
        matches!(self, BattleEvent::State { to, .. } if to.is_terminal())
    }
}

/// Process-wide lifecycle stream consumed by the surrounding application
/// (archival, monitoring).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ArenaEvent {
    BattleCreated {
        battle_id: BattleId,
        agents: Vec<AgentSummary>,
        created_at: DateTime<Utc>,
    },
    BattleStateChanged {
        battle_id: BattleId,
        from: BattleState,
        to: BattleState,
        changed_at: DateTime<Utc>,
    },
    BattleFinished {
        snapshot: BattleSnapshot,
    },
}

impl ArenaEvent {
    pub fn battle_id(&self) -> BattleId {
        match self {
            ArenaEvent::BattleCreated { battle_id, .. } => *battle_id,
            ArenaEvent::BattleStateChanged { battle_id, .. } => *battle_id,
            ArenaEvent::BattleFinished { snapshot } => snapshot.id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_battle_event_is_internally_tagged() {
        let battle_id = BattleId::new();
        let event = BattleEvent::Turn {
            battle_id,
            turn: Turn::new(0, "a", "hello there".to_string()),
        };
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["type"], "turn");
        assert_eq!(value["turn"]["agentId"], "a");
        assert_eq!(value["turn"]["wordCount"], 2);

        let event = BattleEvent::State {
            battle_id,
            from: BattleState::Running,
            to: BattleState::Paused,
            reason: None,
            at: Utc::now(),
        };
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["type"], "state");
        assert_eq!(value["to"], "paused");
        assert!(value.get("reason").is_none());
    }

    #[test]
    fn test_terminal_detection() {
        let battle_id = BattleId::new();
        let paused = BattleEvent::State {
            battle_id,
            from: BattleState::Running,
            to: BattleState::Paused,
            reason: None,
            at: Utc::now(),
        };
        let failed = BattleEvent::State {
            battle_id,
            from: BattleState::Running,
            to: BattleState::Failed,
            reason: Some("auth".to_string()),
            at: Utc::now(),
        };
        assert!(!paused.is_terminal());
        assert!(failed.is_terminal());
        assert_eq!(failed.battle_id(), battle_id);
    }
}
