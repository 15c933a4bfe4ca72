// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Archive Store Interface
//!
//! Durable record of finished battles. The interface lives in the domain
//! layer and is implemented in `crate::infrastructure::archive`.
//!
//! | Implementation | Backend |
//! |----------------|---------|
//! | `InMemoryArchiveStore` | process memory (development, tests) |
//! | `FileArchiveStore` | one JSON document per battle in a directory |
//!
//! The engine never calls [`ArchiveStore::save`] itself: the archive
//! recorder does, after observing a `battle_finished` event, so an archival
//! failure can never block or corrupt a battle's in-memory lifecycle.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::agent::AgentSummary;
use crate::domain::battle::{BattleConfig, BattleId, BattleSnapshot, BattleState, Turn};

/// Immutable record of a battle that reached a terminal state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArchiveRecord {
    pub id: BattleId,
    pub final_state: BattleState,
    pub transcript: Vec<Turn>,
    pub agents: Vec<AgentSummary>,
    pub config: BattleConfig,
    pub created_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure_reason: Option<String>,
}

impl ArchiveRecord {
    /// Build the record from a terminal snapshot. Returns `None` for a live battle.
    pub fn from_snapshot(snapshot: BattleSnapshot) -> Option<Self> {
        if !snapshot.state.is_terminal() {
            return None;
        }
        Some(Self {
            id: snapshot.id,
            final_state: snapshot.state,
            transcript: snapshot.transcript,
            agents: snapshot.agents,
            config: snapshot.config,
            created_at: snapshot.created_at,
            completed_at: snapshot.finished_at.unwrap_or_else(Utc::now),
            failure_reason: snapshot.failure_reason,
        })
    }
}

/// Persistence contract for finished battles. Records are write-once.
#[async_trait]
pub trait ArchiveStore: Send + Sync {
    /// Store a record. Fails with `AlreadyArchived` if the id exists.
    async fn save(&self, record: ArchiveRecord) -> Result<(), ArchiveError>;

    async fn find_by_id(&self, id: BattleId) -> Result<Option<ArchiveRecord>, ArchiveError>;

    /// Most recently completed first.
    async fn list_recent(&self, limit: usize) -> Result<Vec<ArchiveRecord>, ArchiveError>;
}

#[derive(Debug, thiserror::Error)]
pub enum ArchiveError {
    #[error("Battle {0} is already archived")]
    AlreadyArchived(BattleId),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl From<std::io::Error> for ArchiveError {
    fn from(err: std::io::Error) -> Self {
        ArchiveError::Storage(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(state: BattleState) -> BattleSnapshot {
        BattleSnapshot {
            id: BattleId::new(),
            state,
            agents: vec![],
            transcript: vec![Turn::new(0, "a", "hi".to_string())],
            config: BattleConfig::new(2),
            created_at: Utc::now(),
            started_at: Some(Utc::now()),
            finished_at: Some(Utc::now()),
            failure_reason: None,
        }
    }

    #[test]
    fn test_record_requires_terminal_state() {
        assert!(ArchiveRecord::from_snapshot(snapshot(BattleState::Running)).is_none());
        assert!(ArchiveRecord::from_snapshot(snapshot(BattleState::Paused)).is_none());

        let record = ArchiveRecord::from_snapshot(snapshot(BattleState::Cancelled)).unwrap();
        assert_eq!(record.final_state, BattleState::Cancelled);
        assert_eq!(record.transcript.len(), 1);
    }
}
