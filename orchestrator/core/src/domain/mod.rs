// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Arena Domain Layer
//!
//! Pure types and capability contracts. No task spawning, no I/O.
//!
//! | Module | Key Types |
//! |--------|-----------|
//! | [`agent`] | `Agent`, `AgentSummary` |
//! | [`battle`] | `BattleId`, `BattleState`, `BattleConfig`, `Turn`, `BattleSnapshot` |
//! | [`events`] | `BattleEvent`, `ArenaEvent` |
//! | [`provider`] | `ProviderAdapter`, `ChatMessage`, `ProviderError` |
//! | [`spectator`] | `SpectatorSink`, `SinkId` |
//! | [`archive`] | `ArchiveRecord`, `ArchiveStore` |
//! | [`config`] | `ArenaConfig` |

pub mod agent;
pub mod archive;
pub mod battle;
pub mod config;
pub mod events;
pub mod provider;
pub mod spectator;
