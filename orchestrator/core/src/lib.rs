// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # `arena-core` - Battle Orchestration Engine
//!
//! Runs unsupervised multi-turn conversations ("battles") between two or more
//! independently configured agents and fans every state change out to live
//! spectators.
//!
//! ## Crate Layout
//!
//! | Module | Layer | Contents |
//! |--------|-------|----------|
//! | [`domain`] | Domain | `Agent`, `Turn`, `BattleState`, events, provider/sink/archive contracts |
//! | [`application`] | Application | `Battle` state machine, turn scheduler, `ArenaRegistry` |
//! | [`infrastructure`] | Infrastructure | spectator broadcaster, event bus, archive stores, providers |
//! | [`presentation`] | Presentation | axum HTTP API with SSE spectator stream |
//!
//! ## Lifecycle
//!
//! `ArenaRegistry::create` → spectators attach → `Battle::start` → turns
//! stream out → terminal state → the battle removes itself from the registry
//! and a `battle_finished` event carries the final snapshot to the archive
//! recorder.

pub mod domain;
pub mod application;
pub mod infrastructure;
pub mod presentation;

pub use domain::*;
