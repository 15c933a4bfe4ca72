// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Command implementations for the arena CLI

pub mod config;
pub mod run;
pub mod serve;

pub use self::config::ConfigCommand;

use anyhow::{Context, Result};
use std::sync::Arc;

use arena_core::application::ArenaRegistry;
use arena_core::domain::archive::ArchiveStore;
use arena_core::domain::config::{ArchiveConfig, ArenaConfig};
use arena_core::infrastructure::archive::{FileArchiveStore, InMemoryArchiveStore};
use arena_core::infrastructure::broadcaster::SpectatorBroadcaster;
use arena_core::infrastructure::event_bus::EventBus;
use arena_core::infrastructure::providers::ProviderRegistry;

/// Wire a registry from configuration.
pub fn build_registry(config: &ArenaConfig, providers: ProviderRegistry) -> ArenaRegistry {
    ArenaRegistry::new(
        providers,
        Arc::new(SpectatorBroadcaster::new(config.spectators.clone())),
        EventBus::with_default_capacity(),
        config.scheduler.clone(),
        config.limits.clone(),
    )
}

pub async fn open_archive(config: &ArchiveConfig) -> Result<Arc<dyn ArchiveStore>> {
    match config {
        ArchiveConfig::Memory => Ok(Arc::new(InMemoryArchiveStore::new())),
        ArchiveConfig::Directory { path } => {
            let store = FileArchiveStore::open(path)
                .await
                .with_context(|| format!("Failed to open archive directory {:?}", path))?;
            Ok(Arc::new(store))
        }
    }
}
