// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Arena Registry
//!
//! Process-wide directory of live battles and the entry point the
//! surrounding application uses to create and look them up. A battle is
//! registered in `Pending` and is not started here, so callers can attach
//! spectators before the first turn fires. Battles remove themselves on
//! reaching a terminal state; there is no public removal.

use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::info;

use crate::application::battle::{Battle, BattleContext};
use crate::domain::agent::Agent;
use crate::domain::battle::{BattleConfig, BattleError, BattleId, BattleSnapshot};
use crate::domain::config::{LimitsConfig, SchedulerConfig};
use crate::domain::events::ArenaEvent;
use crate::infrastructure::broadcaster::SpectatorBroadcaster;
use crate::infrastructure::event_bus::EventBus;
use crate::infrastructure::providers::ProviderRegistry;

/// Live battle lookup table, shared between the registry and its battles.
#[derive(Default)]
pub struct Directory {
    battles: RwLock<HashMap<BattleId, Arc<Battle>>>,
}

impl Directory {
    fn insert(&self, battle: Arc<Battle>) {
        self.battles.write().insert(battle.id(), battle);
    }

    fn get(&self, id: BattleId) -> Option<Arc<Battle>> {
        self.battles.read().get(&id).cloned()
    }

    fn all(&self) -> Vec<Arc<Battle>> {
        self.battles.read().values().cloned().collect()
    }

    pub(crate) fn remove(&self, id: BattleId) -> Option<Arc<Battle>> {
        self.battles.write().remove(&id)
    }
}

pub struct ArenaRegistry {
    directory: Arc<Directory>,
    providers: ProviderRegistry,
    broadcaster: Arc<SpectatorBroadcaster>,
    event_bus: EventBus,
    scheduler: SchedulerConfig,
    limits: LimitsConfig,
}

impl ArenaRegistry {
    pub fn new(
        providers: ProviderRegistry,
        broadcaster: Arc<SpectatorBroadcaster>,
        event_bus: EventBus,
        scheduler: SchedulerConfig,
        limits: LimitsConfig,
    ) -> Self {
        Self {
            directory: Arc::new(Directory::default()),
            providers,
            broadcaster,
            event_bus,
            scheduler,
            limits,
        }
    }

    /// Validate, construct and register a battle in `Pending`.
    ///
    /// Nothing is registered when validation fails.
    pub fn create(
        &self,
        agents: Vec<Agent>,
        config: BattleConfig,
    ) -> Result<Arc<Battle>, BattleError> {
        config.validate(&agents, &self.limits)?;

        let adapters = agents
            .iter()
            .map(|agent| {
                self.providers.get(&agent.provider).ok_or_else(|| {
                    BattleError::CreationInvalid(format!(
                        "agent '{}' uses unknown provider '{}'",
                        agent.id, agent.provider
                    ))
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let battle = Arc::new(Battle::new(
            agents,
            config,
            BattleContext {
                adapters,
                scheduler: self.scheduler.clone(),
                broadcaster: self.broadcaster.clone(),
                event_bus: self.event_bus.clone(),
                directory: Arc::downgrade(&self.directory),
            },
        ));

        self.broadcaster.open(battle.id());
        self.directory.insert(battle.clone());

        info!(battle_id = %battle.id(), agents = battle.agents().len(), "Battle created");
        metrics::counter!("arena_battles_created_total").increment(1);
        self.event_bus.publish(ArenaEvent::BattleCreated {
            battle_id: battle.id(),
            agents: battle.agents().iter().map(Agent::summary).collect(),
            created_at: battle.created_at(),
        });

        Ok(battle)
    }

    pub fn get(&self, id: BattleId) -> Option<Arc<Battle>> {
        self.directory.get(id)
    }

    /// Snapshots of every live battle, oldest first.
    pub fn list(&self) -> Vec<BattleSnapshot> {
        let mut snapshots: Vec<BattleSnapshot> =
            self.directory.all().iter().map(|battle| battle.snapshot()).collect();
        snapshots.sort_by_key(|snapshot| snapshot.created_at);
        snapshots
    }

    pub fn live_count(&self) -> usize {
        self.directory.battles.read().len()
    }

    pub fn broadcaster(&self) -> &Arc<SpectatorBroadcaster> {
        &self.broadcaster
    }

    pub fn event_bus(&self) -> &EventBus {
        &self.event_bus
    }

    pub fn providers(&self) -> &ProviderRegistry {
        &self.providers
    }
}
