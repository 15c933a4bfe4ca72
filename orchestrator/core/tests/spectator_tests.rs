// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Spectator fan-out and archival against running battles.

use arena_core::application::{ArchiveRecorder, ArenaRegistry};
use arena_core::domain::agent::Agent;
use arena_core::domain::archive::ArchiveStore;
use arena_core::domain::battle::{BattleConfig, BattleState};
use arena_core::domain::config::{LimitsConfig, SchedulerConfig, SpectatorConfig};
use arena_core::domain::events::BattleEvent;
use arena_core::domain::spectator::{SinkError, SinkId, SpectatorSink};
use arena_core::infrastructure::archive::{FileArchiveStore, InMemoryArchiveStore};
use arena_core::infrastructure::broadcaster::{ChannelSink, SpectatorBroadcaster};
use arena_core::infrastructure::event_bus::EventBus;
use arena_core::infrastructure::providers::{ProviderRegistry, ScriptedProvider};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

const PATIENCE: Duration = Duration::from_secs(30);

fn arena(bus: EventBus) -> ArenaRegistry {
    let mut providers = ProviderRegistry::new();
    providers.register(
        "scripted",
        Arc::new(ScriptedProvider::new(vec!["{agent} has the floor".into()])),
    );
    ArenaRegistry::new(
        providers,
        Arc::new(SpectatorBroadcaster::new(SpectatorConfig {
            queue_capacity: 4,
            send_timeout_ms: 200,
        })),
        bus,
        SchedulerConfig::default(),
        LimitsConfig::default(),
    )
}

fn pair() -> Vec<Agent> {
    vec![
        Agent::new("a", "Ada", "scripted", "m"),
        Agent::new("b", "Bob", "scripted", "m"),
    ]
}

async fn drain(mut rx: mpsc::Receiver<String>) -> Vec<BattleEvent> {
    let mut events = Vec::new();
    while let Ok(Some(payload)) = tokio::time::timeout(PATIENCE, rx.recv()).await {
        events.push(serde_json::from_str(&payload).unwrap());
    }
    events
}

struct BrokenSink {
    id: SinkId,
}

#[async_trait]
impl SpectatorSink for BrokenSink {
    fn id(&self) -> SinkId {
        self.id
    }

    async fn deliver(&self, _payload: &str) -> Result<(), SinkError> {
        Err(SinkError::Closed)
    }
}

struct FrozenSink {
    id: SinkId,
}

#[async_trait]
impl SpectatorSink for FrozenSink {
    fn id(&self) -> SinkId {
        self.id
    }

    async fn deliver(&self, _payload: &str) -> Result<(), SinkError> {
        futures::future::pending::<()>().await;
        Ok(())
    }
}

#[tokio::test]
async fn test_spectator_sees_ordered_stream_ending_in_terminal_state() {
    let registry = arena(EventBus::new(64));
    let mut config = BattleConfig::new(4);
    config.turn_delay_ms = 5;
    let battle = registry.create(pair(), config).unwrap();
    let (sink, rx) = ChannelSink::new(64);
    registry.broadcaster().attach(battle.id(), sink).unwrap();

    battle.start().unwrap();
    let events = drain(rx).await;

    assert_eq!(events.len(), 6);
    assert!(matches!(
        events[0],
        BattleEvent::State { from: BattleState::Pending, to: BattleState::Running, .. }
    ));
    for (offset, event) in events[1..5].iter().enumerate() {
        match event {
            BattleEvent::Turn { turn, .. } => assert_eq!(turn.index, offset as u32),
            other => panic!("expected turn, got {:?}", other),
        }
    }
    assert!(matches!(
        events[5],
        BattleEvent::State { to: BattleState::Completed, .. }
    ));
}

#[tokio::test]
async fn test_broken_and_frozen_sinks_do_not_affect_healthy_one() {
    let registry = arena(EventBus::new(64));
    let mut config = BattleConfig::new(8);
    config.turn_delay_ms = 5;
    let battle = registry.create(pair(), config).unwrap();

    let broadcaster = registry.broadcaster();
    broadcaster
        .attach(battle.id(), Arc::new(BrokenSink { id: SinkId::new() }))
        .unwrap();
    broadcaster
        .attach(battle.id(), Arc::new(FrozenSink { id: SinkId::new() }))
        .unwrap();
    let (healthy, rx) = ChannelSink::new(64);
    broadcaster.attach(battle.id(), healthy).unwrap();

    battle.start().unwrap();
    let events = drain(rx).await;

    assert_eq!(battle.wait_finished().await, BattleState::Completed);
    let turns = events
        .iter()
        .filter(|event| matches!(event, BattleEvent::Turn { .. }))
        .count();
    assert_eq!(turns, 8);
    assert!(events.last().unwrap().is_terminal());
}

#[tokio::test]
async fn test_pause_and_resume_are_visible_to_spectators() {
    let registry = arena(EventBus::new(64));
    let mut config = BattleConfig::new(2);
    config.turn_delay_ms = 50;
    let battle = registry.create(pair(), config).unwrap();
    let (sink, rx) = ChannelSink::new(64);
    registry.broadcaster().attach(battle.id(), sink).unwrap();

    battle.start().unwrap();
    assert!(battle.pause());
    assert!(battle.resume());
    let events = drain(rx).await;

    let transitions: Vec<(BattleState, BattleState)> = events
        .iter()
        .filter_map(|event| match event {
            BattleEvent::State { from, to, .. } => Some((*from, *to)),
            BattleEvent::Turn { .. } => None,
        })
        .collect();
    assert_eq!(
        transitions,
        vec![
            (BattleState::Pending, BattleState::Running),
            (BattleState::Running, BattleState::Paused),
            (BattleState::Paused, BattleState::Running),
            (BattleState::Running, BattleState::Completed),
        ]
    );
}

#[tokio::test]
async fn test_finished_battle_is_archived() {
    let bus = EventBus::new(64);
    let store = InMemoryArchiveStore::new();
    let _recorder = ArchiveRecorder::new(Arc::new(store.clone()), bus.clone()).start();
    let registry = arena(bus);

    let battle = registry.create(pair(), BattleConfig::new(4)).unwrap();
    battle.start().unwrap();
    battle.wait_finished().await;

    let mut record = None;
    for _ in 0..200 {
        record = store.find_by_id(battle.id()).await.unwrap();
        if record.is_some() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }

    let record = record.expect("battle was archived");
    assert_eq!(record.final_state, BattleState::Completed);
    assert_eq!(record.transcript.len(), 4);
    assert_eq!(record.agents.len(), 2);
}

#[tokio::test]
async fn test_cancelled_battle_is_archived_to_directory() {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(FileArchiveStore::open(dir.path()).await.unwrap());
    let bus = EventBus::new(64);
    let _recorder = ArchiveRecorder::new(store.clone(), bus.clone()).start();
    let registry = arena(bus);

    let battle = registry.create(pair(), BattleConfig::new(4)).unwrap();
    assert!(battle.cancel());

    let mut record = None;
    for _ in 0..200 {
        record = store.find_by_id(battle.id()).await.unwrap();
        if record.is_some() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }

    let record = record.expect("battle was archived");
    assert_eq!(record.final_state, BattleState::Cancelled);
    assert!(record.transcript.is_empty());
    assert!(dir.path().join(format!("{}.json", battle.id())).exists());
}
