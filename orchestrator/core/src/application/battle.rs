// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Battle - the per-conversation state machine
//!
//! ```text
//! Pending ──start──▶ Running ◀──resume── Paused
//!                       │  └────pause────▶  │
//!                       ▼                   ▼
//!           Completed | Cancelled | Failed (terminal)
//! ```
//!
//! All mutable state lives behind one short-held lock. Every state
//! transition and every committed turn is published to the spectator
//! broadcaster while that lock is held, so spectators observe exactly the
//! order in which the battle changed and never see a turn after a terminal
//! state event. Publishing never awaits.
//!
//! The transcript has a single writer, the battle's own scheduler task.

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::sync::{Arc, Weak};
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::application::registry::Directory;
use crate::application::scheduler;
use crate::domain::agent::Agent;
use crate::domain::battle::{BattleConfig, BattleError, BattleId, BattleSnapshot, BattleState, Turn};
use crate::domain::config::SchedulerConfig;
use crate::domain::events::{ArenaEvent, BattleEvent};
use crate::domain::provider::ProviderAdapter;
use crate::infrastructure::broadcaster::SpectatorBroadcaster;
use crate::infrastructure::event_bus::EventBus;

/// Collaborators a battle needs at runtime; shared with its scheduler.
pub(crate) struct BattleContext {
    pub adapters: Vec<Arc<dyn ProviderAdapter>>,
    pub scheduler: SchedulerConfig,
    pub broadcaster: Arc<SpectatorBroadcaster>,
    pub event_bus: EventBus,
    pub directory: Weak<Directory>,
}

struct BattleInner {
    state: BattleState,
    transcript: Vec<Turn>,
    started_at: Option<DateTime<Utc>>,
    finished_at: Option<DateTime<Utc>>,
    failure_reason: Option<String>,
}

/// Result of handing a finished provider response to the battle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Commit {
    /// Appended; the battle keeps going.
    Recorded(u32),
    /// Appended and it was the last one.
    Final(u32),
    /// The battle reached a terminal state while the call was in flight.
    Discarded,
}

pub struct Battle {
    id: BattleId,
    agents: Vec<Agent>,
    config: BattleConfig,
    created_at: DateTime<Utc>,
    inner: Mutex<BattleInner>,
    state_tx: watch::Sender<BattleState>,
    cancel: CancellationToken,
    ctx: BattleContext,
}

impl Battle {
    pub(crate) fn new(agents: Vec<Agent>, config: BattleConfig, ctx: BattleContext) -> Self {
        let (state_tx, _) = watch::channel(BattleState::Pending);
        Self {
            id: BattleId::new(),
            agents,
            config,
            created_at: Utc::now(),
            inner: Mutex::new(BattleInner {
                state: BattleState::Pending,
                transcript: Vec::new(),
                started_at: None,
                finished_at: None,
                failure_reason: None,
            }),
            state_tx,
            cancel: CancellationToken::new(),
            ctx,
        }
    }

    pub fn id(&self) -> BattleId {
        self.id
    }

    pub fn agents(&self) -> &[Agent] {
        &self.agents
    }

    pub fn config(&self) -> &BattleConfig {
        &self.config
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn state(&self) -> BattleState {
        self.inner.lock().state
    }

    pub fn turn_count(&self) -> u32 {
        self.inner.lock().transcript.len() as u32
    }

    /// Consistent point-in-time view.
    pub fn snapshot(&self) -> BattleSnapshot {
        let inner = self.inner.lock();
        BattleSnapshot {
            id: self.id,
            state: inner.state,
            agents: self.agents.iter().map(Agent::summary).collect(),
            transcript: inner.transcript.clone(),
            config: self.config.clone(),
            created_at: self.created_at,
            started_at: inner.started_at,
            finished_at: inner.finished_at,
            failure_reason: inner.failure_reason.clone(),
        }
    }

    /// Watch lifecycle changes without going through the spectator stream.
    pub fn subscribe_state(&self) -> watch::Receiver<BattleState> {
        self.state_tx.subscribe()
    }

    /// Wait until the battle reaches a terminal state and return it.
    pub async fn wait_finished(&self) -> BattleState {
        let mut rx = self.state_tx.subscribe();
        let result = match rx.wait_for(|state| state.is_terminal()).await {
            Ok(state) => *state,
            Err(_) => self.state(),
        };
        result
    }

    /// `Pending → Running`, then hand the loop to a scheduler task.
    ///
    /// Must be called from within a Tokio runtime: the scheduler is spawned
    /// with `tokio::spawn`, which panics outside one.
    pub fn start(self: &Arc<Self>) -> Result<(), BattleError> {
        {
            let mut inner = self.inner.lock();
            if inner.state != BattleState::Pending {
                return Err(BattleError::AlreadyStarted(inner.state));
            }
            inner.started_at = Some(Utc::now());
            self.transition(&mut inner, BattleState::Running, None);
        }

        tokio::spawn(scheduler::run(Arc::clone(self)));
        Ok(())
    }

    /// `Running → Paused`. An in-flight provider call is allowed to finish
    /// and its turn is still recorded.
    pub fn pause(&self) -> bool {
        let mut inner = self.inner.lock();
        if inner.state != BattleState::Running {
            return false;
        }
        self.transition(&mut inner, BattleState::Paused, None);
        true
    }

    /// `Paused → Running`; the scheduler continues from the next turn index.
    pub fn resume(&self) -> bool {
        let mut inner = self.inner.lock();
        if inner.state != BattleState::Paused {
            return false;
        }
        self.transition(&mut inner, BattleState::Running, None);
        true
    }

    /// Any non-terminal state `→ Cancelled`. Signals the in-flight provider
    /// call; a response that still arrives afterwards is discarded.
    pub fn cancel(&self) -> bool {
        {
            let mut inner = self.inner.lock();
            if inner.state.is_terminal() {
                return false;
            }
            self.transition(&mut inner, BattleState::Cancelled, None);
        }
        self.cancel.cancel();
        self.finish();
        true
    }

    pub(crate) fn context(&self) -> &BattleContext {
        &self.ctx
    }

    pub(crate) fn cancellation(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Wait until turns may be produced. Returns the next turn index, or
    /// `None` once the battle is over.
    pub(crate) async fn next_turn(&self) -> Option<u32> {
        let mut rx = self.state_tx.subscribe();
        if rx.wait_for(|state| *state != BattleState::Paused).await.is_err() {
            return None;
        }

        let inner = self.inner.lock();
        match inner.state {
            BattleState::Running => {
                let index = inner.transcript.len() as u32;
                (index < self.config.max_turns).then_some(index)
            }
            _ => None,
        }
    }

    /// Transcript copy for prompt construction.
    pub(crate) fn transcript(&self) -> Vec<Turn> {
        self.inner.lock().transcript.clone()
    }

    /// Append the response for turn `index` and broadcast it. Completes the
    /// battle when the configured maximum is reached.
    pub(crate) fn commit_turn(&self, index: u32, content: String) -> Commit {
        let outcome = {
            let mut inner = self.inner.lock();
            if !inner.state.accepts_turns() || inner.transcript.len() as u32 != index {
                return Commit::Discarded;
            }

            let speaker = &self.agents[index as usize % self.agents.len()];
            let turn = Turn::new(index, speaker.id.clone(), content);
            debug!(battle_id = %self.id, turn = index, agent_id = %speaker.id, words = turn.word_count, "Turn recorded");

            inner.transcript.push(turn.clone());
            self.ctx.broadcaster.publish(&BattleEvent::Turn {
                battle_id: self.id,
                turn,
            });
            metrics::counter!("arena_turns_recorded_total").increment(1);

            if inner.transcript.len() as u32 >= self.config.max_turns {
                self.transition(&mut inner, BattleState::Completed, None);
                Commit::Final(index)
            } else {
                Commit::Recorded(index)
            }
        };

        if outcome == Commit::Final(index) {
            self.finish();
        }
        outcome
    }

    /// Terminate with `Failed`, keeping the transcript as produced.
    pub(crate) fn fail(&self, reason: String) -> bool {
        {
            let mut inner = self.inner.lock();
            if inner.state.is_terminal() {
                return false;
            }
            inner.failure_reason = Some(reason.clone());
            self.transition(&mut inner, BattleState::Failed, Some(reason));
        }
        self.finish();
        true
    }

    fn transition(&self, inner: &mut BattleInner, to: BattleState, reason: Option<String>) {
        let from = inner.state;
        let at = Utc::now();
        inner.state = to;
        if to.is_terminal() {
            inner.finished_at = Some(at);
        }

        info!(battle_id = %self.id, from = %from, to = %to, "Battle state changed");

        self.ctx.broadcaster.publish(&BattleEvent::State {
            battle_id: self.id,
            from,
            to,
            reason,
            at,
        });
        self.state_tx.send_replace(to);
        self.ctx.event_bus.publish(ArenaEvent::BattleStateChanged {
            battle_id: self.id,
            from,
            to,
            changed_at: at,
        });
    }

    /// Runs once, right after the terminal transition, outside the lock.
    fn finish(&self) {
        if let Some(directory) = self.ctx.directory.upgrade() {
            directory.remove(self.id);
        }
        self.ctx.broadcaster.close(self.id);

        let snapshot = self.snapshot();
        metrics::counter!("arena_battles_finished_total", "state" => snapshot.state.as_str())
            .increment(1);
        info!(
            battle_id = %self.id,
            state = %snapshot.state,
            turns = snapshot.transcript.len(),
            "Battle finished"
        );
        self.ctx
            .event_bus
            .publish(ArenaEvent::BattleFinished { snapshot });
    }
}

impl std::fmt::Debug for Battle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Battle")
            .field("id", &self.id)
            .field("state", &self.state())
            .field("agents", &self.agents.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::broadcaster::ChannelSink;
    use crate::infrastructure::providers::ScriptedProvider;

    fn battle(max_turns: u32) -> (Battle, Arc<SpectatorBroadcaster>) {
        let broadcaster = Arc::new(SpectatorBroadcaster::default());
        let adapter: Arc<dyn ProviderAdapter> = Arc::new(ScriptedProvider::new(vec![]));
        let battle = Battle::new(
            vec![
                Agent::new("a", "Ada", "scripted", "m"),
                Agent::new("b", "Bob", "scripted", "m"),
            ],
            BattleConfig::new(max_turns),
            BattleContext {
                adapters: vec![adapter.clone(), adapter],
                scheduler: SchedulerConfig::default(),
                broadcaster: broadcaster.clone(),
                event_bus: EventBus::new(16),
                directory: Weak::new(),
            },
        );
        broadcaster.open(battle.id());
        (battle, broadcaster)
    }

    #[test]
    #[should_panic(expected = "Tokio")]
    fn test_start_requires_a_tokio_runtime() {
        let (battle, _) = battle(2);
        let _ = Arc::new(battle).start();
    }

    #[test]
    fn test_pause_and_resume_are_conditional() {
        let (battle, _) = battle(4);
        assert!(!battle.pause());
        assert!(!battle.resume());

        battle.inner.lock().state = BattleState::Running;
        assert!(battle.pause());
        assert!(!battle.pause());
        assert_eq!(battle.state(), BattleState::Paused);
        assert!(battle.resume());
        assert!(!battle.resume());
        assert_eq!(battle.state(), BattleState::Running);
    }

    #[test]
    fn test_cancel_is_terminal_and_idempotent() {
        let (battle, _) = battle(4);
        assert!(battle.cancel());
        assert!(!battle.cancel());
        assert!(!battle.pause());
        assert_eq!(battle.state(), BattleState::Cancelled);
        assert!(battle.cancellation().is_cancelled());
        assert!(battle.snapshot().finished_at.is_some());
    }

    #[tokio::test]
    async fn test_commit_completes_at_max_turns() {
        let (battle, broadcaster) = battle(2);
        let (sink, mut rx) = ChannelSink::new(16);
        broadcaster.attach(battle.id(), sink).unwrap();
        battle.inner.lock().state = BattleState::Running;

        assert_eq!(battle.commit_turn(0, "one".into()), Commit::Recorded(0));
        assert_eq!(battle.commit_turn(1, "two".into()), Commit::Final(1));
        assert_eq!(battle.state(), BattleState::Completed);
        assert_eq!(battle.commit_turn(2, "three".into()), Commit::Discarded);

        let snapshot = battle.snapshot();
        assert_eq!(snapshot.transcript.len(), 2);
        assert_eq!(snapshot.transcript[1].agent_id, "b");

        let mut events = Vec::new();
        while let Some(payload) = rx.recv().await {
            events.push(serde_json::from_str::<BattleEvent>(&payload).unwrap());
        }
        assert_eq!(events.len(), 3);
        assert!(matches!(events[0], BattleEvent::Turn { .. }));
        assert!(matches!(events[1], BattleEvent::Turn { .. }));
        assert!(events[2].is_terminal());
    }

    #[test]
    fn test_commit_after_cancel_is_discarded() {
        let (battle, _) = battle(4);
        battle.inner.lock().state = BattleState::Running;
        battle.cancel();
        assert_eq!(battle.commit_turn(0, "late".into()), Commit::Discarded);
        assert!(battle.snapshot().transcript.is_empty());
    }

    #[test]
    fn test_paused_battle_still_accepts_in_flight_turn() {
        let (battle, _) = battle(4);
        battle.inner.lock().state = BattleState::Running;
        battle.pause();
        assert_eq!(battle.commit_turn(0, "in flight".into()), Commit::Recorded(0));
        assert_eq!(battle.state(), BattleState::Paused);
    }

    #[test]
    fn test_fail_records_reason() {
        let (battle, _) = battle(4);
        battle.inner.lock().state = BattleState::Running;
        assert!(battle.fail("auth rejected".into()));
        assert!(!battle.fail("again".into()));

        let snapshot = battle.snapshot();
        assert_eq!(snapshot.state, BattleState::Failed);
        assert_eq!(snapshot.failure_reason.as_deref(), Some("auth rejected"));
    }
}
