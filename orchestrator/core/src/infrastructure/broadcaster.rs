// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

// Spectator Broadcaster - Per-battle fan-out to live observer connections
//
// Every attached sink gets its own bounded queue and a dedicated forwarder
// task. `publish` only ever does a non-blocking `try_send` per sink, so a
// slow or dead connection can neither stall the turn scheduler nor delay
// the other spectators. A sink whose queue is full, whose delivery fails,
// or whose delivery exceeds the send timeout is detached.

use async_trait::async_trait;
use dashmap::DashMap;
use std::collections::HashMap;
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::{debug, error, info, warn};

use crate::domain::battle::BattleId;
use crate::domain::config::SpectatorConfig;
use crate::domain::events::BattleEvent;
use crate::domain::spectator::{SinkError, SinkId, SpectatorSink};

type Payload = Arc<str>;
type Channels = DashMap<BattleId, HashMap<SinkId, SinkHandle>>;

struct SinkHandle {
    queue: mpsc::Sender<Payload>,
}

/// Process-wide set of spectator connections, partitioned by battle.
pub struct SpectatorBroadcaster {
    channels: Arc<Channels>,
    config: SpectatorConfig,
}

impl SpectatorBroadcaster {
    pub fn new(config: SpectatorConfig) -> Self {
        Self {
            channels: Arc::new(DashMap::new()),
            config,
        }
    }

    /// Make a battle attachable. Called by the registry at creation.
    pub fn open(&self, battle_id: BattleId) {
        self.channels.entry(battle_id).or_default();
    }

    /// Drop every sink of a battle once its terminal event is queued.
    /// Forwarders drain what is already queued and then stop.
    pub fn close(&self, battle_id: BattleId) {
        if let Some((_, sinks)) = self.channels.remove(&battle_id) {
            debug!(battle_id = %battle_id, spectators = sinks.len(), "Closed spectator channel");
        }
    }

    /// Attach a sink. Returns `Ok(false)` if it was already attached.
    ///
    /// The sink only receives events published after this call.
    pub fn attach(
        &self,
        battle_id: BattleId,
        sink: Arc<dyn SpectatorSink>,
    ) -> Result<bool, BroadcastError> {
        let sink_id = sink.id();
        let receiver = {
            let mut sinks = self
                .channels
                .get_mut(&battle_id)
                .ok_or(BroadcastError::UnknownBattle(battle_id))?;
            if sinks.contains_key(&sink_id) {
                return Ok(false);
            }
            let (queue, receiver) = mpsc::channel(self.config.queue_capacity);
            sinks.insert(sink_id, SinkHandle { queue });
            receiver
        };

        tokio::spawn(forward(
            receiver,
            sink,
            Arc::downgrade(&self.channels),
            battle_id,
            self.config.send_timeout(),
        ));

        info!(battle_id = %battle_id, sink_id = %sink_id, "Spectator attached");
        Ok(true)
    }

    /// Detach a sink. Returns `false` if it was not attached.
    pub fn detach(&self, battle_id: BattleId, sink_id: SinkId) -> bool {
        let removed = detach_from(&self.channels, battle_id, sink_id);
        if removed {
            info!(battle_id = %battle_id, sink_id = %sink_id, "Spectator detached");
        }
        removed
    }

    /// Queue an event for every sink attached to the battle.
    ///
    /// Never awaits. Returns how many sinks accepted the event.
    pub fn publish(&self, event: &BattleEvent) -> usize {
        let battle_id = event.battle_id();
        let payload: Payload = match serde_json::to_string(event) {
            Ok(json) => json.into(),
            Err(e) => {
                error!(battle_id = %battle_id, "Failed to serialize battle event: {}", e);
                return 0;
            }
        };

        let Some(mut sinks) = self.channels.get_mut(&battle_id) else {
            return 0;
        };

        let mut accepted = 0;
        sinks.retain(|sink_id, handle| match handle.queue.try_send(payload.clone()) {
            Ok(()) => {
                accepted += 1;
                true
            }
            Err(TrySendError::Full(_)) => {
                warn!(battle_id = %battle_id, sink_id = %sink_id, "Spectator queue full, detaching slow sink");
                metrics::counter!("arena_spectators_detached_total").increment(1);
                false
            }
            Err(TrySendError::Closed(_)) => false,
        });
        accepted
    }

    pub fn spectator_count(&self, battle_id: BattleId) -> usize {
        self.channels.get(&battle_id).map(|sinks| sinks.len()).unwrap_or(0)
    }

    pub fn is_open(&self, battle_id: BattleId) -> bool {
        self.channels.contains_key(&battle_id)
    }
}

impl Default for SpectatorBroadcaster {
    fn default() -> Self {
        Self::new(SpectatorConfig::default())
    }
}

fn detach_from(channels: &Channels, battle_id: BattleId, sink_id: SinkId) -> bool {
    channels
        .get_mut(&battle_id)
        .map(|mut sinks| sinks.remove(&sink_id).is_some())
        .unwrap_or(false)
}

async fn forward(
    mut receiver: mpsc::Receiver<Payload>,
    sink: Arc<dyn SpectatorSink>,
    channels: Weak<Channels>,
    battle_id: BattleId,
    send_timeout: Duration,
) {
    let sink_id = sink.id();
    while let Some(payload) = receiver.recv().await {
        let error = match tokio::time::timeout(send_timeout, sink.deliver(&payload)).await {
            Ok(Ok(())) => continue,
            Ok(Err(e)) => e,
            Err(_) => SinkError::Timeout,
        };

        warn!(battle_id = %battle_id, sink_id = %sink_id, "Spectator delivery failed, detaching: {}", error);
        metrics::counter!("arena_spectators_detached_total").increment(1);
        if let Some(channels) = channels.upgrade() {
            detach_from(&channels, battle_id, sink_id);
        }
        return;
    }
    debug!(battle_id = %battle_id, sink_id = %sink_id, "Spectator forwarder finished");
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BroadcastError {
    #[error("No live battle {0} to attach to")]
    UnknownBattle(BattleId),
}

/// Sink backed by an in-process channel; the receiving half is typically
/// turned into an SSE or WebSocket stream by the transport.
pub struct ChannelSink {
    id: SinkId,
    sender: mpsc::Sender<String>,
}

impl ChannelSink {
    pub fn new(capacity: usize) -> (Arc<Self>, mpsc::Receiver<String>) {
        let (sender, receiver) = mpsc::channel(capacity);
        (Arc::new(Self { id: SinkId::new(), sender }), receiver)
    }
}

#[async_trait]
impl SpectatorSink for ChannelSink {
    fn id(&self) -> SinkId {
        self.id
    }

    async fn deliver(&self, payload: &str) -> Result<(), SinkError> {
        self.sender
            .send(payload.to_string())
            .await
            .map_err(|_| SinkError::Closed)
    }
}
