// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

// Event Bus Implementation - Pub/Sub for arena lifecycle events
//
// Provides in-memory event streaming using tokio broadcast channels.
// Carries battle creation, state changes and final snapshots to the
// surrounding application (archival, monitoring). Spectator traffic does
// not go through here; see broadcaster.rs.

use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, warn};

use crate::domain::battle::BattleId;
use crate::domain::events::ArenaEvent;

/// Event bus for publishing and subscribing to arena events
#[derive(Clone)]
pub struct EventBus {
    sender: Arc<broadcast::Sender<ArenaEvent>>,
}

impl EventBus {
    /// Create a new event bus with specified channel capacity
    /// Capacity determines how many events can be buffered before lagging
    /// receivers start losing the oldest ones
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self {
            sender: Arc::new(sender),
        }
    }

    /// Create event bus with default capacity (1000)
    pub fn with_default_capacity() -> Self {
        Self::new(1000)
    }

    /// Publish an event to all subscribers
    pub fn publish(&self, event: ArenaEvent) {
        debug!(battle_id = %event.battle_id(), "Publishing arena event");

        // send() only fails when nobody is subscribed
        if self.sender.send(event).is_err() {
            debug!("No subscribers listening to arena event");
        }
    }

    /// Subscribe to all arena events
    pub fn subscribe(&self) -> EventReceiver {
        EventReceiver {
            receiver: self.sender.subscribe(),
        }
    }

    /// Subscribe and filter for a single battle
    pub fn subscribe_battle(&self, battle_id: BattleId) -> BattleEventReceiver {
        BattleEventReceiver {
            receiver: self.sender.subscribe(),
            battle_id,
        }
    }

    /// Get the number of active subscribers
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::with_default_capacity()
    }
}

/// Receiver for all arena events
pub struct EventReceiver {
    receiver: broadcast::Receiver<ArenaEvent>,
}

impl EventReceiver {
    /// Receive the next event (waits until one is available)
    pub async fn recv(&mut self) -> Result<ArenaEvent, EventBusError> {
        self.receiver.recv().await.map_err(map_recv_error)
    }

    /// Try to receive an event without waiting
    pub fn try_recv(&mut self) -> Result<ArenaEvent, EventBusError> {
        self.receiver.try_recv().map_err(|e| match e {
            broadcast::error::TryRecvError::Empty => EventBusError::Empty,
            broadcast::error::TryRecvError::Closed => EventBusError::Closed,
            broadcast::error::TryRecvError::Lagged(n) => {
                warn!("Event receiver lagged by {} events", n);
                EventBusError::Lagged(n)
            }
        })
    }
}

/// Receiver for the events of one battle (filtered)
pub struct BattleEventReceiver {
    receiver: broadcast::Receiver<ArenaEvent>,
    battle_id: BattleId,
}

impl BattleEventReceiver {
    /// Receive the next event for the battle, skipping all others
    pub async fn recv(&mut self) -> Result<ArenaEvent, EventBusError> {
        loop {
            let event = self.receiver.recv().await.map_err(map_recv_error)?;
            if event.battle_id() == self.battle_id {
                return Ok(event);
            }
        }
    }
}

fn map_recv_error(e: broadcast::error::RecvError) -> EventBusError {
    match e {
        broadcast::error::RecvError::Closed => EventBusError::Closed,
        broadcast::error::RecvError::Lagged(n) => {
            warn!("Event receiver lagged by {} events", n);
            EventBusError::Lagged(n)
        }
    }
}

/// Errors that can occur when receiving events
#[derive(Debug, thiserror::Error)]
pub enum EventBusError {
    #[error("Event bus is closed")]
    Closed,

    #[error("No events available")]
    Empty,

    #[error("Receiver lagged by {0} events (events were dropped)")]
    Lagged(u64),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::battle::BattleState;
    use chrono::Utc;

    fn state_changed(battle_id: BattleId) -> ArenaEvent {
        ArenaEvent::BattleStateChanged {
            battle_id,
            from: BattleState::Pending,
            to: BattleState::Running,
            changed_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_event_bus_publish_subscribe() {
        let event_bus = EventBus::new(10);
        let mut receiver = event_bus.subscribe();
        let battle_id = BattleId::new();

        event_bus.publish(state_changed(battle_id));

        match receiver.recv().await.unwrap() {
            ArenaEvent::BattleStateChanged { battle_id: id, to, .. } => {
                assert_eq!(id, battle_id);
                assert_eq!(to, BattleState::Running);
            }
            other => panic!("Wrong event type received: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_battle_event_filtering() {
        let event_bus = EventBus::new(10);
        let battle_id = BattleId::new();
        let mut receiver = event_bus.subscribe_battle(battle_id);

        event_bus.publish(state_changed(BattleId::new()));
        event_bus.publish(state_changed(battle_id));

        let received = receiver.recv().await.unwrap();
        assert_eq!(received.battle_id(), battle_id);
    }

    #[tokio::test]
    async fn test_multiple_subscribers() {
        let event_bus = EventBus::new(10);
        let mut receiver1 = event_bus.subscribe();
        let mut receiver2 = event_bus.subscribe();
        assert_eq!(event_bus.subscriber_count(), 2);

        event_bus.publish(state_changed(BattleId::new()));

        assert!(receiver1.recv().await.is_ok());
        assert!(receiver2.recv().await.is_ok());
    }

    #[test]
    fn test_publish_without_subscribers_is_harmless() {
        let event_bus = EventBus::default();
        event_bus.publish(state_changed(BattleId::new()));

        let mut late = event_bus.subscribe();
        assert!(matches!(late.try_recv(), Err(EventBusError::Empty)));
    }
}
