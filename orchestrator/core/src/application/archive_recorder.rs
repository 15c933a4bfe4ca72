// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Archive Recorder Application Service
//!
//! Subscribes to the arena event bus and writes an archive record for every
//! battle that reaches a terminal state. Archival runs entirely outside the
//! battle's lifecycle: a failing store is logged and never reaches the
//! battle, its spectators or the registry.

use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::domain::archive::{ArchiveError, ArchiveRecord, ArchiveStore};
use crate::domain::events::ArenaEvent;
use crate::infrastructure::event_bus::{EventBus, EventBusError};

pub struct ArchiveRecorder {
    store: Arc<dyn ArchiveStore>,
    event_bus: EventBus,
}

impl ArchiveRecorder {
    pub fn new(store: Arc<dyn ArchiveStore>, event_bus: EventBus) -> Self {
        Self { store, event_bus }
    }

    /// Start the background task.
    ///
    /// The subscription is taken before this returns, so every battle that
    /// finishes afterwards is seen. The task ends when the bus closes.
    pub fn start(self) -> JoinHandle<()> {
        let Self { store, event_bus } = self;
        let mut receiver = event_bus.subscribe();
        drop(event_bus);
        info!("Starting archive recorder");

        tokio::spawn(async move {
            let mut archived = 0u64;
            let mut failed = 0u64;

            loop {
                match receiver.recv().await {
                    Ok(ArenaEvent::BattleFinished { snapshot }) => {
                        let battle_id = snapshot.id;
                        let Some(record) = ArchiveRecord::from_snapshot(snapshot) else {
                            warn!(battle_id = %battle_id, "Finished event carried a non-terminal snapshot");
                            continue;
                        };

                        match store.save(record).await {
                            Ok(()) => {
                                archived += 1;
                                debug!(battle_id = %battle_id, "Battle archived");
                            }
                            Err(ArchiveError::AlreadyArchived(_)) => {
                                debug!(battle_id = %battle_id, "Battle already archived");
                            }
                            Err(e) => {
                                failed += 1;
                                error!(battle_id = %battle_id, error = %e, "Failed to archive battle");
                            }
                        }
                    }
                    Ok(_) => continue,
                    Err(EventBusError::Lagged(n)) => {
                        warn!("Archive recorder lagged by {} events, some battles may not be archived", n);
                    }
                    Err(EventBusError::Closed) => break,
                    Err(e) => {
                        error!(error = ?e, "Unexpected error receiving arena event");
                    }
                }
            }

            info!(archived, failed, "Archive recorder stopped");
        })
    }
}
