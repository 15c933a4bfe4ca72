// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

pub mod archive;
pub mod broadcaster;
pub mod event_bus;
pub mod providers;

pub use archive::{FileArchiveStore, InMemoryArchiveStore};
pub use broadcaster::{BroadcastError, ChannelSink, SpectatorBroadcaster};
pub use event_bus::{EventBus, EventBusError};
