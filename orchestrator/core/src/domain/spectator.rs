// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Identity of a spectator connection; attach/detach are keyed on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SinkId(pub Uuid);

impl SinkId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SinkId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SinkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// A push-capable connection supplied by the transport layer.
///
/// The engine only needs "accepts a serialized event, may fail".
#[async_trait]
pub trait SpectatorSink: Send + Sync {
    fn id(&self) -> SinkId;

    async fn deliver(&self, payload: &str) -> Result<(), SinkError>;
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SinkError {
    #[error("Spectator connection closed")]
    Closed,

    #[error("Spectator delivery timed out")]
    Timeout,

    #[error("Spectator I/O error: {0}")]
    Io(String),
}
