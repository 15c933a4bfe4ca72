// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Presentation Layer (`arena-core`)
//!
//! HTTP surface that translates external requests into registry and battle
//! calls. **No business logic lives here**: lifecycle rules belong to
//! [`crate::application::Battle`].
//!
//! | Module | Transport | Description |
//! |--------|-----------|-------------|
//! | [`api`] | HTTP/SSE (Axum) | REST endpoints + Server-Sent Events spectator stream |

pub mod api;

pub use api::{app, ApiState};
