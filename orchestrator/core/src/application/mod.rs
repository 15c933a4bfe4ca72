// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

pub mod archive_recorder;
pub mod battle;
pub mod prompt;
pub mod registry;
pub mod scheduler;

pub use archive_recorder::ArchiveRecorder;
pub use battle::Battle;
pub use registry::ArenaRegistry;
