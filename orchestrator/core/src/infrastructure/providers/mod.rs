// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

// Provider Adapter Infrastructure
//
// The registry maps the provider names agents refer to onto adapter
// instances. Vendor adapters are supplied by the embedding application;
// the scripted adapter is built in for local runs and tests.

pub mod registry;
pub mod scripted;

pub use registry::ProviderRegistry;
pub use scripted::{ScriptStep, ScriptedProvider};
