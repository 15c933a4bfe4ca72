// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Agent
//!
//! A configured battle participant: identity, persona ("soul"), injected
//! memory ("brain"), provider/model selection and an optional opening prompt.
//! Agents are immutable once a battle has been created from them.
//!
//! # Architecture
//!
//! - **Layer:** Domain Layer
//! - **Purpose:** Participant configuration and its public summary

use serde::{Deserialize, Serialize};

/// A configured conversational participant bound to a model provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Agent {
    /// Identifier, unique within a battle.
    pub id: String,

    pub display_name: String,

    /// Name of a registered provider adapter (e.g. "openai", "scripted").
    pub provider: String,

    /// Provider-side model identifier.
    pub model: String,

    /// Persona / standing instructions.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub soul: Option<String>,

    /// Injected memory payload.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub brain: Option<String>,

    /// Private opening instruction, used when the battle runs in per-agent prompt mode.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub opening_prompt: Option<String>,

    /// Hide this agent's identity from the other participants (not from spectators).
    #[serde(default)]
    pub anonymous: bool,

    /// Provider credential override. Never serialized back out.
    #[serde(default, skip_serializing)]
    pub credential_override: Option<String>,
}

impl Agent {
    pub fn new(
        id: impl Into<String>,
        display_name: impl Into<String>,
        provider: impl Into<String>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            display_name: display_name.into(),
            provider: provider.into(),
            model: model.into(),
            soul: None,
            brain: None,
            opening_prompt: None,
            anonymous: false,
            credential_override: None,
        }
    }

    pub fn with_soul(mut self, soul: impl Into<String>) -> Self {
        self.soul = Some(soul.into());
        self
    }

    pub fn with_brain(mut self, brain: impl Into<String>) -> Self {
        self.brain = Some(brain.into());
        self
    }

    pub fn with_opening_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.opening_prompt = Some(prompt.into());
        self
    }

    pub fn anonymous(mut self) -> Self {
        self.anonymous = true;
        self
    }

    pub fn summary(&self) -> AgentSummary {
        AgentSummary {
            id: self.id.clone(),
            display_name: self.display_name.clone(),
            provider: self.provider.clone(),
            model: self.model.clone(),
            anonymous: self.anonymous,
        }
    }
}

/// Public view of an [`Agent`], safe to hand to spectators and archives.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentSummary {
    pub id: String,
    pub display_name: String,
    pub provider: String,
    pub model: String,
    pub anonymous: bool,
}
