// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Provider
//!
//! Uniform "given the conversation so far, produce the next message"
//! capability, one implementation per backing model provider.
//!
//! # Architecture
//!
//! - **Layer:** Domain Layer
//! - **Purpose:** Anti-corruption boundary between the scheduler and vendor APIs

// Provider Adapter Domain Interface (Anti-Corruption Layer)
//
// Concrete adapters live outside the engine; infrastructure/providers only
// ships the registry and a scripted adapter for local runs.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use crate::domain::agent::Agent;

/// Domain interface for model providers.
#[async_trait]
pub trait ProviderAdapter: Send + Sync {
    /// Produce the acting agent's next message.
    ///
    /// Implementations must return `ProviderError::Cancelled` promptly once
    /// `cancel` fires; the scheduler only waits a short grace period before
    /// abandoning the call.
    async fn generate(
        &self,
        agent: &Agent,
        messages: &[ChatMessage],
        cancel: CancellationToken,
    ) -> Result<GenerationResponse, ProviderError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    System,
    User,
    Assistant,
}

/// Role-tagged message handed to a provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self { role: ChatRole::System, content: content.into() }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self { role: ChatRole::User, content: content.into() }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self { role: ChatRole::Assistant, content: content.into() }
    }
}

#[derive(Debug, Clone)]
pub struct GenerationResponse {
    /// Generated text
    pub text: String,

    /// Token usage stats, when the provider reports them
    pub usage: Option<TokenUsage>,
}

impl GenerationResponse {
    pub fn text(text: impl Into<String>) -> Self {
        Self { text: text.into(), usage: None }
    }

    pub fn with_usage(mut self, usage: TokenUsage) -> Self {
        self.usage = Some(usage);
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TokenUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

impl TokenUsage {
    pub fn new(prompt_tokens: u32, completion_tokens: u32) -> Self {
        Self {
            prompt_tokens,
            completion_tokens,
            total_tokens: prompt_tokens.saturating_add(completion_tokens),
        }
    }
}

/// Errors that can occur during a provider call
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProviderError {
    #[error("Rate limit exceeded")]
    RateLimited,

    #[error("Authentication failed: {0}")]
    AuthInvalid(String),

    #[error("Provider call timed out")]
    Timeout,

    #[error("Provider error: {0}")]
    Provider(String),

    #[error("Provider call cancelled")]
    Cancelled,
}

impl ProviderError {
    /// Rate limits and timeouts are retried with backoff; everything else ends the turn.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::RateLimited | Self::Timeout)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_classification() {
        assert!(ProviderError::RateLimited.is_transient());
        assert!(ProviderError::Timeout.is_transient());
        assert!(!ProviderError::AuthInvalid("bad key".into()).is_transient());
        assert!(!ProviderError::Provider("500".into()).is_transient());
        assert!(!ProviderError::Cancelled.is_transient());
    }

    #[test]
    fn test_role_serialization() {
        let json = serde_json::to_string(&ChatMessage::assistant("hi")).unwrap();
        assert_eq!(json, r#"{"role":"assistant","content":"hi"}"#);
    }
}
