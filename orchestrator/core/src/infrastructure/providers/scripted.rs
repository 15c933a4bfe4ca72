// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

// Scripted Provider - deterministic adapter for local battles and tests
//
// Replies are cycled in order; `{agent}` in a reply is replaced with the
// acting agent's display name. One-off steps queued with `push_step` are
// consumed before the cycle and can inject failures or a call that never
// returns on its own.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use crate::domain::agent::Agent;
use crate::domain::provider::{
    ChatMessage, GenerationResponse, ProviderAdapter, ProviderError, TokenUsage,
};

#[derive(Debug, Clone)]
pub enum ScriptStep {
    Reply(String),
    Fail(ProviderError),
    /// Block until cancelled
    Hang,
}

/// A request as the provider saw it.
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub agent_id: String,
    pub messages: Vec<ChatMessage>,
}

pub struct ScriptedProvider {
    replies: Vec<String>,
    steps: Mutex<VecDeque<ScriptStep>>,
    latency: Duration,
    cursor: AtomicUsize,
    requests: Mutex<Vec<RecordedRequest>>,
}

impl ScriptedProvider {
    pub fn new(replies: Vec<String>) -> Self {
        Self {
            replies,
            steps: Mutex::new(VecDeque::new()),
            latency: Duration::ZERO,
            cursor: AtomicUsize::new(0),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Queue a one-off outcome, consumed before the reply cycle
    pub fn push_step(&self, step: ScriptStep) {
        self.steps.lock().push_back(step);
    }

    pub fn with_steps(self, steps: impl IntoIterator<Item = ScriptStep>) -> Self {
        self.steps.lock().extend(steps);
        self
    }

    /// Number of `generate` calls made so far, including failed ones
    pub fn call_count(&self) -> usize {
        self.requests.lock().len()
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().clone()
    }

    fn next_reply(&self, agent: &Agent) -> String {
        if self.replies.is_empty() {
            return format!("{} has nothing further to add.", agent.display_name);
        }
        let index = self.cursor.fetch_add(1, Ordering::Relaxed) % self.replies.len();
        self.replies[index].replace("{agent}", &agent.display_name)
    }
}

#[async_trait]
impl ProviderAdapter for ScriptedProvider {
    async fn generate(
        &self,
        agent: &Agent,
        messages: &[ChatMessage],
        cancel: CancellationToken,
    ) -> Result<GenerationResponse, ProviderError> {
        self.requests.lock().push(RecordedRequest {
            agent_id: agent.id.clone(),
            messages: messages.to_vec(),
        });

        if !self.latency.is_zero() {
            tokio::select! {
                _ = tokio::time::sleep(self.latency) => {}
                _ = cancel.cancelled() => return Err(ProviderError::Cancelled),
            }
        }

        let step = self.steps.lock().pop_front();
        let text = match step {
            Some(ScriptStep::Reply(text)) => text,
            Some(ScriptStep::Fail(error)) => return Err(error),
            Some(ScriptStep::Hang) => {
                cancel.cancelled().await;
                return Err(ProviderError::Cancelled);
            }
            None => self.next_reply(agent),
        };

        // One "token" per whitespace-separated word.
        let prompt_tokens = messages.iter().map(|m| word_count(&m.content)).sum();
        let usage = TokenUsage::new(prompt_tokens, word_count(&text));
        Ok(GenerationResponse::text(text).with_usage(usage))
    }
}

fn word_count(text: &str) -> u32 {
    text.split_whitespace().count() as u32
}
