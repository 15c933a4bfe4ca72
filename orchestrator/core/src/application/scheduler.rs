// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

// Turn Scheduler - drives one battle's round-robin loop
//
// One task per battle. Each step waits out a pause, picks
// `agents[index % k]`, asks that agent's provider for the next message
// (bounded by a timeout, transient failures retried with exponential
// backoff), commits the turn, then sleeps the inter-turn delay. Cancel is
// observed at every await point.

use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, warn};

use crate::application::battle::{Battle, Commit};
use crate::application::prompt::{build_messages, truncate_words};
use crate::domain::agent::Agent;
use crate::domain::battle::BattleId;
use crate::domain::config::SchedulerConfig;
use crate::domain::provider::{
    ChatMessage, GenerationResponse, ProviderAdapter, ProviderError, TokenUsage,
};

pub(crate) async fn run(battle: Arc<Battle>) {
    let battle_id = battle.id();
    let cancel = battle.cancellation();
    let ctx = battle.context();
    let agent_count = battle.agents().len();

    debug!(battle_id = %battle_id, "Turn scheduler started");

    while let Some(index) = battle.next_turn().await {
        let seat = index as usize % agent_count;
        let agent = &battle.agents()[seat];
        let messages = build_messages(battle.agents(), seat, battle.config(), &battle.transcript());

        let response = match generate_with_retry(
            ctx.adapters[seat].as_ref(),
            agent,
            &messages,
            &ctx.scheduler,
            &cancel,
        )
        .await
        {
            Ok(response) => {
                if let Some(usage) = &response.usage {
                    record_usage(battle_id, agent, usage);
                }
                response
            }
            Err(ProviderError::Cancelled) if cancel.is_cancelled() => break,
            Err(e) => {
                error!(battle_id = %battle_id, turn = index, agent_id = %agent.id, "Provider failed: {}", e);
                battle.fail(format!("agent '{}' turn {}: {}", agent.id, index, e));
                break;
            }
        };

        let content = match battle.config().max_words_per_turn {
            Some(limit) => truncate_words(&response.text, limit),
            None => response.text,
        };

        match battle.commit_turn(index, content) {
            Commit::Recorded(_) => {}
            Commit::Final(_) | Commit::Discarded => break,
        }

        let delay = battle.config().turn_delay_ms;
        if delay > 0 {
            tokio::select! {
                _ = tokio::time::sleep(std::time::Duration::from_millis(delay)) => {}
                _ = cancel.cancelled() => break,
            }
        }
    }

    debug!(battle_id = %battle_id, state = %battle.state(), "Turn scheduler stopped");
}

fn record_usage(battle_id: BattleId, agent: &Agent, usage: &TokenUsage) {
    debug!(
        battle_id = %battle_id,
        agent_id = %agent.id,
        prompt_tokens = usage.prompt_tokens,
        completion_tokens = usage.completion_tokens,
        "Provider usage"
    );
    metrics::counter!("arena_prompt_tokens_total", "provider" => agent.provider.clone())
        .increment(u64::from(usage.prompt_tokens));
    metrics::counter!("arena_completion_tokens_total", "provider" => agent.provider.clone())
        .increment(u64::from(usage.completion_tokens));
}

/// Call the provider until it succeeds, fails fatally, or the attempt cap
/// is spent. Only `RateLimited` and `Timeout` are retried.
pub(crate) async fn generate_with_retry(
    adapter: &dyn ProviderAdapter,
    agent: &Agent,
    messages: &[ChatMessage],
    config: &SchedulerConfig,
    cancel: &CancellationToken,
) -> Result<GenerationResponse, ProviderError> {
    let mut attempt = 1;
    loop {
        match generate_once(adapter, agent, messages, config, cancel).await {
            Ok(response) => return Ok(response),
            Err(e) if e.is_transient() && attempt < config.max_attempts => {
                let backoff = config.backoff_for(attempt);
                warn!(
                    agent_id = %agent.id,
                    attempt,
                    backoff_ms = backoff.as_millis() as u64,
                    "Transient provider failure, retrying: {}", e
                );
                metrics::counter!("arena_provider_retries_total").increment(1);

                tokio::select! {
                    _ = tokio::time::sleep(backoff) => {}
                    _ = cancel.cancelled() => return Err(ProviderError::Cancelled),
                }
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}

/// One bounded attempt. On cancel the adapter gets a short grace period to
/// wind down before the attempt is abandoned.
async fn generate_once(
    adapter: &dyn ProviderAdapter,
    agent: &Agent,
    messages: &[ChatMessage],
    config: &SchedulerConfig,
    cancel: &CancellationToken,
) -> Result<GenerationResponse, ProviderError> {
    if cancel.is_cancelled() {
        return Err(ProviderError::Cancelled);
    }

    let call = tokio::time::timeout(
        config.provider_timeout(),
        adapter.generate(agent, messages, cancel.clone()),
    );
    tokio::pin!(call);

    tokio::select! {
        result = &mut call => result.unwrap_or(Err(ProviderError::Timeout)),
        _ = cancel.cancelled() => {
            let _ = tokio::time::timeout(config.cancel_grace(), &mut call).await;
            Err(ProviderError::Cancelled)
        }
    }
}
