// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Prompt context construction.
//!
//! Every call to a provider is built from scratch out of the battle's
//! immutable roster, its configuration and the transcript so far, as seen
//! from the acting agent's seat: its own turns are `assistant` messages,
//! everybody else speaks as `user`.

use crate::domain::agent::Agent;
use crate::domain::battle::{BattleConfig, PromptMode, Turn};
use crate::domain::provider::{ChatMessage, ChatRole};

const KICKOFF: &str = "Begin.";

/// Build the message list for `agents[speaker]`.
pub fn build_messages(
    agents: &[Agent],
    speaker: usize,
    config: &BattleConfig,
    transcript: &[Turn],
) -> Vec<ChatMessage> {
    let agent = &agents[speaker];
    let mut messages = vec![ChatMessage::system(system_prompt(agents, speaker, config))];

    let opening = match &config.prompt_mode {
        PromptMode::Shared { prompt } => Some(prompt.as_str()),
        PromptMode::PerAgent => agent.opening_prompt.as_deref(),
    };
    if let Some(opening) = opening.filter(|p| !p.trim().is_empty()) {
        messages.push(ChatMessage::user(opening));
    }

    for turn in transcript {
        if turn.agent_id == agent.id {
            messages.push(ChatMessage::assistant(turn.content.clone()));
        } else {
            let label = agents
                .iter()
                .position(|a| a.id == turn.agent_id)
                .map(|idx| speaker_label(agents, idx, config))
                .unwrap_or_else(|| turn.agent_id.clone());
            messages.push(ChatMessage::user(format!("{}: {}", label, turn.content)));
        }
    }

    if !messages.iter().skip(1).any(|m| m.role == ChatRole::User) {
        messages.push(ChatMessage::user(KICKOFF));
    }

    messages
}

/// How `agents[idx]` is named to the other participants.
pub fn speaker_label(agents: &[Agent], idx: usize, config: &BattleConfig) -> String {
    if config.anonymous || agents[idx].anonymous {
        format!("Participant {}", idx + 1)
    } else {
        agents[idx].display_name.clone()
    }
}

fn system_prompt(agents: &[Agent], speaker: usize, config: &BattleConfig) -> String {
    let agent = &agents[speaker];
    let mut sections = vec![format!("You are {}.", agent.display_name)];

    if let Some(soul) = agent.soul.as_deref().filter(|s| !s.trim().is_empty()) {
        sections.push(soul.trim().to_string());
    }
    if let Some(brain) = agent.brain.as_deref().filter(|b| !b.trim().is_empty()) {
        sections.push(format!("## Memory\n{}", brain.trim()));
    }

    let others: Vec<String> = (0..agents.len())
        .filter(|&idx| idx != speaker)
        .map(|idx| speaker_label(agents, idx, config))
        .collect();
    sections.push(format!(
        "You are in a conversation with: {}.",
        others.join(", ")
    ));

    if let Some(limit) = config.max_words_per_turn {
        sections.push(format!("Keep each reply under {} words.", limit));
    }

    sections.join("\n\n")
}

/// Cut `text` after its `max_words`-th word.
///
/// Words are whitespace-separated runs; a word is never split. Text that is
/// already within the limit is returned trimmed.
pub fn truncate_words(text: &str, max_words: u32) -> String {
    if max_words == 0 {
        return String::new();
    }

    let mut words = 0;
    let mut in_word = false;
    for (pos, ch) in text.char_indices() {
        if ch.is_whitespace() {
            if in_word {
                in_word = false;
                if words == max_words {
                    return text[..pos].trim_start().to_string();
                }
            }
        } else if !in_word {
            in_word = true;
            words += 1;
        }
    }
    text.trim().to_string()
}
