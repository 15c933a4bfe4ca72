// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use anyhow::{Context, Result};

/// Initialize the tracing subscriber.
///
/// `RUST_LOG` wins over `level`. `format` is `text` (compact) or `json`.
pub fn init_logging(level: &str, format: &str) -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .or_else(|_| tracing_subscriber::EnvFilter::try_new(level))
        .context("Failed to create log filter")?;

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false);

    match format {
        "json" => builder.json().with_current_span(false).init(),
        "text" => builder.with_target(false).compact().init(),
        other => anyhow::bail!("Unknown log format '{}' (expected text or json)", other),
    }

    Ok(())
}
