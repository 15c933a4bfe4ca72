// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! `arena serve` - HTTP API server

use anyhow::{Context, Result};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::signal;
use tracing::{error, info, warn};

use arena_core::application::ArchiveRecorder;
use arena_core::domain::config::ArenaConfig;
use arena_core::infrastructure::providers::ProviderRegistry;
use arena_core::presentation::{app, ApiState};

use super::{build_registry, open_archive};

pub async fn start_server(
    config: ArenaConfig,
    host: Option<String>,
    port: Option<u16>,
) -> Result<()> {
    let bind_address = host.unwrap_or_else(|| config.server.bind_address.clone());
    let port = port.unwrap_or(config.server.port);

    if config.metrics.enabled {
        install_metrics_exporter(&bind_address, config.metrics.port)?;
    }

    let providers = ProviderRegistry::from_config(&config.providers);
    info!(providers = ?providers.names(), "Provider registry ready");

    let registry = Arc::new(build_registry(&config, providers));
    let archive = open_archive(&config.archive).await?;
    let recorder = ArchiveRecorder::new(archive.clone(), registry.event_bus().clone()).start();

    let router = app(ApiState::new(registry.clone(), archive));

    let addr = format!("{}:{}", bind_address, port);
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    info!("Arena listening on {}", addr);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server failed")?;

    let live = registry.list();
    if !live.is_empty() {
        info!(count = live.len(), "Cancelling live battles");
        for snapshot in live {
            if let Some(battle) = registry.get(snapshot.id) {
                battle.cancel();
            }
        }
    }

    // Give the recorder a moment to persist the cancellations.
    drop(registry);
    if tokio::time::timeout(std::time::Duration::from_secs(5), recorder)
        .await
        .is_err()
    {
        warn!("Archive recorder did not finish before shutdown");
    }

    info!("Arena shutting down");
    Ok(())
}

fn install_metrics_exporter(bind_address: &str, port: u16) -> Result<()> {
    let addr: SocketAddr = format!("{}:{}", bind_address, port)
        .parse()
        .with_context(|| format!("Invalid metrics address {}:{}", bind_address, port))?;

    metrics_exporter_prometheus::PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .context("Failed to install Prometheus exporter")?;

    info!("Prometheus metrics on http://{}/metrics", addr);
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C signal");
        },
        _ = terminate => {
            info!("Received SIGTERM signal");
        },
    }
}

