// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! HTTP API
//!
//! | Method | Path | Purpose |
//! |--------|------|---------|
//! | `GET` | `/health` | liveness and live battle count |
//! | `POST` | `/battles` | create a battle (`Pending`) |
//! | `GET` | `/battles` | snapshots of live battles |
//! | `GET` | `/battles/{id}` | live snapshot, else archived record |
//! | `POST` | `/battles/{id}/{start,pause,resume,cancel}` | lifecycle control |
//! | `GET` | `/battles/{id}/events` | SSE spectator stream |
//! | `GET` | `/archive` | most recently finished battles |

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{
        sse::{Event, KeepAlive},
        IntoResponse, Response, Sse,
    },
    routing::{get, post},
    Json, Router,
};
use futures::stream::{self, Stream, StreamExt};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tokio_stream::wrappers::ReceiverStream;
use tower_http::trace::TraceLayer;
use tracing::warn;

use crate::application::registry::ArenaRegistry;
use crate::application::Battle;
use crate::domain::agent::Agent;
use crate::domain::archive::ArchiveStore;
use crate::domain::battle::{BattleConfig, BattleError, BattleId};
use crate::infrastructure::broadcaster::{ChannelSink, SpectatorBroadcaster};

const SSE_BUFFER: usize = 64;

#[derive(Clone)]
pub struct ApiState {
    pub registry: Arc<ArenaRegistry>,
    pub broadcaster: Arc<SpectatorBroadcaster>,
    pub archive: Arc<dyn ArchiveStore>,
}

impl ApiState {
    pub fn new(registry: Arc<ArenaRegistry>, archive: Arc<dyn ArchiveStore>) -> Self {
        let broadcaster = registry.broadcaster().clone();
        Self {
            registry,
            broadcaster,
            archive,
        }
    }
}

pub fn app(state: ApiState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/battles", post(create_battle).get(list_battles))
        .route("/battles/{id}", get(get_battle))
        .route("/battles/{id}/start", post(start_battle))
        .route("/battles/{id}/pause", post(pause_battle))
        .route("/battles/{id}/resume", post(resume_battle))
        .route("/battles/{id}/cancel", post(cancel_battle))
        .route("/battles/{id}/events", get(stream_events))
        .route("/archive", get(list_archive))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[derive(Debug, Deserialize)]
pub struct CreateBattleRequest {
    pub agents: Vec<Agent>,
    pub config: BattleConfig,
}

#[derive(Debug, Deserialize)]
pub struct ArchiveQuery {
    #[serde(default = "default_archive_limit")]
    pub limit: usize,
}

fn default_archive_limit() -> usize {
    20
}

#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    NotFound(String),
    Conflict(String),
    Unprocessable(String),
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::BadRequest(m) => (StatusCode::BAD_REQUEST, m),
            ApiError::NotFound(m) => (StatusCode::NOT_FOUND, m),
            ApiError::Conflict(m) => (StatusCode::CONFLICT, m),
            ApiError::Unprocessable(m) => (StatusCode::UNPROCESSABLE_ENTITY, m),
            ApiError::Internal(m) => (StatusCode::INTERNAL_SERVER_ERROR, m),
        };
        (status, Json(json!({ "error": message }))).into_response()
    }
}

impl From<BattleError> for ApiError {
    fn from(e: BattleError) -> Self {
        match e {
            BattleError::CreationInvalid(_) => ApiError::Unprocessable(e.to_string()),
            BattleError::AlreadyStarted(_) => ApiError::Conflict(e.to_string()),
        }
    }
}

fn parse_id(id: &str) -> Result<BattleId, ApiError> {
    BattleId::from_string(id).map_err(|_| ApiError::BadRequest(format!("Invalid battle id '{}'", id)))
}

fn live_battle(state: &ApiState, id: &str) -> Result<Arc<Battle>, ApiError> {
    let battle_id = parse_id(id)?;
    state
        .registry
        .get(battle_id)
        .ok_or_else(|| ApiError::NotFound(format!("No live battle {}", battle_id)))
}

async fn health(State(state): State<ApiState>) -> Json<serde_json::Value> {
    Json(json!({
        "status": "healthy",
        "live_battles": state.registry.live_count(),
    }))
}

async fn create_battle(
    State(state): State<ApiState>,
    Json(request): Json<CreateBattleRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let battle = state.registry.create(request.agents, request.config)?;
    Ok((StatusCode::CREATED, Json(battle.snapshot())))
}

async fn list_battles(State(state): State<ApiState>) -> impl IntoResponse {
    Json(state.registry.list())
}

async fn get_battle(
    State(state): State<ApiState>,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    let battle_id = parse_id(&id)?;
    if let Some(battle) = state.registry.get(battle_id) {
        return Ok(Json(battle.snapshot()).into_response());
    }

    match state.archive.find_by_id(battle_id).await {
        Ok(Some(record)) => Ok(Json(record).into_response()),
        Ok(None) => Err(ApiError::NotFound(format!("Battle {} not found", battle_id))),
        Err(e) => Err(ApiError::Internal(e.to_string())),
    }
}

async fn start_battle(
    State(state): State<ApiState>,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let battle = live_battle(&state, &id)?;
    battle.start()?;
    Ok(Json(json!({ "applied": true, "state": battle.state() })))
}

async fn pause_battle(
    State(state): State<ApiState>,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let battle = live_battle(&state, &id)?;
    let applied = battle.pause();
    Ok(Json(json!({ "applied": applied, "state": battle.state() })))
}

async fn resume_battle(
    State(state): State<ApiState>,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let battle = live_battle(&state, &id)?;
    let applied = battle.resume();
    Ok(Json(json!({ "applied": applied, "state": battle.state() })))
}

async fn cancel_battle(
    State(state): State<ApiState>,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let battle = live_battle(&state, &id)?;
    let applied = battle.cancel();
    Ok(Json(json!({ "applied": applied, "state": battle.state() })))
}

/// Attach first, then snapshot, so nothing falls between the two. A turn
/// committed in that window may show up in both; clients key on turn index.
async fn stream_events(
    State(state): State<ApiState>,
    Path(id): Path<String>,
) -> Result<Sse<impl Stream<Item = Result<Event, axum::Error>>>, ApiError> {
    let battle = live_battle(&state, &id)?;
    let (sink, receiver) = ChannelSink::new(SSE_BUFFER);
    state
        .broadcaster
        .attach(battle.id(), sink)
        .map_err(|e| ApiError::NotFound(e.to_string()))?;

    let snapshot = battle.snapshot();
    let replay = stream::once(async move { Event::default().event("snapshot").json_data(&snapshot) });
    let live = ReceiverStream::new(receiver).map(|payload| Ok(Event::default().data(payload)));

    Ok(Sse::new(replay.chain(live)).keep_alive(KeepAlive::default()))
}

async fn list_archive(
    State(state): State<ApiState>,
    Query(query): Query<ArchiveQuery>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let records = state.archive.list_recent(query.limit).await.map_err(|e| {
        warn!("Failed to list archive: {}", e);
        ApiError::Internal(e.to_string())
    })?;
    Ok(Json(json!(records)))
}
