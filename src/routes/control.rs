//! Readiness gate, long-polls, client counts and shutdown.

use axum::Json;
use axum::body::Bytes;
use axum::extract::State;
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use super::parse_body;
use crate::error::AppError;
use crate::hub::ClientCounts;
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadyBody {
    pub client_id: Option<Uuid>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WaitBody {
    pub min: Option<usize>,
    pub timeout_ms: Option<u64>,
}

#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct CountsResponse {
    pub ok: bool,
    pub connected: usize,
    pub ready: usize,
}

impl From<ClientCounts> for CountsResponse {
    fn from(c: ClientCounts) -> Self {
        Self { ok: true, connected: c.connected, ready: c.ready }
    }
}

#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct OkResponse {
    pub ok: bool,
}

/// `POST /ready`: the viewer finished loading and can take captures.
pub async fn ready(State(state): State<AppState>, body: Bytes) -> Result<Json<CountsResponse>, AppError> {
    let body: ReadyBody = parse_body(&body)?;
    let client_id = body.client_id.ok_or_else(|| AppError::BadRequest("clientId is required".into()))?;
    if !state.hub.mark_ready(client_id) {
        return Err(AppError::NotFound(format!("unknown client {client_id}")));
    }
    Ok(Json(state.hub.counts().into()))
}

/// `POST /wait-clients`: block until enough SSE clients are connected.
pub async fn wait_clients(State(state): State<AppState>, body: Bytes) -> Result<Json<CountsResponse>, AppError> {
    let body: WaitBody = parse_body(&body)?;
    let timeout = state.config.wait_timeout(body.timeout_ms);
    let counts = state.hub.wait_connected(body.min.unwrap_or(1), timeout).await?;
    Ok(Json(counts.into()))
}

/// `POST /wait`: block until enough clients reported ready.
pub async fn wait_ready(State(state): State<AppState>, body: Bytes) -> Result<Json<CountsResponse>, AppError> {
    let body: WaitBody = parse_body(&body)?;
    let timeout = state.config.wait_timeout(body.timeout_ms);
    let counts = state.hub.wait_ready(body.min.unwrap_or(1), timeout).await?;
    Ok(Json(counts.into()))
}

/// `GET /clients`.
pub async fn clients(State(state): State<AppState>) -> Json<ClientCounts> {
    Json(state.hub.counts())
}

/// `POST /shutdown`.
pub async fn shutdown(State(state): State<AppState>) -> Json<OkResponse> {
    if state.shutdown.trigger("POST /shutdown") {
        info!("shutdown accepted over HTTP");
    }
    Json(OkResponse { ok: true })
}

#[cfg(test)]
#[path = "control_test.rs"]
mod tests;
