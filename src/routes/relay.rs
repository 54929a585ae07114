//! Relay POST and mask upload.

use axum::Json;
use axum::body::Bytes;
use axum::extract::State;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::info;

use super::parse_body;
use crate::error::AppError;
use crate::mask::DataUrl;
use crate::message::{MaskSaved, RelayMessage};
use crate::state::AppState;
use crate::store::uuid_from_filename;

#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct RelayResponse {
    pub ok: bool,
    pub id: u64,
    pub delivered: usize,
}

/// `POST <CAMERA_METADATA_ROUTE>`: classify, then broadcast the body text
/// exactly as received (outer whitespace aside).
pub async fn camera_meta(State(state): State<AppState>, body: Bytes) -> Result<Json<RelayResponse>, AppError> {
    let text = std::str::from_utf8(&body)
        .map_err(|e| AppError::BadRequest(format!("body is not UTF-8: {e}")))?
        .trim();
    let value: Value = serde_json::from_str(text).map_err(|e| AppError::BadRequest(format!("invalid JSON: {e}")))?;
    let message = RelayMessage::classify(&value)?;

    let published = state.hub.publish(text);
    info!(kind = message.kind(), id = published.event.id, delivered = published.delivered, "relayed");
    Ok(Json(RelayResponse { ok: true, id: published.event.id, delivered: published.delivered }))
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveMaskBody {
    #[serde(default)]
    pub data_url: String,
    #[serde(default)]
    pub filename: Option<String>,
}

#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct SaveMaskResponse {
    pub ok: bool,
    pub filename: String,
    pub url: String,
    pub bytes: usize,
}

/// `POST /save-mask`: decode the data URL, persist it, announce it.
pub async fn save_mask(State(state): State<AppState>, body: Bytes) -> Result<Json<SaveMaskResponse>, AppError> {
    let body: SaveMaskBody = parse_body(&body)?;
    let data = DataUrl::parse(&body.data_url)?;

    let filename = match body.filename.as_deref().map(str::trim) {
        Some(name) if !name.is_empty() => name.to_owned(),
        _ => format!("{}.{}", uuid::Uuid::new_v4(), data.format.extension()),
    };
    let path = state.store.save(&filename, &data.bytes).await?;
    let filename = path.file_name().and_then(|n| n.to_str()).unwrap_or(filename.as_str()).to_owned();
    let url = format!("/images/{filename}");

    let saved = MaskSaved::new(uuid_from_filename(&filename), filename.clone(), url.clone());
    let payload = serde_json::to_string(&saved).map_err(|e| AppError::Internal(e.to_string()))?;
    let published = state.hub.publish(payload);
    info!(filename = %filename, bytes = data.bytes.len(), delivered = published.delivered, "mask saved");

    Ok(Json(SaveMaskResponse { ok: true, filename, url, bytes: data.bytes.len() }))
}

#[cfg(test)]
#[path = "relay_test.rs"]
mod tests;
