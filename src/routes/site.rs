//! Viewer site: the token-filled index page and the OSM tile proxy.

use axum::body::Body;
use axum::extract::{Path, State};
use axum::http::header::{ACCESS_CONTROL_ALLOW_ORIGIN, CACHE_CONTROL, CONTENT_TYPE, USER_AGENT};
use axum::response::{Html, IntoResponse, Response};
use tracing::debug;

use crate::error::AppError;
use crate::state::AppState;

/// Placeholder in the index template replaced by the ion token.
pub const TOKEN_PLACEHOLDER: &str = "CESIUM_ION_TOKEN";

const PROXY_USER_AGENT: &str = concat!("floodcast/", env!("CARGO_PKG_VERSION"));

/// Substitute the first token placeholder.
#[must_use]
pub fn render_index(template: &str, token: &str) -> String {
    template.replacen(TOKEN_PLACEHOLDER, token, 1)
}

/// `GET /`.
pub async fn index(State(state): State<AppState>) -> Result<Html<String>, AppError> {
    let path = &state.config.index_template;
    let template = tokio::fs::read_to_string(path).await.map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => AppError::NotFound(format!("index template {} not found", path.display())),
        _ => AppError::Internal(e.to_string()),
    })?;
    Ok(Html(render_index(&template, &state.config.ion_token)))
}

/// `{y}` may carry the `.png` suffix the viewer's imagery provider adds.
pub fn tile_path(z: u32, x: u32, y: &str) -> Result<String, AppError> {
    let (row, suffix) = match y.strip_suffix(".png") {
        Some(row) => (row, ".png"),
        None => (y, ""),
    };
    let row: u32 = row.parse().map_err(|_| AppError::BadRequest(format!("bad tile row {y:?}")))?;
    if z > 22 {
        return Err(AppError::BadRequest(format!("zoom {z} out of range")));
    }
    Ok(format!("/{z}/{x}/{row}{suffix}"))
}

/// `GET /osm/{z}/{x}/{y}`: same-origin proxy with a permissive CORS header.
pub async fn osm_tile(
    State(state): State<AppState>,
    Path((z, x, y)): Path<(u32, u32, String)>,
) -> Result<Response, AppError> {
    let url = format!("{}{}", state.config.osm_upstream, tile_path(z, x, &y)?);
    let upstream = state.http.get(&url).header(USER_AGENT, PROXY_USER_AGENT).send().await?;

    let status = upstream.status();
    if !status.is_success() {
        debug!(%url, status = status.as_u16(), "tile upstream refused");
        return Err(AppError::Upstream(format!("{url} returned {status}")));
    }

    let content_type = upstream
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("image/png")
        .to_owned();
    let cache_control = upstream
        .headers()
        .get(CACHE_CONTROL)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("public, max-age=86400")
        .to_owned();
    let bytes = upstream.bytes().await?;

    Ok((
        [(CONTENT_TYPE, content_type), (CACHE_CONTROL, cache_control), (ACCESS_CONTROL_ALLOW_ORIGIN, "*".to_owned())],
        Body::from(bytes),
    )
        .into_response())
}
