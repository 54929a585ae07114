//! Router assembly.
//!
//! SYSTEM CONTEXT
//! ==============
//! One Axum router serves the relay (SSE stream, relay POST, mask upload,
//! readiness long-polls, shutdown) next to the viewer site: the token-filled
//! index page, the same-origin OSM tile proxy, persisted masks under
//! `/images`, and everything else as static files.

pub mod control;
pub mod events;
pub mod relay;
pub mod site;

use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::body::Bytes;
use axum::http::StatusCode;
use axum::routing::{get, post};
use serde::de::DeserializeOwned;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::error::AppError;
use crate::state::AppState;

/// Full application router.
pub fn app(state: AppState) -> Router {
    let cors = CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any);
    let images = ServeDir::new(state.store.dir());
    let site = ServeDir::new(&state.config.static_dir).append_index_html_on_directories(false);
    let camera_meta_route = state.config.camera_meta_route.clone();

    Router::new()
        .route("/", get(site::index))
        .route("/events", get(events::events))
        .route(&camera_meta_route, post(relay::camera_meta))
        .route(
            "/save-mask",
            post(relay::save_mask).layer(DefaultBodyLimit::max(state.config.max_upload_bytes)),
        )
        .route("/ready", post(control::ready))
        .route("/wait-clients", post(control::wait_clients))
        .route("/wait", post(control::wait_ready))
        .route("/clients", get(control::clients))
        .route("/shutdown", post(control::shutdown))
        .route("/osm/{z}/{x}/{y}", get(site::osm_tile))
        .route("/health", get(health))
        .route("/healthz", get(healthz))
        .nest_service("/images", images)
        .fallback_service(site)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Serve until the shutdown signal fires. SSE clients are dropped first so
/// their open streams do not hold the graceful shutdown open.
pub async fn serve(listener: tokio::net::TcpListener, state: AppState) -> std::io::Result<()> {
    let shutdown = state.shutdown.clone();
    let hub = state.hub.clone();
    let router = app(state);

    axum::serve(listener, router)
        .with_graceful_shutdown(async move {
            shutdown.wait().await;
            hub.close_all();
        })
        .await?;
    info!("relay stopped");
    Ok(())
}

async fn healthz() -> StatusCode {
    StatusCode::OK
}

/// Launchers poll this and expect the literal body `OK`.
async fn health() -> &'static str {
    "OK"
}

/// Parse a JSON body ourselves so malformed input maps to a plain 400 with
/// our error shape. An empty body means "all defaults".
pub(crate) fn parse_body<T: DeserializeOwned + Default>(body: &Bytes) -> Result<T, AppError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(T::default());
    }
    serde_json::from_slice(body).map_err(|e| AppError::BadRequest(format!("invalid JSON body: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Default, Deserialize, PartialEq)]
    struct Probe {
        #[serde(default)]
        min: Option<usize>,
    }

    #[test]
    fn parse_body_empty_is_default() {
        assert_eq!(parse_body::<Probe>(&Bytes::from_static(b"  ")).unwrap(), Probe::default());
    }

    #[test]
    fn parse_body_reads_json() {
        assert_eq!(parse_body::<Probe>(&Bytes::from_static(br#"{"min":2}"#)).unwrap(), Probe { min: Some(2) });
    }

    #[test]
    fn parse_body_rejects_garbage() {
        let err = parse_body::<Probe>(&Bytes::from_static(b"{nope")).unwrap_err();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn healthz_is_ok() {
        assert_eq!(healthz().await, StatusCode::OK);
        assert_eq!(health().await, "OK");
    }
}
