use super::*;
use crate::state::test_helpers::test_app_state;
use axum::http::StatusCode;

#[tokio::test]
async fn ready_marks_known_client() {
    let dir = tempfile::tempdir().unwrap();
    let state = test_app_state(dir.path()).await;
    let sub = state.hub.subscribe(false);

    let body = Bytes::from(serde_json::json!({ "clientId": sub.id() }).to_string());
    let Json(resp) = ready(State(state.clone()), body).await.unwrap();
    assert_eq!(resp, CountsResponse { ok: true, connected: 1, ready: 1 });
}

#[tokio::test]
async fn ready_unknown_client_is_404() {
    let dir = tempfile::tempdir().unwrap();
    let state = test_app_state(dir.path()).await;
    let body = Bytes::from(serde_json::json!({ "clientId": Uuid::new_v4() }).to_string());
    let err = ready(State(state), body).await.unwrap_err();
    assert_eq!(err.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn ready_requires_client_id() {
    let dir = tempfile::tempdir().unwrap();
    let state = test_app_state(dir.path()).await;
    let err = ready(State(state.clone()), Bytes::new()).await.unwrap_err();
    assert_eq!(err.status(), StatusCode::BAD_REQUEST);
    let err = ready(State(state), Bytes::from_static(br#"{"clientId":"nope"}"#)).await.unwrap_err();
    assert_eq!(err.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn wait_clients_returns_once_connected() {
    let dir = tempfile::tempdir().unwrap();
    let state = test_app_state(dir.path()).await;
    let _sub = state.hub.subscribe(false);

    let Json(resp) = wait_clients(State(state), Bytes::new()).await.unwrap();
    assert_eq!(resp.connected, 1);
}

#[tokio::test]
async fn wait_ready_times_out_with_408() {
    let dir = tempfile::tempdir().unwrap();
    let state = test_app_state(dir.path()).await;
    let _sub = state.hub.subscribe(false);

    let body = Bytes::from_static(br#"{"min":1,"timeoutMs":10}"#);
    let err = wait_ready(State(state), body).await.unwrap_err();
    assert_eq!(err.status(), StatusCode::REQUEST_TIMEOUT);
}

#[tokio::test]
async fn wait_timeout_is_clamped_to_ceiling() {
    let dir = tempfile::tempdir().unwrap();
    let state = test_app_state(dir.path()).await;
    let started = std::time::Instant::now();

    // Asks for an hour; the test config caps waits at 200 ms.
    let body = Bytes::from_static(br#"{"min":5,"timeoutMs":3600000}"#);
    let err = wait_clients(State(state), body).await.unwrap_err();
    assert_eq!(err.status(), StatusCode::REQUEST_TIMEOUT);
    assert!(started.elapsed() < std::time::Duration::from_secs(5));
}

#[tokio::test]
async fn clients_reports_counts() {
    let dir = tempfile::tempdir().unwrap();
    let state = test_app_state(dir.path()).await;
    let _a = state.hub.subscribe(false);
    let _b = state.hub.subscribe(false);
    let Json(counts) = clients(State(state)).await;
    assert_eq!(counts, ClientCounts { connected: 2, ready: 0 });
}

#[tokio::test]
async fn shutdown_fires_signal() {
    let dir = tempfile::tempdir().unwrap();
    let state = test_app_state(dir.path()).await;
    let Json(resp) = shutdown(State(state.clone())).await;
    assert_eq!(resp, OkResponse { ok: true });
    assert!(state.shutdown.is_triggered());
}
