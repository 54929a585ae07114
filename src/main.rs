use floodcast::config::ServerConfig;
use floodcast::routes;
use floodcast::state::AppState;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // A missing .env is normal; real env vars still apply.
    let _ = dotenvy::dotenv();
    tracing_subscriber::fmt::init();

    let config = ServerConfig::from_env()?;
    if config.ion_token.is_empty() {
        tracing::warn!("CESIUM_ION_TOKEN not set; index page will carry an empty token");
    }

    let addr = config.bind_addr();
    let state = AppState::new(config).await?;
    tokio::spawn(state.shutdown.clone().listen_for_signals());

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(
        %addr,
        images = %state.store.dir().display(),
        relay_route = %state.config.camera_meta_route,
        "floodcast relay listening"
    );
    routes::serve(listener, state).await?;
    Ok(())
}
