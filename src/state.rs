//! Shared application state.
//!
//! DESIGN
//! ======
//! `AppState` is injected into Axum handlers via the `State` extractor.
//! It holds the typed config, the SSE hub, the mask store, the shutdown
//! signal and one pooled HTTP client for the tile proxy. Everything is
//! cheap to clone.

use std::sync::Arc;

use crate::config::ServerConfig;
use crate::hub::Hub;
use crate::shutdown::Shutdown;
use crate::store::{MaskStore, StoreError};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ServerConfig>,
    pub hub: Hub,
    pub store: MaskStore,
    pub shutdown: Shutdown,
    pub http: reqwest::Client,
}

impl AppState {
    /// Build state from config, creating the images directory.
    pub async fn new(config: ServerConfig) -> Result<Self, StoreError> {
        let store = MaskStore::open(&config.images_dir).await?;
        let hub = Hub::new(config.backlog, config.client_buffer);
        Ok(Self { config: Arc::new(config), hub, store, shutdown: Shutdown::new(), http: reqwest::Client::new() })
    }
}

// =============================================================================
// TEST HELPERS
// =============================================================================
