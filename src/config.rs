//! Relay server configuration parsed from environment variables.

use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 8000;
pub const DEFAULT_IMAGES_DIR: &str = "images";
pub const DEFAULT_STATIC_DIR: &str = ".";
pub const DEFAULT_INDEX_TEMPLATE: &str = "index.template.html";
pub const DEFAULT_CAMERA_META_ROUTE: &str = "/api/coords";
pub const DEFAULT_OSM_UPSTREAM: &str = "https://tile.openstreetmap.org";
pub const DEFAULT_SSE_BACKLOG: usize = 20;
pub const DEFAULT_SSE_CLIENT_BUFFER: usize = 256;
pub const DEFAULT_SSE_KEEPALIVE_SECS: u64 = 15;
pub const DEFAULT_WAIT_TIMEOUT_MS: u64 = 30_000;
pub const DEFAULT_WAIT_MAX_TIMEOUT_MS: u64 = 120_000;
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 50 * 1024 * 1024;

/// Fixed routes the relay route must not shadow.
pub const RESERVED_ROUTES: &[&str] = &[
    "/", "/events", "/save-mask", "/ready", "/wait", "/wait-clients", "/clients", "/shutdown", "/health",
    "/healthz",
];

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("CAMERA_METADATA_ROUTE must start with '/' and not shadow a fixed route, got {0:?}")]
    InvalidRoute(String),
    #[error("{key} must be greater than zero")]
    Zero { key: &'static str },
    #[error("invalid PORT: {0}")]
    InvalidPort(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub images_dir: PathBuf,
    pub static_dir: PathBuf,
    pub index_template: PathBuf,
    pub ion_token: String,
    pub camera_meta_route: String,
    pub osm_upstream: String,
    pub backlog: usize,
    pub client_buffer: usize,
    pub keepalive: Duration,
    pub wait_default: Duration,
    pub wait_max: Duration,
    pub max_upload_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_owned(),
            port: DEFAULT_PORT,
            images_dir: PathBuf::from(DEFAULT_IMAGES_DIR),
            static_dir: PathBuf::from(DEFAULT_STATIC_DIR),
            index_template: PathBuf::from(DEFAULT_INDEX_TEMPLATE),
            ion_token: String::new(),
            camera_meta_route: DEFAULT_CAMERA_META_ROUTE.to_owned(),
            osm_upstream: DEFAULT_OSM_UPSTREAM.to_owned(),
            backlog: DEFAULT_SSE_BACKLOG,
            client_buffer: DEFAULT_SSE_CLIENT_BUFFER,
            keepalive: Duration::from_secs(DEFAULT_SSE_KEEPALIVE_SECS),
            wait_default: Duration::from_millis(DEFAULT_WAIT_TIMEOUT_MS),
            wait_max: Duration::from_millis(DEFAULT_WAIT_MAX_TIMEOUT_MS),
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
        }
    }
}

impl ServerConfig {
    /// Build typed server config from environment variables.
    ///
    /// All variables are optional:
    /// - `HOST`, `PORT`: bind address, default `0.0.0.0:8000`
    /// - `IMAGES_DIR`: where uploaded masks are written, default `images`
    /// - `STATIC_DIR`: static viewer assets, default `.`
    /// - `INDEX_TEMPLATE`: HTML served at `/`, default `index.template.html`
    /// - `CESIUM_ION_TOKEN`: substituted into the index template
    /// - `CAMERA_METADATA_ROUTE` (alias `CAMERA_META_ROUTE`): relay route for
    ///   camera/depth payloads, default `/api/coords`
    /// - `OSM_UPSTREAM`: raster tile origin proxied under `/osm`
    /// - `SSE_BACKLOG`, `SSE_CLIENT_BUFFER`, `SSE_KEEPALIVE_SECS`
    /// - `WAIT_DEFAULT_TIMEOUT_MS`, `WAIT_MAX_TIMEOUT_MS`
    /// - `MAX_UPLOAD_BYTES`: body limit for `/save-mask`, default 50 MiB
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let port = match std::env::var("PORT") {
            Ok(raw) => raw.trim().parse::<u16>().map_err(|_| ConfigError::InvalidPort(raw))?,
            Err(_) => defaults.port,
        };

        let camera_meta_route = std::env::var("CAMERA_METADATA_ROUTE")
            .or_else(|_| std::env::var("CAMERA_META_ROUTE"))
            .unwrap_or_else(|_| DEFAULT_CAMERA_META_ROUTE.to_owned());
        if !camera_meta_route.starts_with('/')
            || RESERVED_ROUTES.contains(&camera_meta_route.as_str())
            || camera_meta_route.starts_with("/images")
            || camera_meta_route.starts_with("/osm")
        {
            return Err(ConfigError::InvalidRoute(camera_meta_route));
        }

        let backlog = env_parse("SSE_BACKLOG", DEFAULT_SSE_BACKLOG);
        let client_buffer = env_parse("SSE_CLIENT_BUFFER", DEFAULT_SSE_CLIENT_BUFFER);
        if client_buffer == 0 {
            return Err(ConfigError::Zero { key: "SSE_CLIENT_BUFFER" });
        }
        let max_upload_bytes = env_parse("MAX_UPLOAD_BYTES", DEFAULT_MAX_UPLOAD_BYTES);
        if max_upload_bytes == 0 {
            return Err(ConfigError::Zero { key: "MAX_UPLOAD_BYTES" });
        }

        Ok(Self {
            host: std::env::var("HOST").unwrap_or(defaults.host),
            port,
            images_dir: env_path("IMAGES_DIR").unwrap_or(defaults.images_dir),
            static_dir: env_path("STATIC_DIR").unwrap_or(defaults.static_dir),
            index_template: env_path("INDEX_TEMPLATE").unwrap_or(defaults.index_template),
            ion_token: std::env::var("CESIUM_ION_TOKEN").unwrap_or_default(),
            camera_meta_route,
            osm_upstream: std::env::var("OSM_UPSTREAM")
                .unwrap_or(defaults.osm_upstream)
                .trim_end_matches('/')
                .to_owned(),
            backlog,
            client_buffer,
            keepalive: Duration::from_secs(env_parse("SSE_KEEPALIVE_SECS", DEFAULT_SSE_KEEPALIVE_SECS).max(1)),
            wait_default: Duration::from_millis(env_parse("WAIT_DEFAULT_TIMEOUT_MS", DEFAULT_WAIT_TIMEOUT_MS)),
            wait_max: Duration::from_millis(env_parse("WAIT_MAX_TIMEOUT_MS", DEFAULT_WAIT_MAX_TIMEOUT_MS)),
            max_upload_bytes,
        })
    }

    /// `host:port` string for `TcpListener::bind`.
    #[must_use]
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Resolve a client-supplied long-poll timeout against the configured
    /// default and ceiling.
    #[must_use]
    pub fn wait_timeout(&self, requested_ms: Option<u64>) -> Duration {
        requested_ms
            .map(Duration::from_millis)
            .unwrap_or(self.wait_default)
            .min(self.wait_max)
    }
}

fn env_parse<T>(key: &str, default: T) -> T
where
    T: std::str::FromStr + Copy,
{
    std::env::var(key)
        .ok()
        .and_then(|v| v.trim().parse::<T>().ok())
        .unwrap_or(default)
}

fn env_path(key: &str) -> Option<PathBuf> {
    std::env::var(key).ok().filter(|v| !v.is_empty()).map(PathBuf::from)
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
