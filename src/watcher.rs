//! Mask watcher: follows the relay's SSE stream and reports saved masks.
//!
//! DESIGN
//! ======
//! The watcher is the downstream consumer of `/save-mask`. It connects with
//! `replay=0` (only new masks matter), feeds the body through `SseParser`,
//! and turns `mask-saved` events into `MaskReady`. Any disconnect or error is
//! logged and retried after a fixed delay until the stop signal fires.

use std::time::Duration;

use futures::StreamExt;
use reqwest::header::ACCEPT;
use serde::Serialize;
use serde_json::Value;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::capture::MaskProfile;
use crate::message::{MASK_SAVED_TYPE, parse_event_data};
use crate::shutdown::Shutdown;
use crate::sse::SseParser;
use crate::store::uuid_from_filename;

pub const RETRY_DELAY: Duration = Duration::from_secs(2);

#[derive(Debug, thiserror::Error)]
pub enum WatchError {
    #[error("invalid base URL: {0}")]
    InvalidBaseUrl(String),
    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("server answered {0}")]
    Status(u16),
    #[error("event stream ended")]
    Ended,
}

/// A mask the relay has persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MaskReady {
    pub uuid: String,
    pub profile: MaskProfile,
    pub filename: String,
    pub url: Option<String>,
}

/// Interpret one SSE data payload. Anything but `mask-saved` is `None`.
#[must_use]
pub fn mask_ready_from_data(data: &str) -> Option<MaskReady> {
    let value = parse_event_data(data)?;
    if value.get("type").and_then(Value::as_str) != Some(MASK_SAVED_TYPE) {
        return None;
    }
    let filename = value.get("filename").and_then(Value::as_str)?.to_owned();
    let uuid = value
        .get("uuid")
        .and_then(Value::as_str)
        .filter(|u| !u.is_empty())
        .unwrap_or_else(|| uuid_from_filename(&filename))
        .to_owned();
    Some(MaskReady {
        uuid,
        profile: MaskProfile::from_filename(&filename),
        url: value.get("url").and_then(Value::as_str).map(str::to_owned),
        filename,
    })
}

#[derive(Debug, Clone)]
pub struct Watcher {
    client: reqwest::Client,
    events_url: String,
    retry: Duration,
}

impl Watcher {
    pub fn new(base_url: &str) -> Result<Self, WatchError> {
        let base = base_url.trim().trim_end_matches('/');
        if !(base.starts_with("http://") || base.starts_with("https://")) {
            return Err(WatchError::InvalidBaseUrl(base_url.to_owned()));
        }
        Ok(Self { client: reqwest::Client::new(), events_url: format!("{base}/events?replay=0"), retry: RETRY_DELAY })
    }

    #[must_use]
    pub fn with_retry(mut self, retry: Duration) -> Self {
        self.retry = retry;
        self
    }

    #[must_use]
    pub fn events_url(&self) -> &str {
        &self.events_url
    }

    /// Follow one connection until it ends or fails.
    pub async fn stream_once<F: FnMut(MaskReady)>(&self, on_mask: &mut F) -> Result<(), WatchError> {
        let response = self.client.get(&self.events_url).header(ACCEPT, "text/event-stream").send().await?;
        if !response.status().is_success() {
            return Err(WatchError::Status(response.status().as_u16()));
        }
        info!(url = %self.events_url, "watching for masks");

        let mut parser = SseParser::new();
        let mut body = response.bytes_stream();
        while let Some(chunk) = body.next().await {
            let chunk = chunk?;
            for event in parser.feed_bytes(&chunk) {
                if let Some(mask) = mask_ready_from_data(&event.data) {
                    debug!(filename = %mask.filename, profile = mask.profile.as_str(), "mask ready");
                    on_mask(mask);
                }
            }
        }
        if let Some(mask) = parser.finish().and_then(|e| mask_ready_from_data(&e.data)) {
            on_mask(mask);
        }
        Err(WatchError::Ended)
    }

    /// Reconnect forever until `stop` fires.
    pub async fn run<F: FnMut(MaskReady)>(&self, stop: Shutdown, mut on_mask: F) {
        loop {
            tokio::select! {
                () = stop.wait() => break,
                result = self.stream_once(&mut on_mask) => {
                    if let Err(e) = result {
                        warn!(error = %e, retry_ms = self.retry.as_millis() as u64, "mask stream interrupted");
                    }
                }
            }
            tokio::select! {
                () = stop.wait() => break,
                () = tokio::time::sleep(self.retry) => {}
            }
        }
        info!("mask watcher stopped");
    }

    /// Run in the background, delivering masks over a channel.
    #[must_use]
    pub fn spawn(self, stop: Shutdown) -> (mpsc::UnboundedReceiver<MaskReady>, JoinHandle<()>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let handle = tokio::spawn(async move {
            self.run(stop, move |mask| {
                let _ = tx.send(mask);
            })
            .await;
        });
        (rx, handle)
    }
}

#[cfg(test)]
#[path = "watcher_test.rs"]
mod tests;
