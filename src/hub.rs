//! SSE fan-out hub.
//!
//! DESIGN
//! ======
//! Every `/events` connection owns one bounded mpsc receiver. Publishing
//! walks the client map under a short sync lock and `try_send`s the event to
//! each sender, so a slow client never stalls the producer: it just misses
//! events once its buffer is full. Closed senders are pruned on the spot.
//!
//! The last `backlog` events are kept so late subscribers can catch up.
//! Replay happens under the same lock as registration, so a new client sees
//! the backlog oldest-first and strictly before any live event.
//!
//! Connected/ready counts are mirrored into a `watch` channel; the long-poll
//! endpoints wait on it instead of polling.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use serde::Serialize;
use tokio::sync::{mpsc, watch};
use tracing::{debug, info};
use uuid::Uuid;

// =============================================================================
// TYPES
// =============================================================================

/// One broadcast event. `data` is the payload exactly as it goes on the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelayEvent {
    pub id: u64,
    pub data: Arc<str>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ClientCounts {
    pub connected: usize,
    pub ready: usize,
}

#[derive(Debug, Clone)]
pub struct Published {
    pub event: RelayEvent,
    /// Clients whose buffer accepted the event.
    pub delivered: usize,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum HubError {
    #[error("timed out after {waited:?} waiting for {min} clients (have {have})")]
    Timeout { min: usize, have: usize, waited: Duration },
}

struct ClientSlot {
    tx: mpsc::Sender<RelayEvent>,
    ready: bool,
}

struct HubInner {
    next_id: u64,
    backlog: VecDeque<RelayEvent>,
    clients: HashMap<Uuid, ClientSlot>,
    closed: bool,
}

impl HubInner {
    fn counts(&self) -> ClientCounts {
        ClientCounts { connected: self.clients.len(), ready: self.clients.values().filter(|c| c.ready).count() }
    }
}

struct Shared {
    inner: Mutex<HubInner>,
    counts: watch::Sender<ClientCounts>,
    backlog_capacity: usize,
    client_buffer: usize,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, HubInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn sync_counts(&self, inner: &HubInner) {
        self.counts.send_replace(inner.counts());
    }

    fn unregister(&self, id: Uuid) {
        let mut inner = self.lock();
        if inner.clients.remove(&id).is_some() {
            self.sync_counts(&inner);
            debug!(client_id = %id, remaining = inner.clients.len(), "sse client left");
        }
    }
}

// =============================================================================
// HUB
// =============================================================================

/// Cheap to clone; all clones share one client map.
#[derive(Clone)]
pub struct Hub {
    shared: Arc<Shared>,
}

impl Hub {
    #[must_use]
    pub fn new(backlog_capacity: usize, client_buffer: usize) -> Self {
        let (counts, _) = watch::channel(ClientCounts::default());
        Self {
            shared: Arc::new(Shared {
                inner: Mutex::new(HubInner {
                    next_id: 1,
                    backlog: VecDeque::with_capacity(backlog_capacity),
                    clients: HashMap::new(),
                    closed: false,
                }),
                counts,
                backlog_capacity,
                client_buffer: client_buffer.max(1),
            }),
        }
    }

    /// Register a new client, optionally replaying the backlog to it first.
    #[must_use]
    pub fn subscribe(&self, replay: bool) -> Subscription {
        let id = Uuid::new_v4();
        let mut inner = self.shared.lock();

        let capacity = self.shared.client_buffer.max(inner.backlog.len());
        let (tx, rx) = mpsc::channel(capacity.max(1));

        if inner.closed {
            debug!(client_id = %id, "hub closed; subscription ends immediately");
            return Subscription { id, rx, shared: Arc::clone(&self.shared) };
        }

        let mut replayed = 0usize;
        if replay {
            for event in &inner.backlog {
                if tx.try_send(event.clone()).is_ok() {
                    replayed += 1;
                }
            }
        }
        inner.clients.insert(id, ClientSlot { tx, ready: false });
        self.shared.sync_counts(&inner);
        info!(client_id = %id, replayed, connected = inner.clients.len(), "sse client joined");

        Subscription { id, rx, shared: Arc::clone(&self.shared) }
    }

    /// Assign the next id, remember the event, and fan it out.
    pub fn publish(&self, data: impl Into<Arc<str>>) -> Published {
        let mut inner = self.shared.lock();
        let event = RelayEvent { id: inner.next_id, data: data.into() };
        inner.next_id += 1;

        if self.shared.backlog_capacity > 0 {
            inner.backlog.push_back(event.clone());
            while inner.backlog.len() > self.shared.backlog_capacity {
                inner.backlog.pop_front();
            }
        }

        let mut delivered = 0usize;
        let mut gone = Vec::new();
        for (client_id, slot) in &inner.clients {
            match slot.tx.try_send(event.clone()) {
                Ok(()) => delivered += 1,
                Err(mpsc::error::TrySendError::Full(_)) => {
                    debug!(client_id = %client_id, event_id = event.id, "sse client buffer full; event dropped");
                }
                Err(mpsc::error::TrySendError::Closed(_)) => gone.push(*client_id),
            }
        }
        if !gone.is_empty() {
            for client_id in &gone {
                inner.clients.remove(client_id);
            }
            self.shared.sync_counts(&inner);
        }

        debug!(event_id = event.id, delivered, pruned = gone.len(), "event published");
        Published { event, delivered }
    }

    /// Flag a connected client as ready. False if the client is unknown.
    pub fn mark_ready(&self, client_id: Uuid) -> bool {
        let mut inner = self.shared.lock();
        let Some(slot) = inner.clients.get_mut(&client_id) else {
            return false;
        };
        slot.ready = true;
        self.shared.sync_counts(&inner);
        info!(client_id = %client_id, "sse client ready");
        true
    }

    #[must_use]
    pub fn counts(&self) -> ClientCounts {
        *self.shared.counts.borrow()
    }

    /// Events currently held for replay, oldest first.
    #[must_use]
    pub fn backlog(&self) -> Vec<RelayEvent> {
        self.shared.lock().backlog.iter().cloned().collect()
    }

    pub async fn wait_connected(&self, min: usize, timeout: Duration) -> Result<ClientCounts, HubError> {
        self.wait_for(min, timeout, |c| c.connected).await
    }

    pub async fn wait_ready(&self, min: usize, timeout: Duration) -> Result<ClientCounts, HubError> {
        self.wait_for(min, timeout, |c| c.ready).await
    }

    async fn wait_for(
        &self,
        min: usize,
        timeout: Duration,
        pick: fn(&ClientCounts) -> usize,
    ) -> Result<ClientCounts, HubError> {
        let mut rx = self.shared.counts.subscribe();
        let waited = tokio::time::timeout(timeout, rx.wait_for(|c| pick(c) >= min)).await;
        match waited {
            Ok(Ok(counts)) => Ok(*counts),
            // The sender lives as long as the hub, so a closed channel only
            // means the wait can never succeed.
            Ok(Err(_)) | Err(_) => Err(HubError::Timeout { min, have: pick(&self.counts()), waited: timeout }),
        }
    }

    /// Drop every client so their streams end, and refuse new ones.
    pub fn close_all(&self) {
        let mut inner = self.shared.lock();
        inner.closed = true;
        let dropped = inner.clients.len();
        inner.clients.clear();
        self.shared.sync_counts(&inner);
        info!(dropped, "sse clients closed");
    }
}

// =============================================================================
// SUBSCRIPTION
// =============================================================================

/// One client's view of the hub. Dropping it unregisters the client.
pub struct Subscription {
    id: Uuid,
    rx: mpsc::Receiver<RelayEvent>,
    shared: Arc<Shared>,
}

impl Subscription {
    #[must_use]
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Next event, or `None` once the hub has dropped this client.
    pub async fn recv(&mut self) -> Option<RelayEvent> {
        self.rx.recv().await
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.shared.unregister(self.id);
    }
}

#[cfg(test)]
#[path = "hub_test.rs"]
mod tests;
