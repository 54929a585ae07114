//! `GET /events`: the SSE stream.
//!
//! The first event is a `hello` carrying the client id (used for
//! `POST /ready`). It has no `id:` line so it never collides with relay
//! event ids. Backlog replay and live events follow through the hub
//! subscription; the stream ends when the hub drops the client.

use std::convert::Infallible;

use axum::extract::{Query, State};
use axum::response::sse::{Event, KeepAlive, Sse};
use futures::stream::{self, Stream, StreamExt};
use serde::Deserialize;
use serde_json::json;

use crate::hub::{RelayEvent, Subscription};
use crate::message::HELLO_TYPE;
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct EventsQuery {
    pub replay: Option<String>,
}

impl EventsQuery {
    /// Replay is on unless explicitly disabled.
    #[must_use]
    pub fn replay(&self) -> bool {
        !matches!(self.replay.as_deref().map(str::trim), Some("0" | "false" | "no" | "off"))
    }
}

pub async fn events(
    State(state): State<AppState>,
    Query(query): Query<EventsQuery>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let subscription = state.hub.subscribe(query.replay());
    Sse::new(event_stream(subscription)).keep_alive(KeepAlive::new().interval(state.config.keepalive))
}

/// Hello first, then every relay event until the hub lets go.
pub fn event_stream(subscription: Subscription) -> impl Stream<Item = Result<Event, Infallible>> {
    let hello = hello_event(&subscription);
    let relayed = stream::unfold(subscription, |mut sub| async move {
        let event = sub.recv().await?;
        Some((Ok(relay_event(&event)), sub))
    });
    stream::once(async move { Ok(hello) }).chain(relayed)
}

fn hello_event(subscription: &Subscription) -> Event {
    let payload = json!({ "type": HELLO_TYPE, "clientId": subscription.id() });
    Event::default().data(payload.to_string())
}

fn relay_event(event: &RelayEvent) -> Event {
    Event::default().id(event.id.to_string()).data(&*event.data)
}

#[cfg(test)]
#[path = "events_test.rs"]
mod tests;
