use std::convert::Infallible;

use axum::response::sse::{Event, KeepAlive, Sse};
use serde::{de::DeserializeOwned, Serialize};
use tokio_stream::{Stream, StreamExt};
use tracing::warn;

use crate::gateway::ChangeFeed;

/// Server-sent events of a change feed, one JSON `ChangeEvent` per event.
pub fn change_events<T>(feed: ChangeFeed<T>) -> Sse<impl Stream<Item = Result<Event, Infallible>>>
where
    T: DeserializeOwned + Serialize + Send + 'static,
{
    let stream = feed
        .into_stream()
        .filter_map(|event| match Event::default().json_data(&event) {
            Ok(ev) => Some(Ok(ev)),
            Err(e) => {
                warn!(error = %e, "sse encode failed");
                None
            }
        });

    Sse::new(stream).keep_alive(KeepAlive::default())
}
