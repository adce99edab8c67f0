//! Change feed over SSE (host)
//!
//! Streams `insert`, `update` and `delete` events for one event's
//! contributions. A client that falls behind receives a `resync` event with
//! the number of missed changes and should reload its view.

use std::convert::Infallible;
use std::time::Duration;

use axum::{
    extract::State,
    response::sse::{Event, KeepAlive, Sse},
    routing::get,
    Router,
};
use futures::stream::Stream;
use memento_common::events::FeedError;
use serde_json::json;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::auth::HostIdentity;
use super::extract::ApiPath;
use crate::error::ApiResult;
use crate::moderation::owned_event;
use crate::AppState;

pub(crate) const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(15);

/// GET /api/events/:id/feed
pub async fn change_feed(
    State(state): State<AppState>,
    host: HostIdentity,
    ApiPath(event_id): ApiPath<Uuid>,
) -> ApiResult<Sse<impl Stream<Item = Result<Event, Infallible>>>> {
    owned_event(state.events.as_ref(), event_id, host.as_str()).await?;
    let mut subscription = state.feed.subscribe(event_id);
    info!("SSE: change feed opened for event {}", event_id);

    let stream = async_stream::stream! {
        yield Ok(Event::default().event("connected").data(event_id.to_string()));

        loop {
            match subscription.recv().await {
                Ok(change) => match serde_json::to_string(&change) {
                    Ok(data) => {
                        debug!("SSE: {} {} for event {}", change.kind.as_str(), change.id, event_id);
                        yield Ok(Event::default().event(change.kind.as_str()).data(data));
                    }
                    Err(e) => warn!("SSE: Failed to serialize change {}: {}", change.id, e),
                },
                Err(FeedError::Lagged(missed)) => {
                    yield Ok(Event::default()
                        .event("resync")
                        .data(json!({ "missed": missed }).to_string()));
                }
                Err(FeedError::Closed) => {
                    info!("SSE: change feed closed for event {}", event_id);
                    break;
                }
            }
        }
    };

    // Heartbeats come from keep-alive only
    Ok(Sse::new(stream).keep_alive(KeepAlive::new().interval(HEARTBEAT_INTERVAL).text("heartbeat")))
}

pub fn feed_routes() -> Router<AppState> {
    Router::new().route("/api/events/:id/feed", get(change_feed))
}
