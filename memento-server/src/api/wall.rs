//! Live display wall (host)
//!
//! `GET /api/events/:id/wall` returns a single frame. The SSE stream keeps a
//! [`LiveDisplay`] per connection: it advances the slideshow on a timer,
//! reconciles feed changes, and sends a `frame` event whenever what the wall
//! shows changes.

use std::convert::Infallible;
use std::time::Duration;

use axum::{
    extract::State,
    response::sse::{Event, KeepAlive, Sse},
    routing::get,
    Json, Router,
};
use futures::stream::Stream;
use memento_common::events::FeedError;
use memento_common::{Contribution, ContributionStatus, ContributionStore, SortOrder};
use serde::Deserialize;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::auth::HostIdentity;
use super::extract::{ApiPath, ApiQuery};
use super::feed::HEARTBEAT_INTERVAL;
use crate::display::{DisplayMode, LiveDisplay, WallFrame};
use crate::error::ApiResult;
use crate::moderation::owned_event;
use crate::reconcile::ViewChange;
use crate::AppState;

/// How often a wall stream checks whether the slide is due to advance
const TICK_INTERVAL: Duration = Duration::from_millis(500);

#[derive(Debug, Default, Deserialize)]
pub struct WallQuery {
    #[serde(default)]
    pub mode: DisplayMode,
}

async fn approved(store: &dyn ContributionStore, event_id: Uuid) -> memento_common::Result<Vec<Contribution>> {
    store
        .list(event_id, Some(ContributionStatus::Approved), SortOrder::Descending)
        .await
}

fn frame_event(frame: &WallFrame) -> Option<Event> {
    match serde_json::to_string(frame) {
        Ok(data) => Some(Event::default().event("frame").data(data)),
        Err(e) => {
            warn!("SSE: Failed to serialize wall frame: {}", e);
            None
        }
    }
}

/// GET /api/events/:id/wall?mode=slideshow|grid
pub async fn wall_frame(
    State(state): State<AppState>,
    host: HostIdentity,
    ApiPath(event_id): ApiPath<Uuid>,
    ApiQuery(query): ApiQuery<WallQuery>,
) -> ApiResult<Json<WallFrame>> {
    owned_event(state.events.as_ref(), event_id, host.as_str()).await?;
    let mut wall = LiveDisplay::new(approved(state.store.as_ref(), event_id).await?, state.slide_interval);
    wall.set_mode(query.mode);
    Ok(Json(wall.frame()))
}

/// GET /api/events/:id/wall/stream?mode=slideshow|grid
pub async fn wall_stream(
    State(state): State<AppState>,
    host: HostIdentity,
    ApiPath(event_id): ApiPath<Uuid>,
    ApiQuery(query): ApiQuery<WallQuery>,
) -> ApiResult<Sse<impl Stream<Item = Result<Event, Infallible>>>> {
    owned_event(state.events.as_ref(), event_id, host.as_str()).await?;

    // Subscribe before the snapshot; an overlapping change is applied idempotently
    let mut subscription = state.feed.subscribe(event_id);
    let mut wall = LiveDisplay::new(approved(state.store.as_ref(), event_id).await?, state.slide_interval);
    wall.set_mode(query.mode);
    let store = state.store.clone();
    info!("SSE: wall opened for event {} ({} approved)", event_id, wall.len());

    let stream = async_stream::stream! {
        if let Some(event) = frame_event(&wall.frame()) {
            yield Ok(event);
        }

        let mut ticker = tokio::time::interval(TICK_INTERVAL);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut last_tick = Instant::now();

        loop {
            tokio::select! {
                now = ticker.tick() => {
                    let advanced = wall.tick(now.saturating_duration_since(last_tick));
                    last_tick = now;
                    if advanced {
                        if let Some(event) = frame_event(&wall.frame()) {
                            yield Ok(event);
                        }
                    }
                }

                received = subscription.recv() => match received {
                    Ok(change) => {
                        if wall.apply(&change) != ViewChange::Unchanged {
                            debug!("SSE: wall of event {} now shows {}", event_id, wall.len());
                            if let Some(event) = frame_event(&wall.frame()) {
                                yield Ok(event);
                            }
                        }
                    }
                    Err(FeedError::Lagged(missed)) => {
                        info!("SSE: wall of event {} missed {} changes, reloading", event_id, missed);
                        match approved(store.as_ref(), event_id).await {
                            Ok(items) => {
                                wall.resync(items);
                                if let Some(event) = frame_event(&wall.frame()) {
                                    yield Ok(event);
                                }
                            }
                            Err(e) => warn!("SSE: wall of event {} could not reload: {}", event_id, e),
                        }
                    }
                    Err(FeedError::Closed) => {
                        info!("SSE: wall closed for event {}", event_id);
                        break;
                    }
                },
            }
        }
    };

    Ok(Sse::new(stream).keep_alive(KeepAlive::new().interval(HEARTBEAT_INTERVAL).text("heartbeat")))
}

pub fn wall_routes() -> Router<AppState> {
    Router::new()
        .route("/api/events/:id/wall", get(wall_frame))
        .route("/api/events/:id/wall/stream", get(wall_stream))
}
