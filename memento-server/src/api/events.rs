//! Event management endpoints (host)

use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, put},
    Json, Router,
};
use memento_common::{ContributionCounts, Event, EventSettings, EventStatus, NewEvent};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use super::auth::HostIdentity;
use super::extract::{ApiJson, ApiPath};
use crate::error::ApiResult;
use crate::moderation::owned_event;
use crate::notify::{Notification, NotificationKind};
use crate::AppState;

/// Event with its dashboard counts
#[derive(Debug, Serialize)]
pub struct EventSummary {
    #[serde(flatten)]
    pub event: Event,
    pub counts: ContributionCounts,
}

#[derive(Debug, Deserialize)]
pub struct StatusRequest {
    pub status: EventStatus,
}

/// POST /api/events
pub async fn create_event(
    State(state): State<AppState>,
    host: HostIdentity,
    ApiJson(request): ApiJson<NewEvent>,
) -> ApiResult<(StatusCode, Json<Event>)> {
    let event = state.events.create_event(host.as_str(), request).await?;
    info!("Host {} created event {} ({})", host.as_str(), event.id, event.event_code);
    Ok((StatusCode::CREATED, Json(event)))
}

/// GET /api/events
///
/// The caller's events, newest first.
pub async fn list_events(
    State(state): State<AppState>,
    host: HostIdentity,
) -> ApiResult<Json<Vec<EventSummary>>> {
    let events = state.events.list_events(host.as_str()).await?;
    let mut summaries = Vec::with_capacity(events.len());
    for event in events {
        let counts = state.store.counts(event.id).await?;
        summaries.push(EventSummary { event, counts });
    }
    Ok(Json(summaries))
}

/// GET /api/events/:id
pub async fn get_event(
    State(state): State<AppState>,
    host: HostIdentity,
    ApiPath(event_id): ApiPath<Uuid>,
) -> ApiResult<Json<EventSummary>> {
    let event = owned_event(state.events.as_ref(), event_id, host.as_str()).await?;
    let counts = state.store.counts(event.id).await?;
    Ok(Json(EventSummary { event, counts }))
}

/// PUT /api/events/:id/settings
pub async fn update_settings(
    State(state): State<AppState>,
    host: HostIdentity,
    ApiPath(event_id): ApiPath<Uuid>,
    ApiJson(settings): ApiJson<EventSettings>,
) -> ApiResult<Json<Event>> {
    owned_event(state.events.as_ref(), event_id, host.as_str()).await?;
    let event = state.events.update_settings(event_id, settings).await?;
    info!("Settings of event {} updated", event_id);
    Ok(Json(event))
}

/// PUT /api/events/:id/status
pub async fn update_status(
    State(state): State<AppState>,
    host: HostIdentity,
    ApiPath(event_id): ApiPath<Uuid>,
    ApiJson(request): ApiJson<StatusRequest>,
) -> ApiResult<Json<Event>> {
    let before = owned_event(state.events.as_ref(), event_id, host.as_str()).await?;
    let event = state.events.update_event_status(event_id, request.status).await?;
    info!("Event {} is now {}", event_id, event.status.as_str());
    if event.status == EventStatus::Archived && before.status != EventStatus::Archived {
        state.notify(Notification::new(NotificationKind::EventComplete, &event));
    }
    Ok(Json(event))
}

pub fn event_routes() -> Router<AppState> {
    Router::new()
        .route("/api/events", get(list_events).post(create_event))
        .route("/api/events/:id", get(get_event))
        .route("/api/events/:id/settings", put(update_settings))
        .route("/api/events/:id/status", put(update_status))
}
