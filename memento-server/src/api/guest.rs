//! Guest entry (public)
//!
//! Guests reach an event through its code and submit contributions after
//! uploading any media themselves. Submissions are validated against the
//! event's current settings before anything is stored.

use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use memento_common::{Contribution, Error, Event, EventSettings};
use serde::Serialize;
use tracing::info;
use uuid::Uuid;

use super::extract::{ApiJson, ApiPath};
use crate::error::ApiResult;
use crate::notify::{Notification, NotificationKind};
use crate::validation::{self, Submission};
use crate::AppState;

/// What a guest may see of an event
#[derive(Debug, Serialize)]
pub struct GuestEvent {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub event_date: DateTime<Utc>,
    pub event_code: String,
    pub settings: EventSettings,
}

impl From<Event> for GuestEvent {
    fn from(event: Event) -> Self {
        Self {
            id: event.id,
            title: event.title,
            description: event.description,
            event_date: event.event_date,
            event_code: event.event_code,
            settings: event.settings,
        }
    }
}

/// GET /api/guest/:code
pub async fn enter(State(state): State<AppState>, ApiPath(code): ApiPath<String>) -> ApiResult<Json<GuestEvent>> {
    let event = state.events.find_active_by_code(&code).await?;
    Ok(Json(event.into()))
}

/// POST /api/guest/:code/contributions
pub async fn submit(
    State(state): State<AppState>,
    ApiPath(code): ApiPath<String>,
    ApiJson(submission): ApiJson<Submission>,
) -> ApiResult<(StatusCode, Json<Contribution>)> {
    let event = state.events.find_active_by_code(&code).await?;
    let draft = validation::validate(&event, &submission, state.media.as_ref()).map_err(Error::Validation)?;
    let contribution = state.store.create(draft).await?;
    info!(
        "New {} contribution {} for event {} ({})",
        contribution.kind.as_str(),
        contribution.id,
        event.id,
        contribution.status
    );
    state.notify(Notification::new(NotificationKind::NewContribution, &event));
    Ok((StatusCode::CREATED, Json(contribution)))
}

pub fn guest_routes() -> Router<AppState> {
    Router::new()
        .route("/api/guest/:code", get(enter))
        .route("/api/guest/:code/contributions", post(submit))
}
