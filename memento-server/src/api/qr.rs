//! Guest links and QR codes (host)

use axum::{
    extract::State,
    http::header,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use super::auth::HostIdentity;
use super::extract::{ApiPath, ApiQuery};
use crate::error::ApiResult;
use crate::moderation::owned_event;
use crate::qr;
use crate::AppState;

/// Where guests and viewers reach an event
#[derive(Debug, Serialize)]
pub struct EventLinks {
    pub event_code: String,
    pub guest_url: String,
    pub share_url: String,
}

#[derive(Debug, Deserialize)]
pub struct QrQuery {
    #[serde(default = "default_size")]
    pub size: u32,
}

fn default_size() -> u32 {
    qr::DEFAULT_SIZE
}

/// GET /api/events/:id/links
pub async fn event_links(
    State(state): State<AppState>,
    host: HostIdentity,
    ApiPath(event_id): ApiPath<Uuid>,
) -> ApiResult<Json<EventLinks>> {
    let event = owned_event(state.events.as_ref(), event_id, host.as_str()).await?;
    Ok(Json(EventLinks {
        guest_url: state.links.guest(&event.event_code),
        share_url: state.links.share(event.id),
        event_code: event.event_code,
    }))
}

/// GET /api/events/:id/qr?size=512
///
/// PNG encoding the guest link.
pub async fn qr_code(
    State(state): State<AppState>,
    host: HostIdentity,
    ApiPath(event_id): ApiPath<Uuid>,
    ApiQuery(query): ApiQuery<QrQuery>,
) -> ApiResult<Response> {
    let event = owned_event(state.events.as_ref(), event_id, host.as_str()).await?;
    let guest_url = state.links.guest(&event.event_code);
    let png = qr::render_png(&guest_url, query.size)?;
    debug!("QR code for {} ({} bytes)", guest_url, png.len());

    let headers = [
        (header::CONTENT_TYPE, "image/png".to_string()),
        (
            header::CONTENT_DISPOSITION,
            format!("inline; filename=\"qr-{}.png\"", event.event_code),
        ),
    ];
    Ok((headers, png).into_response())
}

pub fn qr_routes() -> Router<AppState> {
    Router::new()
        .route("/api/events/:id/links", get(event_links))
        .route("/api/events/:id/qr", get(qr_code))
}
