//! Export download (host)

use axum::{
    extract::State,
    http::header,
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use serde::Deserialize;
use uuid::Uuid;

use super::auth::HostIdentity;
use super::extract::{ApiPath, ApiQuery};
use crate::error::ApiResult;
use crate::export::{export_event, ExportFormat};
use crate::moderation::owned_event;
use crate::notify::{Notification, NotificationKind};
use crate::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct ExportQuery {
    #[serde(default)]
    pub format: ExportFormat,
}

/// GET /api/events/:id/export?format=zip|pdf
pub async fn export(
    State(state): State<AppState>,
    host: HostIdentity,
    ApiPath(event_id): ApiPath<Uuid>,
    ApiQuery(query): ApiQuery<ExportQuery>,
) -> ApiResult<Response> {
    let event = owned_event(state.events.as_ref(), event_id, host.as_str()).await?;
    let artifact = export_event(
        state.store.as_ref(),
        state.media.as_ref(),
        &event,
        query.format,
        memento_common::time::now(),
    )
    .await?;
    state.notify(Notification::new(NotificationKind::ExportReady, &event));

    let headers = [
        (header::CONTENT_TYPE, artifact.content_type.to_string()),
        (
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}\"", artifact.file_name),
        ),
    ];
    Ok((headers, artifact.bytes).into_response())
}

pub fn export_routes() -> Router<AppState> {
    Router::new().route("/api/events/:id/export", get(export))
}
