//! Moderation endpoints (host)
//!
//! Every route opens a [`ModerationController`] for the path's event, which
//! checks ownership before anything else happens.

use axum::{
    extract::State,
    http::StatusCode,
    routing::{delete, get, post, put},
    Json, Router,
};
use memento_common::{ChangeEvent, Contribution, ContributionStatus, Error, SortOrder};
use serde::Deserialize;
use uuid::Uuid;

use super::auth::HostIdentity;
use super::extract::{ApiJson, ApiPath, ApiQuery};
use crate::error::{ApiError, ApiResult};
use crate::moderation::{BulkAction, BulkReport, ModerationBoard, ModerationController, Partition};
use crate::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    pub status: Option<ContributionStatus>,
    #[serde(default)]
    pub order: SortOrder,
}

#[derive(Debug, Deserialize)]
pub struct StatusRequest {
    pub status: ContributionStatus,
}

#[derive(Debug, Deserialize)]
pub struct BulkRequest {
    pub ids: Vec<Uuid>,
    pub action: BulkAction,
}

async fn controller(state: &AppState, event_id: Uuid, host: &HostIdentity) -> ApiResult<ModerationController> {
    Ok(ModerationController::open(
        state.events.as_ref(),
        state.store.clone(),
        state.media.clone(),
        event_id,
        host.as_str(),
    )
    .await?)
}

fn updated(change: ChangeEvent<Contribution>) -> ApiResult<Json<Contribution>> {
    let id = change.id;
    change
        .record
        .map(Json)
        .ok_or_else(|| Error::Internal(format!("Update of {} carried no record", id)).into())
}

/// GET /api/events/:id/contributions?status=&order=
pub async fn list_contributions(
    State(state): State<AppState>,
    host: HostIdentity,
    ApiPath(event_id): ApiPath<Uuid>,
    ApiQuery(query): ApiQuery<ListQuery>,
) -> ApiResult<Json<Vec<Contribution>>> {
    let controller = controller(&state, event_id, &host).await?;
    let contributions = state
        .store
        .list(controller.event().id, query.status, query.order)
        .await?;
    Ok(Json(contributions))
}

/// GET /api/events/:id/moderation
///
/// All contributions split into the pending/approved/rejected tabs.
pub async fn moderation_board(
    State(state): State<AppState>,
    host: HostIdentity,
    ApiPath(event_id): ApiPath<Uuid>,
) -> ApiResult<Json<Partition>> {
    let controller = controller(&state, event_id, &host).await?;
    let contributions = state
        .store
        .list(controller.event().id, None, SortOrder::Descending)
        .await?;
    Ok(Json(ModerationBoard::new(contributions).partition()))
}

/// PUT /api/events/:id/contributions/:cid/status
pub async fn set_status(
    State(state): State<AppState>,
    host: HostIdentity,
    ApiPath((event_id, contribution_id)): ApiPath<(Uuid, Uuid)>,
    ApiJson(request): ApiJson<StatusRequest>,
) -> ApiResult<Json<Contribution>> {
    let controller = controller(&state, event_id, &host).await?;
    updated(controller.set_status(contribution_id, request.status).await?)
}

/// POST /api/events/:id/contributions/:cid/withdraw
pub async fn withdraw(
    State(state): State<AppState>,
    host: HostIdentity,
    ApiPath((event_id, contribution_id)): ApiPath<(Uuid, Uuid)>,
) -> ApiResult<Json<Contribution>> {
    let controller = controller(&state, event_id, &host).await?;
    updated(controller.withdraw(contribution_id).await?)
}

/// POST /api/events/:id/contributions/:cid/restore
pub async fn restore(
    State(state): State<AppState>,
    host: HostIdentity,
    ApiPath((event_id, contribution_id)): ApiPath<(Uuid, Uuid)>,
) -> ApiResult<Json<Contribution>> {
    let controller = controller(&state, event_id, &host).await?;
    updated(controller.restore(contribution_id).await?)
}

/// DELETE /api/events/:id/contributions/:cid
pub async fn delete_contribution(
    State(state): State<AppState>,
    host: HostIdentity,
    ApiPath((event_id, contribution_id)): ApiPath<(Uuid, Uuid)>,
) -> ApiResult<StatusCode> {
    let controller = controller(&state, event_id, &host).await?;
    controller.delete(contribution_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/events/:id/contributions/bulk
///
/// Any per-item failure turns the whole response into `BULK_FAILED`, listing
/// the failed ids; items that succeeded stay applied.
pub async fn bulk(
    State(state): State<AppState>,
    host: HostIdentity,
    ApiPath(event_id): ApiPath<Uuid>,
    ApiJson(request): ApiJson<BulkRequest>,
) -> ApiResult<Json<BulkReport>> {
    if request.ids.is_empty() {
        return Err(ApiError::BadRequest("no contributions selected".to_string()));
    }
    let controller = controller(&state, event_id, &host).await?;
    let report = controller.bulk(&request.ids, request.action).await;
    if !report.is_complete() {
        return Err(ApiError::BulkFailed {
            failed: report.failed,
            total: report.total,
        });
    }
    Ok(Json(report))
}

pub fn moderation_routes() -> Router<AppState> {
    Router::new()
        .route("/api/events/:id/contributions", get(list_contributions))
        .route("/api/events/:id/contributions/bulk", post(bulk))
        .route("/api/events/:id/contributions/:cid", delete(delete_contribution))
        .route("/api/events/:id/contributions/:cid/status", put(set_status))
        .route("/api/events/:id/contributions/:cid/withdraw", post(withdraw))
        .route("/api/events/:id/contributions/:cid/restore", post(restore))
        .route("/api/events/:id/moderation", get(moderation_board))
}
