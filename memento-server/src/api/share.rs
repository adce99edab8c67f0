//! Public share gallery

use axum::{
    extract::State,
    routing::get,
    Json, Router,
};
use chrono::{DateTime, Utc};
use memento_common::{Contribution, ContributionCounts, ContributionStatus, SortOrder};
use serde::Serialize;
use uuid::Uuid;

use super::extract::ApiPath;
use crate::error::ApiResult;
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct ShareStats {
    pub total: u64,
    pub videos: u64,
    pub photos: u64,
    pub texts: u64,
}

impl From<ContributionCounts> for ShareStats {
    fn from(counts: ContributionCounts) -> Self {
        Self {
            total: counts.total,
            videos: counts.videos,
            photos: counts.photos,
            texts: counts.texts,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ShareGallery {
    pub event_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub event_date: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub expired: bool,
    /// Absent once the link has expired
    pub stats: Option<ShareStats>,
    pub contributions: Vec<Contribution>,
}

/// GET /api/share/:id
///
/// Approved contributions, oldest first, until the link expires.
pub async fn gallery(State(state): State<AppState>, ApiPath(event_id): ApiPath<Uuid>) -> ApiResult<Json<ShareGallery>> {
    let event = state.events.get_event(event_id).await?;
    let expired = event.share_expired(memento_common::time::now());

    let (stats, contributions) = if expired {
        (None, Vec::new())
    } else {
        let approved = state
            .store
            .list(event.id, Some(ContributionStatus::Approved), SortOrder::Ascending)
            .await?;
        (Some(ContributionCounts::tally(&approved).into()), approved)
    };

    Ok(Json(ShareGallery {
        event_id: event.id,
        expires_at: event.share_expires_at(),
        title: event.title,
        description: event.description,
        event_date: event.event_date,
        expired,
        stats,
        contributions,
    }))
}

pub fn share_routes() -> Router<AppState> {
    Router::new().route("/api/share/:id", get(gallery))
}
