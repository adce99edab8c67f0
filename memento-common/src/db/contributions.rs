//! Contribution queries
//!
//! Status changes and deletes run inside a transaction so the read-check-write
//! sequence is atomic with respect to concurrent moderators.

use chrono::{DateTime, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, Sqlite, SqlitePool, Transaction};
use uuid::Uuid;

use crate::models::{
    Contribution, ContributionCounts, ContributionDraft, ContributionKind, ContributionStatus,
    EventSettings, Payload, SortOrder,
};
use crate::{time, uuid_utils, Error, Result};

const CONTRIBUTION_COLUMNS: &str = "id, event_id, guest_name, type, content_url, text_content, \
                                    thumbnail_url, question_answered, status, duration_seconds, \
                                    file_size_bytes, created_at, updated_at";

fn contribution_from_row(row: &SqliteRow) -> Result<Contribution> {
    let id: String = row.try_get("id")?;
    let event_id: String = row.try_get("event_id")?;
    let kind: ContributionKind = row.try_get::<String, _>("type")?.parse()?;
    let status: ContributionStatus = row.try_get::<String, _>("status")?.parse()?;
    let content_url: Option<String> = row.try_get("content_url")?;
    let text_content: Option<String> = row.try_get("text_content")?;
    let duration_seconds: Option<i64> = row.try_get("duration_seconds")?;
    let file_size_bytes: Option<i64> = row.try_get("file_size_bytes")?;
    let created_at: String = row.try_get("created_at")?;
    let updated_at: String = row.try_get("updated_at")?;

    let payload = match (kind.is_media(), content_url, text_content) {
        (true, Some(url), _) => Payload::Media { url },
        (false, _, Some(content)) => Payload::Text { content },
        _ => {
            return Err(Error::Internal(format!(
                "Contribution {} has no {} payload",
                id, kind
            )))
        }
    };

    Ok(Contribution {
        id: uuid_utils::parse_stored(&id)?,
        event_id: uuid_utils::parse_stored(&event_id)?,
        guest_name: row.try_get("guest_name")?,
        kind,
        payload,
        thumbnail_url: row.try_get("thumbnail_url")?,
        question_answered: row.try_get("question_answered")?,
        status,
        duration_seconds: duration_seconds.map(|d| d as u32),
        file_size_bytes: file_size_bytes.map(|s| s as u64),
        created_at: time::from_db(&created_at)?,
        updated_at: time::from_db(&updated_at)?,
    })
}

async fn fetch_in_tx(tx: &mut Transaction<'_, Sqlite>, id: Uuid) -> Result<Option<Contribution>> {
    let sql = format!("SELECT {} FROM contributions WHERE id = ?", CONTRIBUTION_COLUMNS);
    let row = sqlx::query(&sql)
        .bind(id.to_string())
        .fetch_optional(&mut **tx)
        .await?;
    row.as_ref().map(contribution_from_row).transpose()
}

/// Insert a validated draft
///
/// The initial status follows the owning event's `auto_approve` setting, read
/// in the same transaction.
pub async fn insert_contribution(
    pool: &SqlitePool,
    draft: &ContributionDraft,
    now: DateTime<Utc>,
) -> Result<Contribution> {
    if !draft.payload.fits(draft.kind) {
        return Err(Error::InvalidInput(format!(
            "Payload does not match contribution type {}",
            draft.kind
        )));
    }

    let mut tx = pool.begin().await?;

    let settings: Option<String> = sqlx::query_scalar("SELECT settings FROM events WHERE id = ?")
        .bind(draft.event_id.to_string())
        .fetch_optional(&mut *tx)
        .await?;
    let settings = match settings {
        Some(json) => EventSettings::from_json(&json)?,
        None => return Err(Error::NotFound(format!("Event {}", draft.event_id))),
    };
    let status = if settings.auto_approve {
        ContributionStatus::Approved
    } else {
        ContributionStatus::Pending
    };

    let id = uuid_utils::generate();
    let now_str = time::to_db(&now);

    sqlx::query(
        r#"
        INSERT INTO contributions (id, event_id, guest_name, type, content_url, text_content,
                                   thumbnail_url, question_answered, status, duration_seconds,
                                   file_size_bytes, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(id.to_string())
    .bind(draft.event_id.to_string())
    .bind(&draft.guest_name)
    .bind(draft.kind.as_str())
    .bind(draft.payload.media_url())
    .bind(draft.payload.text())
    .bind(draft.thumbnail_url.as_deref())
    .bind(draft.question_answered.as_deref())
    .bind(status.as_str())
    .bind(draft.duration_seconds.map(i64::from))
    .bind(draft.file_size_bytes.map(|s| s as i64))
    .bind(&now_str)
    .bind(&now_str)
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;

    Ok(Contribution {
        id,
        event_id: draft.event_id,
        guest_name: draft.guest_name.clone(),
        kind: draft.kind,
        payload: draft.payload.clone(),
        thumbnail_url: draft.thumbnail_url.clone(),
        question_answered: draft.question_answered.clone(),
        status,
        duration_seconds: draft.duration_seconds,
        file_size_bytes: draft.file_size_bytes,
        created_at: now,
        updated_at: now,
    })
}

pub async fn get_contribution(pool: &SqlitePool, id: Uuid) -> Result<Option<Contribution>> {
    let sql = format!("SELECT {} FROM contributions WHERE id = ?", CONTRIBUTION_COLUMNS);
    let row = sqlx::query(&sql)
        .bind(id.to_string())
        .fetch_optional(pool)
        .await?;
    row.as_ref().map(contribution_from_row).transpose()
}

/// Outcome of a status change
#[derive(Debug, Clone)]
pub struct StatusChange {
    pub contribution: Contribution,
    /// False when the contribution already had the requested status
    pub changed: bool,
}

/// Move a contribution to `status`, enforcing the moderation state machine
pub async fn set_status(
    pool: &SqlitePool,
    id: Uuid,
    status: ContributionStatus,
    now: DateTime<Utc>,
) -> Result<StatusChange> {
    let mut tx = pool.begin().await?;

    let mut contribution = fetch_in_tx(&mut tx, id)
        .await?
        .ok_or_else(|| Error::NotFound(format!("Contribution {}", id)))?;

    if !contribution.status.can_transition_to(status) {
        return Err(Error::InvalidInput(format!(
            "Cannot move contribution from {} to {}",
            contribution.status, status
        )));
    }

    if contribution.status == status {
        tx.commit().await?;
        return Ok(StatusChange {
            contribution,
            changed: false,
        });
    }

    sqlx::query("UPDATE contributions SET status = ?, updated_at = ? WHERE id = ?")
        .bind(status.as_str())
        .bind(time::to_db(&now))
        .bind(id.to_string())
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;

    contribution.status = status;
    contribution.updated_at = now;
    Ok(StatusChange {
        contribution,
        changed: true,
    })
}

/// Delete a contribution; `None` if it did not exist
pub async fn delete_contribution(pool: &SqlitePool, id: Uuid) -> Result<Option<Contribution>> {
    let mut tx = pool.begin().await?;

    let Some(contribution) = fetch_in_tx(&mut tx, id).await? else {
        return Ok(None);
    };

    sqlx::query("DELETE FROM contributions WHERE id = ?")
        .bind(id.to_string())
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;
    Ok(Some(contribution))
}

/// Contributions of an event, optionally filtered by status, ordered by creation time
///
/// Rows created within the same microsecond keep insertion order.
pub async fn list_contributions(
    pool: &SqlitePool,
    event_id: Uuid,
    status: Option<ContributionStatus>,
    order: SortOrder,
) -> Result<Vec<Contribution>> {
    let direction = match order {
        SortOrder::Ascending => "ASC",
        SortOrder::Descending => "DESC",
    };
    let status_clause = if status.is_some() { " AND status = ?" } else { "" };
    let sql = format!(
        "SELECT {} FROM contributions WHERE event_id = ?{} ORDER BY created_at {}, rowid {}",
        CONTRIBUTION_COLUMNS, status_clause, direction, direction
    );

    let mut query = sqlx::query(&sql).bind(event_id.to_string());
    if let Some(status) = status {
        query = query.bind(status.as_str());
    }
    let rows = query.fetch_all(pool).await?;
    rows.iter().map(contribution_from_row).collect()
}

/// Per-status and per-kind tallies for one event
pub async fn count_contributions(pool: &SqlitePool, event_id: Uuid) -> Result<ContributionCounts> {
    let rows: Vec<(String, String, i64)> = sqlx::query_as(
        "SELECT type, status, COUNT(*) FROM contributions WHERE event_id = ? GROUP BY type, status",
    )
    .bind(event_id.to_string())
    .fetch_all(pool)
    .await?;

    let mut counts = ContributionCounts::default();
    for (kind, status, n) in rows {
        let n = n as u64;
        counts.total += n;
        match status.parse::<ContributionStatus>()? {
            ContributionStatus::Pending => counts.pending += n,
            ContributionStatus::Approved => counts.approved += n,
            ContributionStatus::Rejected => counts.rejected += n,
        }
        match kind.parse::<ContributionKind>()? {
            ContributionKind::Video => counts.videos += n,
            ContributionKind::Photo => counts.photos += n,
            ContributionKind::Text => counts.texts += n,
        }
    }
    Ok(counts)
}
