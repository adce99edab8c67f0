//! Event queries

use chrono::{DateTime, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

use crate::models::{Event, EventSettings, EventStatus, NewEvent};
use crate::{time, uuid_utils, Result};

const EVENT_COLUMNS: &str = "id, host_user_id, title, description, event_date, event_code, \
                             status, settings, created_at, updated_at";

fn event_from_row(row: &SqliteRow) -> Result<Event> {
    let id: String = row.try_get("id")?;
    let status: String = row.try_get("status")?;
    let settings: String = row.try_get("settings")?;
    let event_date: String = row.try_get("event_date")?;
    let created_at: String = row.try_get("created_at")?;
    let updated_at: String = row.try_get("updated_at")?;

    Ok(Event {
        id: uuid_utils::parse_stored(&id)?,
        host_user_id: row.try_get("host_user_id")?,
        title: row.try_get("title")?,
        description: row.try_get("description")?,
        event_date: time::from_db(&event_date)?,
        event_code: row.try_get("event_code")?,
        status: status.parse()?,
        settings: EventSettings::from_json(&settings)?,
        created_at: time::from_db(&created_at)?,
        updated_at: time::from_db(&updated_at)?,
    })
}

/// Insert a validated event with the given code
///
/// Fails with a unique-violation database error if the code is taken.
pub async fn insert_event(
    pool: &SqlitePool,
    host_user_id: &str,
    new_event: &NewEvent,
    event_code: &str,
    now: DateTime<Utc>,
) -> Result<Event> {
    let id = uuid_utils::generate();
    let now_str = time::to_db(&now);

    sqlx::query(
        r#"
        INSERT INTO events (id, host_user_id, title, description, event_date, event_code,
                            status, settings, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(id.to_string())
    .bind(host_user_id)
    .bind(&new_event.title)
    .bind(new_event.description.as_deref())
    .bind(time::to_db(&new_event.event_date))
    .bind(event_code)
    .bind(new_event.status.as_str())
    .bind(new_event.settings.to_json()?)
    .bind(&now_str)
    .bind(&now_str)
    .execute(pool)
    .await?;

    Ok(Event {
        id,
        host_user_id: host_user_id.to_string(),
        title: new_event.title.clone(),
        description: new_event.description.clone(),
        event_date: new_event.event_date,
        event_code: event_code.to_string(),
        status: new_event.status,
        settings: new_event.settings.clone(),
        created_at: now,
        updated_at: now,
    })
}

pub async fn get_event(pool: &SqlitePool, id: Uuid) -> Result<Option<Event>> {
    let sql = format!("SELECT {} FROM events WHERE id = ?", EVENT_COLUMNS);
    let row = sqlx::query(&sql)
        .bind(id.to_string())
        .fetch_optional(pool)
        .await?;
    row.as_ref().map(event_from_row).transpose()
}

/// Look up an event by its canonical code
pub async fn get_event_by_code(pool: &SqlitePool, event_code: &str) -> Result<Option<Event>> {
    let sql = format!("SELECT {} FROM events WHERE event_code = ?", EVENT_COLUMNS);
    let row = sqlx::query(&sql)
        .bind(event_code)
        .fetch_optional(pool)
        .await?;
    row.as_ref().map(event_from_row).transpose()
}

/// Events of one host, newest first
pub async fn list_events_for_host(pool: &SqlitePool, host_user_id: &str) -> Result<Vec<Event>> {
    let sql = format!(
        "SELECT {} FROM events WHERE host_user_id = ? ORDER BY created_at DESC, rowid DESC",
        EVENT_COLUMNS
    );
    let rows = sqlx::query(&sql)
        .bind(host_user_id)
        .fetch_all(pool)
        .await?;
    rows.iter().map(event_from_row).collect()
}

/// Replace the settings of an event; `None` if it does not exist
pub async fn update_event_settings(
    pool: &SqlitePool,
    id: Uuid,
    settings: &EventSettings,
    now: DateTime<Utc>,
) -> Result<Option<Event>> {
    let result = sqlx::query("UPDATE events SET settings = ?, updated_at = ? WHERE id = ?")
        .bind(settings.to_json()?)
        .bind(time::to_db(&now))
        .bind(id.to_string())
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Ok(None);
    }
    get_event(pool, id).await
}

pub async fn update_event_status(
    pool: &SqlitePool,
    id: Uuid,
    status: EventStatus,
    now: DateTime<Utc>,
) -> Result<Option<Event>> {
    let result = sqlx::query("UPDATE events SET status = ?, updated_at = ? WHERE id = ?")
        .bind(status.as_str())
        .bind(time::to_db(&now))
        .bind(id.to_string())
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Ok(None);
    }
    get_event(pool, id).await
}
