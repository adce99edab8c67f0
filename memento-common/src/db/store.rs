//! SQLite-backed store
//!
//! Implements [`ContributionStore`] and [`EventDirectory`] and publishes a
//! [`ChangeEvent`] after every committed contribution write.

use async_trait::async_trait;
use sqlx::SqlitePool;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::{contributions, events};
use crate::event_code;
use crate::events::{ChangeEvent, ChangeFeed};
use crate::models::{
    Contribution, ContributionCounts, ContributionDraft, ContributionStatus, Event, EventSettings,
    EventStatus, NewEvent, SortOrder,
};
use crate::store::{ContributionStore, EventDirectory};
use crate::{time, Error, Result};

/// Attempts at drawing an unused event code before giving up
const MAX_CODE_ATTEMPTS: usize = 5;

#[derive(Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
    feed: ChangeFeed,
}

impl SqliteStore {
    pub fn new(pool: SqlitePool, feed: ChangeFeed) -> Self {
        Self { pool, feed }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub fn feed(&self) -> &ChangeFeed {
        &self.feed
    }
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db) if db.is_unique_violation())
}

#[async_trait]
impl ContributionStore for SqliteStore {
    async fn create(&self, draft: ContributionDraft) -> Result<Contribution> {
        let contribution = contributions::insert_contribution(&self.pool, &draft, time::now()).await?;
        info!(
            "Contribution {} ({}) created for event {} as {}",
            contribution.id, contribution.kind, contribution.event_id, contribution.status
        );
        self.feed
            .publish(contribution.event_id, ChangeEvent::insert(contribution.clone()));
        Ok(contribution)
    }

    async fn get(&self, id: Uuid) -> Result<Contribution> {
        contributions::get_contribution(&self.pool, id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("Contribution {}", id)))
    }

    async fn update_status(&self, id: Uuid, status: ContributionStatus) -> Result<Contribution> {
        let change = contributions::set_status(&self.pool, id, status, time::now()).await?;
        if change.changed {
            debug!("Contribution {} is now {}", id, status);
            self.feed.publish(
                change.contribution.event_id,
                ChangeEvent::update(change.contribution.clone()),
            );
        } else {
            debug!("Contribution {} already {}", id, status);
        }
        Ok(change.contribution)
    }

    async fn delete(&self, id: Uuid) -> Result<Contribution> {
        let removed = contributions::delete_contribution(&self.pool, id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("Contribution {}", id)))?;
        info!("Contribution {} deleted from event {}", id, removed.event_id);
        self.feed.publish(removed.event_id, ChangeEvent::delete(id));
        Ok(removed)
    }

    async fn list(
        &self,
        event_id: Uuid,
        status: Option<ContributionStatus>,
        order: SortOrder,
    ) -> Result<Vec<Contribution>> {
        contributions::list_contributions(&self.pool, event_id, status, order).await
    }

    async fn counts(&self, event_id: Uuid) -> Result<ContributionCounts> {
        contributions::count_contributions(&self.pool, event_id).await
    }
}

#[async_trait]
impl EventDirectory for SqliteStore {
    async fn create_event(&self, host_user_id: &str, new_event: NewEvent) -> Result<Event> {
        let new_event = new_event.validate()?;
        for attempt in 1..=MAX_CODE_ATTEMPTS {
            let code = event_code::generate();
            match events::insert_event(&self.pool, host_user_id, &new_event, &code, time::now())
                .await
            {
                Ok(event) => {
                    info!("Event {} '{}' created with code {}", event.id, event.title, code);
                    return Ok(event);
                }
                Err(Error::Database(e)) if is_unique_violation(&e) => {
                    warn!("Event code {} already taken (attempt {})", code, attempt);
                }
                Err(e) => return Err(e),
            }
        }
        Err(Error::Transient(format!(
            "No unused event code after {} attempts",
            MAX_CODE_ATTEMPTS
        )))
    }

    async fn get_event(&self, id: Uuid) -> Result<Event> {
        events::get_event(&self.pool, id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("Event {}", id)))
    }

    async fn find_active_by_code(&self, code: &str) -> Result<Event> {
        let canonical = event_code::normalize(code)
            .ok_or_else(|| Error::NotFound(format!("Event code {}", code.trim())))?;
        match events::get_event_by_code(&self.pool, &canonical).await? {
            Some(event) if event.accepts_contributions() => Ok(event),
            Some(event) => {
                debug!("Event code {} belongs to {} event {}", canonical, event.status.as_str(), event.id);
                Err(Error::NotFound(format!("Event code {}", canonical)))
            }
            None => Err(Error::NotFound(format!("Event code {}", canonical))),
        }
    }

    async fn list_events(&self, host_user_id: &str) -> Result<Vec<Event>> {
        events::list_events_for_host(&self.pool, host_user_id).await
    }

    async fn update_settings(&self, id: Uuid, settings: EventSettings) -> Result<Event> {
        let settings = settings.validate()?;
        let event = events::update_event_settings(&self.pool, id, &settings, time::now())
            .await?
            .ok_or_else(|| Error::NotFound(format!("Event {}", id)))?;
        info!("Settings updated for event {}", id);
        Ok(event)
    }

    async fn update_event_status(&self, id: Uuid, status: EventStatus) -> Result<Event> {
        let event = events::update_event_status(&self.pool, id, status, time::now())
            .await?
            .ok_or_else(|| Error::NotFound(format!("Event {}", id)))?;
        info!("Event {} is now {}", id, status.as_str());
        Ok(event)
    }
}
