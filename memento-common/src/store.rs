//! Durable record store contracts
//!
//! [`ContributionStore`] is the sole writer of persisted moderation status.
//! Implementations publish a change notification after every committed write.

use async_trait::async_trait;
use uuid::Uuid;

use crate::models::{
    Contribution, ContributionCounts, ContributionDraft, ContributionStatus, Event, EventSettings,
    EventStatus, NewEvent, SortOrder,
};
use crate::Result;

/// Guest contributions and their moderation status
#[async_trait]
pub trait ContributionStore: Send + Sync {
    /// Persist a validated draft
    ///
    /// Status is `pending`, or `approved` when the owning event auto-approves.
    async fn create(&self, draft: ContributionDraft) -> Result<Contribution>;

    async fn get(&self, id: Uuid) -> Result<Contribution>;

    /// Move a contribution to `status`, enforcing the moderation state machine
    ///
    /// Fails with `NotFound` for unknown ids and `InvalidInput` for disallowed
    /// transitions; never partially applied.
    async fn update_status(&self, id: Uuid, status: ContributionStatus) -> Result<Contribution>;

    /// Remove a contribution, returning the removed record
    async fn delete(&self, id: Uuid) -> Result<Contribution>;

    /// Contributions of one event ordered by creation time
    async fn list(
        &self,
        event_id: Uuid,
        status: Option<ContributionStatus>,
        order: SortOrder,
    ) -> Result<Vec<Contribution>>;

    async fn counts(&self, event_id: Uuid) -> Result<ContributionCounts>;
}

/// Event records and configuration lookup
#[async_trait]
pub trait EventDirectory: Send + Sync {
    /// Create an event owned by `host_user_id` with a fresh unique code
    async fn create_event(&self, host_user_id: &str, new_event: NewEvent) -> Result<Event>;

    async fn get_event(&self, id: Uuid) -> Result<Event>;

    /// Resolve a guest entry code (case-insensitive) to an active event
    async fn find_active_by_code(&self, code: &str) -> Result<Event>;

    async fn list_events(&self, host_user_id: &str) -> Result<Vec<Event>>;

    async fn update_settings(&self, id: Uuid, settings: EventSettings) -> Result<Event>;

    async fn update_event_status(&self, id: Uuid, status: EventStatus) -> Result<Event>;
}
