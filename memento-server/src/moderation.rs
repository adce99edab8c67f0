//! Moderation
//!
//! [`ModerationController`] turns host intent into store calls for one event,
//! singly or in bulk. [`ModerationBoard`] is the host's reconciled view of all
//! of an event's contributions, split into pending/approved/rejected tabs with
//! a selection that never spans tabs.

use std::collections::HashSet;
use std::sync::Arc;

use memento_common::{
    ChangeEvent, Contribution, ContributionStatus, ContributionStore, Error, Event,
    EventDirectory, Result, SortOrder,
};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use crate::reconcile::{ReconciledView, ViewChange};
use crate::storage::MediaStorage;

/// Load an event and check that `host_user_id` owns it
pub async fn owned_event(
    events: &dyn EventDirectory,
    event_id: Uuid,
    host_user_id: &str,
) -> Result<Event> {
    let event = events.get_event(event_id).await?;
    if !event.is_owned_by(host_user_id) {
        return Err(Error::Permission(format!(
            "{} is not the host of event {}",
            host_user_id, event_id
        )));
    }
    Ok(event)
}

/// Action applied to every selected contribution
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BulkAction {
    Approve,
    Reject,
    Delete,
}

impl BulkAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            BulkAction::Approve => "approve",
            BulkAction::Reject => "reject",
            BulkAction::Delete => "delete",
        }
    }
}

/// Outcome of a bulk action
///
/// `changes` holds one change per applied item, ready to be fed into local
/// views before the feed echoes them.
#[derive(Debug, Clone, Serialize)]
pub struct BulkReport {
    pub action: BulkAction,
    pub total: usize,
    pub applied: usize,
    pub failed: Vec<Uuid>,
    #[serde(skip)]
    pub changes: Vec<ChangeEvent<Contribution>>,
}

impl BulkReport {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }

    /// Collapse any per-item failure into one aggregate error
    pub fn into_result(self) -> Result<Self> {
        if self.is_complete() {
            Ok(self)
        } else {
            Err(Error::BulkFailed {
                failed: self.failed.len(),
                total: self.total,
            })
        }
    }
}

/// Host moderation operations scoped to one event
pub struct ModerationController {
    store: Arc<dyn ContributionStore>,
    media: Arc<dyn MediaStorage>,
    event: Event,
}

impl ModerationController {
    /// Open moderation of `event_id` for `host_user_id`
    pub async fn open(
        events: &dyn EventDirectory,
        store: Arc<dyn ContributionStore>,
        media: Arc<dyn MediaStorage>,
        event_id: Uuid,
        host_user_id: &str,
    ) -> Result<Self> {
        let event = owned_event(events, event_id, host_user_id).await?;
        Ok(Self { store, media, event })
    }

    pub fn event(&self) -> &Event {
        &self.event
    }

    /// Fetch a contribution, treating one from another event as missing
    async fn contribution(&self, id: Uuid) -> Result<Contribution> {
        let contribution = self.store.get(id).await?;
        if contribution.event_id != self.event.id {
            return Err(Error::NotFound(format!(
                "Contribution {} in event {}",
                id, self.event.id
            )));
        }
        Ok(contribution)
    }

    pub async fn set_status(
        &self,
        id: Uuid,
        status: ContributionStatus,
    ) -> Result<ChangeEvent<Contribution>> {
        self.contribution(id).await?;
        let updated = self.store.update_status(id, status).await?;
        Ok(ChangeEvent::update(updated))
    }

    pub async fn approve(&self, id: Uuid) -> Result<ChangeEvent<Contribution>> {
        self.set_status(id, ContributionStatus::Approved).await
    }

    pub async fn reject(&self, id: Uuid) -> Result<ChangeEvent<Contribution>> {
        self.set_status(id, ContributionStatus::Rejected).await
    }

    /// Take an approved contribution off the wall
    pub async fn withdraw(&self, id: Uuid) -> Result<ChangeEvent<Contribution>> {
        self.expect_status(id, ContributionStatus::Approved, "withdraw").await?;
        let updated = self.store.update_status(id, ContributionStatus::Rejected).await?;
        Ok(ChangeEvent::update(updated))
    }

    /// Put a rejected contribution back on the wall
    pub async fn restore(&self, id: Uuid) -> Result<ChangeEvent<Contribution>> {
        self.expect_status(id, ContributionStatus::Rejected, "restore").await?;
        let updated = self.store.update_status(id, ContributionStatus::Approved).await?;
        Ok(ChangeEvent::update(updated))
    }

    async fn expect_status(&self, id: Uuid, status: ContributionStatus, action: &str) -> Result<()> {
        let current = self.contribution(id).await?;
        if current.status != status {
            return Err(Error::InvalidInput(format!(
                "Cannot {} a {} contribution",
                action, current.status
            )));
        }
        Ok(())
    }

    /// Delete a contribution and, best-effort, its stored payload
    pub async fn delete(&self, id: Uuid) -> Result<ChangeEvent<Contribution>> {
        self.contribution(id).await?;
        let removed = self.store.delete(id).await?;

        let references = [removed.payload.media_url(), removed.thumbnail_url.as_deref()];
        for reference in references.into_iter().flatten() {
            if let Err(e) = self.media.remove(reference).await {
                warn!("Contribution {} deleted but payload {} remains: {}", id, reference, e);
            }
        }
        Ok(ChangeEvent::delete(id))
    }

    /// Apply `action` to each id in turn
    ///
    /// A failing id is recorded and processing continues; changes already
    /// applied stay applied. Repeated ids are processed once.
    pub async fn bulk(&self, ids: &[Uuid], action: BulkAction) -> BulkReport {
        let mut seen = HashSet::new();
        let ids: Vec<Uuid> = ids.iter().copied().filter(|id| seen.insert(*id)).collect();

        let mut report = BulkReport {
            action,
            total: ids.len(),
            applied: 0,
            failed: Vec::new(),
            changes: Vec::with_capacity(ids.len()),
        };

        for id in ids {
            let outcome = match action {
                BulkAction::Approve => self.approve(id).await,
                BulkAction::Reject => self.reject(id).await,
                BulkAction::Delete => self.delete(id).await,
            };
            match outcome {
                Ok(change) => {
                    report.applied += 1;
                    report.changes.push(change);
                }
                Err(e) => {
                    warn!("Bulk {} failed for contribution {}: {}", action.as_str(), id, e);
                    report.failed.push(id);
                }
            }
        }

        info!(
            "Bulk {} on event {}: {} of {} applied",
            action.as_str(),
            self.event.id,
            report.applied,
            report.total
        );
        report
    }
}

// ============================================================================
// Moderation board
// ============================================================================

/// Contributions split by moderation status, each newest first
#[derive(Debug, Clone, Serialize)]
pub struct Partition {
    pub pending: Vec<Contribution>,
    pub approved: Vec<Contribution>,
    pub rejected: Vec<Contribution>,
}

/// Host-side reconciled view with tab-scoped selection
#[derive(Debug, Clone)]
pub struct ModerationBoard {
    view: ReconciledView<Contribution>,
    active: ContributionStatus,
    selection: HashSet<Uuid>,
}

impl ModerationBoard {
    /// Board over a snapshot of all contributions, newest first
    pub fn new(contributions: Vec<Contribution>) -> Self {
        let mut view = ReconciledView::unfiltered(SortOrder::Descending);
        view.load(contributions);
        Self {
            view,
            active: ContributionStatus::Pending,
            selection: HashSet::new(),
        }
    }

    pub fn apply(&mut self, change: &ChangeEvent<Contribution>) -> ViewChange {
        let result = self.view.apply(change);
        let active = self.active;
        let view = &self.view;
        self.selection.retain(|id| {
            view.position(*id)
                .and_then(|i| view.get(i))
                .is_some_and(|c| c.status == active)
        });
        result
    }

    /// Contributions with `status`, newest first
    pub fn subset(&self, status: ContributionStatus) -> Vec<&Contribution> {
        self.view.items().iter().filter(|c| c.status == status).collect()
    }

    pub fn partition(&self) -> Partition {
        let mut partition = Partition {
            pending: Vec::new(),
            approved: Vec::new(),
            rejected: Vec::new(),
        };
        for c in self.view.items() {
            match c.status {
                ContributionStatus::Pending => partition.pending.push(c.clone()),
                ContributionStatus::Approved => partition.approved.push(c.clone()),
                ContributionStatus::Rejected => partition.rejected.push(c.clone()),
            }
        }
        partition
    }

    pub fn active_tab(&self) -> ContributionStatus {
        self.active
    }

    /// Switch tabs; the selection does not carry over
    pub fn set_active_tab(&mut self, status: ContributionStatus) {
        if self.active != status {
            self.active = status;
            self.selection.clear();
        }
    }

    /// Toggle one id; ids outside the active tab are ignored
    ///
    /// Returns whether the id is selected afterwards.
    pub fn toggle(&mut self, id: Uuid) -> bool {
        if !self.in_active_tab(id) {
            return false;
        }
        if !self.selection.remove(&id) {
            self.selection.insert(id);
            return true;
        }
        false
    }

    /// Select every contribution of the active tab
    pub fn select_all(&mut self) {
        let active = self.active;
        self.selection = self
            .view
            .items()
            .iter()
            .filter(|c| c.status == active)
            .map(|c| c.id)
            .collect();
    }

    pub fn clear_selection(&mut self) {
        self.selection.clear();
    }

    /// Selected ids in board order
    pub fn selected(&self) -> Vec<Uuid> {
        self.view
            .items()
            .iter()
            .filter(|c| self.selection.contains(&c.id))
            .map(|c| c.id)
            .collect()
    }

    fn in_active_tab(&self, id: Uuid) -> bool {
        self.view
            .position(id)
            .and_then(|i| self.view.get(i))
            .is_some_and(|c| c.status == self.active)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use memento_common::{ContributionKind, Payload};

    fn contribution(status: ContributionStatus) -> Contribution {
        let now = Utc::now();
        Contribution {
            id: Uuid::new_v4(),
            event_id: Uuid::nil(),
            guest_name: "Ann".into(),
            kind: ContributionKind::Text,
            payload: Payload::Text {
                content: "hi".into(),
            },
            thumbnail_url: None,
            question_answered: None,
            status,
            duration_seconds: None,
            file_size_bytes: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_partition_is_disjoint_and_complete() {
        let all = vec![
            contribution(ContributionStatus::Pending),
            contribution(ContributionStatus::Approved),
            contribution(ContributionStatus::Rejected),
            contribution(ContributionStatus::Pending),
        ];
        let board = ModerationBoard::new(all.clone());
        let p = board.partition();
        assert_eq!(p.pending.len(), 2);
        assert_eq!(p.approved.len(), 1);
        assert_eq!(p.rejected.len(), 1);

        let mut ids: Vec<Uuid> = p
            .pending
            .iter()
            .chain(&p.approved)
            .chain(&p.rejected)
            .map(|c| c.id)
            .collect();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), all.len());
    }

    #[test]
    fn test_select_all_only_active_tab() {
        let pending = contribution(ContributionStatus::Pending);
        let approved = contribution(ContributionStatus::Approved);
        let mut board = ModerationBoard::new(vec![pending.clone(), approved.clone()]);

        board.select_all();
        assert_eq!(board.selected(), vec![pending.id]);

        // Cannot select across tabs
        assert!(!board.toggle(approved.id));
        assert_eq!(board.selected(), vec![pending.id]);

        board.set_active_tab(ContributionStatus::Approved);
        assert!(board.selected().is_empty());
        assert!(board.toggle(approved.id));
        assert!(!board.toggle(approved.id));
    }

    #[test]
    fn test_selection_pruned_when_item_leaves_tab() {
        let a = contribution(ContributionStatus::Pending);
        let b = contribution(ContributionStatus::Pending);
        let mut board = ModerationBoard::new(vec![a.clone(), b.clone()]);
        board.select_all();

        let mut approved = a.clone();
        approved.status = ContributionStatus::Approved;
        board.apply(&ChangeEvent::update(approved));

        assert_eq!(board.selected(), vec![b.id]);
        assert_eq!(board.subset(ContributionStatus::Approved).len(), 1);

        board.apply(&ChangeEvent::delete(b.id));
        assert!(board.selected().is_empty());
    }

    #[test]
    fn test_bulk_report_aggregate() {
        let report = BulkReport {
            action: BulkAction::Approve,
            total: 3,
            applied: 2,
            failed: vec![Uuid::new_v4()],
            changes: Vec::new(),
        };
        assert!(matches!(
            report.into_result(),
            Err(Error::BulkFailed { failed: 1, total: 3 })
        ));
    }
}
