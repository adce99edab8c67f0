//! Live display engine
//!
//! Presents the approved contributions of an event, newest first, as a
//! slideshow or a grid. The slideshow index is kept in range whenever the
//! approved set changes.

use std::time::Duration;

use memento_common::{ChangeEvent, Contribution, ContributionStatus, SortOrder};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::reconcile::{ReconciledView, ViewChange};

/// Time each slide stays on screen unless configured otherwise
pub const DEFAULT_SLIDE_INTERVAL: Duration = Duration::from_secs(8);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DisplayMode {
    #[default]
    Slideshow,
    Grid,
}

/// What a wall should show right now
#[derive(Debug, Clone, Serialize)]
pub struct WallFrame {
    pub mode: DisplayMode,
    pub count: usize,
    /// Slideshow position; absent when there is nothing to show
    pub index: Option<usize>,
    pub paused: bool,
    pub current: Option<Contribution>,
    /// Grid item opened in full view
    pub expanded: Option<Contribution>,
    /// All items, in grid mode only
    pub items: Vec<Contribution>,
}

/// Display state for one wall
#[derive(Debug, Clone)]
pub struct LiveDisplay {
    view: ReconciledView<Contribution>,
    mode: DisplayMode,
    index: usize,
    paused: bool,
    since_advance: Duration,
    interval: Duration,
    expanded: Option<Uuid>,
}

fn approved_view() -> ReconciledView<Contribution> {
    ReconciledView::new(SortOrder::Descending, |c: &Contribution| {
        c.status == ContributionStatus::Approved
    })
}

impl LiveDisplay {
    /// Display over a snapshot of approved contributions, newest first
    pub fn new(approved: Vec<Contribution>, interval: Duration) -> Self {
        let mut view = approved_view();
        view.load(approved);
        Self {
            view,
            mode: DisplayMode::default(),
            index: 0,
            paused: false,
            since_advance: Duration::ZERO,
            interval,
            expanded: None,
        }
    }

    pub fn mode(&self) -> DisplayMode {
        self.mode
    }

    pub fn set_mode(&mut self, mode: DisplayMode) {
        self.mode = mode;
        if mode == DisplayMode::Slideshow {
            self.expanded = None;
        }
    }

    pub fn len(&self) -> usize {
        self.view.len()
    }

    pub fn is_empty(&self) -> bool {
        self.view.is_empty()
    }

    pub fn items(&self) -> &[Contribution] {
        self.view.items()
    }

    /// Current slideshow index, `None` for the empty state
    pub fn index(&self) -> Option<usize> {
        (!self.view.is_empty()).then_some(self.index)
    }

    pub fn current(&self) -> Option<&Contribution> {
        self.index().and_then(|i| self.view.get(i))
    }

    /// Step forward, wrapping from last to first
    pub fn next(&mut self) {
        let count = self.view.len();
        if count > 0 {
            self.index = (self.index + 1) % count;
        }
    }

    /// Step back, wrapping from first to last
    pub fn prev(&mut self) {
        let count = self.view.len();
        if count > 0 {
            self.index = (self.index + count - 1) % count;
        }
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    /// Returns whether the slideshow is paused afterwards
    pub fn toggle_pause(&mut self) -> bool {
        self.paused = !self.paused;
        self.paused
    }

    /// Let time pass; returns whether the slide advanced
    pub fn tick(&mut self, elapsed: Duration) -> bool {
        if self.paused || self.mode != DisplayMode::Slideshow || self.view.len() < 2 {
            self.since_advance = Duration::ZERO;
            return false;
        }
        self.since_advance += elapsed;
        if self.since_advance < self.interval {
            return false;
        }
        self.since_advance = Duration::ZERO;
        self.next();
        true
    }

    /// Apply a change and keep index and expansion valid
    ///
    /// The slideshow stays on the same contribution when items are inserted
    /// or removed ahead of it.
    pub fn apply(&mut self, change: &ChangeEvent<Contribution>) -> ViewChange {
        let was_empty = self.view.is_empty();
        let result = self.view.apply(change);
        match result {
            ViewChange::Inserted { index } if !was_empty && index <= self.index => {
                self.index += 1;
            }
            ViewChange::Removed { index } if index < self.index => {
                self.index -= 1;
            }
            _ => {}
        }
        if result.changes_count() {
            self.settle();
        }
        result
    }

    /// Replace the contents after missing changes
    pub fn resync(&mut self, approved: Vec<Contribution>) {
        self.view.load(approved);
        self.settle();
    }

    fn settle(&mut self) {
        let count = self.view.len();
        self.index = if count == 0 { 0 } else { self.index.min(count - 1) };
        if let Some(id) = self.expanded {
            if !self.view.contains(id) {
                self.expanded = None;
            }
        }
    }

    /// Open one grid item in full view; ignored for unknown ids
    pub fn expand(&mut self, id: Uuid) -> bool {
        if self.mode == DisplayMode::Grid && self.view.contains(id) {
            self.expanded = Some(id);
            return true;
        }
        false
    }

    pub fn collapse(&mut self) {
        self.expanded = None;
    }

    pub fn expanded(&self) -> Option<&Contribution> {
        self.expanded
            .and_then(|id| self.view.position(id))
            .and_then(|i| self.view.get(i))
    }

    pub fn frame(&self) -> WallFrame {
        let grid = self.mode == DisplayMode::Grid;
        WallFrame {
            mode: self.mode,
            count: self.view.len(),
            index: self.index(),
            paused: self.paused,
            current: if grid { None } else { self.current().cloned() },
            expanded: self.expanded().cloned(),
            items: if grid {
                self.view.items().to_vec()
            } else {
                Vec::new()
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration as ChronoDuration, Utc};
    use memento_common::{ContributionKind, Payload};

    fn approved(minutes_ago: i64) -> Contribution {
        let at = Utc::now() - ChronoDuration::minutes(minutes_ago);
        Contribution {
            id: Uuid::new_v4(),
            event_id: Uuid::nil(),
            guest_name: "Guest".into(),
            kind: ContributionKind::Photo,
            payload: Payload::Media {
                url: "ev/p.jpg".into(),
            },
            thumbnail_url: None,
            question_answered: None,
            status: ContributionStatus::Approved,
            duration_seconds: None,
            file_size_bytes: None,
            created_at: at,
            updated_at: at,
        }
    }

    fn three() -> (LiveDisplay, Vec<Contribution>) {
        let items = vec![approved(1), approved(2), approved(3)];
        (LiveDisplay::new(items.clone(), DEFAULT_SLIDE_INTERVAL), items)
    }

    #[test]
    fn test_index_clamped_when_last_removed() {
        let (mut display, items) = three();
        display.next();
        display.next();
        assert_eq!(display.index(), Some(2));

        display.apply(&ChangeEvent::delete(items[2].id));
        assert_eq!(display.index(), Some(1));
        assert_eq!(display.current().map(|c| c.id), Some(items[1].id));
    }

    #[test]
    fn test_empty_state() {
        let (mut display, items) = three();
        for item in &items {
            display.apply(&ChangeEvent::delete(item.id));
        }
        assert!(display.is_empty());
        assert_eq!(display.index(), None);
        assert!(display.current().is_none());
        assert_eq!(display.frame().count, 0);
    }

    #[test]
    fn test_rejected_leaves_and_returns() {
        let (mut display, items) = three();
        let mut rejected = items[0].clone();
        rejected.status = ContributionStatus::Rejected;

        display.apply(&ChangeEvent::update(rejected.clone()));
        assert!(!display.items().iter().any(|c| c.id == items[0].id));

        let mut restored = rejected;
        restored.status = ContributionStatus::Approved;
        display.apply(&ChangeEvent::update(restored));
        assert_eq!(display.items()[0].id, items[0].id);
        assert_eq!(display.len(), 3);
    }

    #[test]
    fn test_auto_advance_wraps_and_pauses() {
        let (mut display, _) = three();
        assert!(!display.tick(Duration::from_secs(7)));
        assert!(display.tick(Duration::from_secs(1)));
        assert_eq!(display.index(), Some(1));

        display.tick(DEFAULT_SLIDE_INTERVAL);
        display.tick(DEFAULT_SLIDE_INTERVAL);
        assert_eq!(display.index(), Some(0), "wraps from last to first");

        assert!(display.toggle_pause());
        assert!(!display.tick(Duration::from_secs(60)));
        assert_eq!(display.index(), Some(0));
    }

    #[test]
    fn test_manual_navigation_wraps() {
        let (mut display, _) = three();
        display.prev();
        assert_eq!(display.index(), Some(2));
        display.next();
        assert_eq!(display.index(), Some(0));
    }

    #[test]
    fn test_grid_expansion_collapses_when_item_disappears() {
        let (mut display, items) = three();
        assert!(!display.expand(items[1].id), "slideshow has no expansion");

        display.set_mode(DisplayMode::Grid);
        assert!(display.expand(items[1].id));
        assert_eq!(display.frame().items.len(), 3);
        assert_eq!(display.expanded().map(|c| c.id), Some(items[1].id));

        display.apply(&ChangeEvent::delete(items[1].id));
        assert!(display.expanded().is_none());
    }

    #[test]
    fn test_paused_slide_stays_put_when_new_item_arrives() {
        let (mut display, items) = three();
        display.next();
        display.toggle_pause();
        assert_eq!(display.current().map(|c| c.id), Some(items[1].id));

        let fresh = approved(0);
        assert_eq!(
            display.apply(&ChangeEvent::insert(fresh.clone())),
            ViewChange::Inserted { index: 0 }
        );
        assert_eq!(display.index(), Some(2));
        assert_eq!(display.current().map(|c| c.id), Some(items[1].id));
        assert_eq!(display.items()[0].id, fresh.id);
    }

    #[test]
    fn test_slide_stays_put_when_earlier_item_removed() {
        let (mut display, items) = three();
        display.next();
        display.next();

        display.apply(&ChangeEvent::delete(items[0].id));
        assert_eq!(display.index(), Some(1));
        assert_eq!(display.current().map(|c| c.id), Some(items[2].id));
    }

    #[test]
    fn test_first_item_shown_on_empty_wall() {
        let mut display = LiveDisplay::new(Vec::new(), DEFAULT_SLIDE_INTERVAL);
        let fresh = approved(0);
        display.apply(&ChangeEvent::insert(fresh.clone()));
        assert_eq!(display.index(), Some(0));
        assert_eq!(display.current().map(|c| c.id), Some(fresh.id));
    }

    #[test]
    fn test_new_approved_enters_at_head() {
        let (mut display, _) = three();
        let fresh = approved(0);
        display.apply(&ChangeEvent::insert(fresh.clone()));
        assert_eq!(display.items()[0].id, fresh.id);
    }
}
