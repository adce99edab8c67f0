//! Realtime reconciliation
//!
//! A [`ReconciledView`] keeps an ordered, filtered set of records consistent
//! with a stream of [`ChangeEvent`]s. Application is idempotent, so a
//! duplicated delivery, or an optimistic local change followed by its echo
//! from the feed, leaves the view as if the change had arrived once.

use std::fmt;
use std::sync::Arc;

use memento_common::{ChangeEvent, ChangeKind, Record, SortOrder};
use uuid::Uuid;

/// Predicate deciding which records belong in a view
pub type ViewFilter<T> = Arc<dyn Fn(&T) -> bool + Send + Sync>;

/// What applying a change did to the view
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewChange {
    Unchanged,
    Inserted { index: usize },
    Replaced { index: usize },
    Removed { index: usize },
}

impl ViewChange {
    /// Whether the number of records changed
    pub fn changes_count(&self) -> bool {
        matches!(self, ViewChange::Inserted { .. } | ViewChange::Removed { .. })
    }
}

/// Ordered, filtered, duplicate-free set of records
///
/// New records enter at the head of a descending view and at the tail of an
/// ascending one. Records already present never move.
#[derive(Clone)]
pub struct ReconciledView<T> {
    items: Vec<T>,
    filter: ViewFilter<T>,
    order: SortOrder,
}

impl<T> fmt::Debug for ReconciledView<T>
where
    T: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReconciledView")
            .field("order", &self.order)
            .field("items", &self.items)
            .finish()
    }
}

impl<T: Record + Clone> ReconciledView<T> {
    pub fn new<F>(order: SortOrder, filter: F) -> Self
    where
        F: Fn(&T) -> bool + Send + Sync + 'static,
    {
        Self {
            items: Vec::new(),
            filter: Arc::new(filter),
            order,
        }
    }

    /// View accepting every record
    pub fn unfiltered(order: SortOrder) -> Self {
        Self::new(order, |_| true)
    }

    /// Replace the contents with a snapshot already in view order
    ///
    /// Records not matching the filter and repeated ids are skipped.
    pub fn load(&mut self, records: impl IntoIterator<Item = T>) {
        self.items.clear();
        for record in records {
            if (self.filter)(&record) && self.position(record.record_id()).is_none() {
                self.items.push(record);
            }
        }
    }

    /// Apply one change
    pub fn apply(&mut self, change: &ChangeEvent<T>) -> ViewChange {
        let existing = self.position(change.id);
        match (change.kind, &change.record) {
            (ChangeKind::Delete, _) => self.remove_at(existing),
            (ChangeKind::Insert | ChangeKind::Update, None) => ViewChange::Unchanged,
            (ChangeKind::Insert, Some(record)) => match existing {
                Some(_) => ViewChange::Unchanged,
                None => self.insert(record),
            },
            (ChangeKind::Update, Some(record)) => {
                let matches = (self.filter)(record);
                match (existing, matches) {
                    (Some(index), true) => {
                        self.items[index] = record.clone();
                        ViewChange::Replaced { index }
                    }
                    (Some(_), false) => self.remove_at(existing),
                    (None, true) => self.insert(record),
                    (None, false) => ViewChange::Unchanged,
                }
            }
        }
    }

    fn insert(&mut self, record: &T) -> ViewChange {
        if !(self.filter)(record) {
            return ViewChange::Unchanged;
        }
        let index = match self.order {
            SortOrder::Descending => 0,
            SortOrder::Ascending => self.items.len(),
        };
        self.items.insert(index, record.clone());
        ViewChange::Inserted { index }
    }

    fn remove_at(&mut self, index: Option<usize>) -> ViewChange {
        match index {
            Some(index) => {
                self.items.remove(index);
                ViewChange::Removed { index }
            }
            None => ViewChange::Unchanged,
        }
    }

    pub fn items(&self) -> &[T] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&T> {
        self.items.get(index)
    }

    pub fn position(&self, id: Uuid) -> Option<usize> {
        self.items.iter().position(|r| r.record_id() == id)
    }

    pub fn contains(&self, id: Uuid) -> bool {
        self.position(id).is_some()
    }

    pub fn ids(&self) -> Vec<Uuid> {
        self.items.iter().map(Record::record_id).collect()
    }

    pub fn order(&self) -> SortOrder {
        self.order
    }
}
