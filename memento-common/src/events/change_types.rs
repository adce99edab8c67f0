//! Generic change notifications
//!
//! The reconciler only ever sees this shape; nothing downstream depends on a
//! particular transport's payload format.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::Contribution;

/// Anything addressable by a stable id
pub trait Record {
    fn record_id(&self) -> Uuid;
}

impl Record for Contribution {
    fn record_id(&self) -> Uuid {
        self.id
    }
}

/// Kind of change
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeKind {
    Insert,
    Update,
    Delete,
}

impl ChangeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChangeKind::Insert => "insert",
            ChangeKind::Update => "update",
            ChangeKind::Delete => "delete",
        }
    }
}

/// One change to a record
///
/// Inserts and updates carry the full new record; deletes carry only the id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeEvent<T> {
    pub kind: ChangeKind,
    pub id: Uuid,
    pub record: Option<T>,
}

impl<T: Record> ChangeEvent<T> {
    pub fn insert(record: T) -> Self {
        Self {
            kind: ChangeKind::Insert,
            id: record.record_id(),
            record: Some(record),
        }
    }

    pub fn update(record: T) -> Self {
        Self {
            kind: ChangeKind::Update,
            id: record.record_id(),
            record: Some(record),
        }
    }

    pub fn delete(id: Uuid) -> Self {
        Self {
            kind: ChangeKind::Delete,
            id,
            record: None,
        }
    }
}
