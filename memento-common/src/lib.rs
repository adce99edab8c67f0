//! # Memento Common Library
//!
//! Shared code for the Memento guestbook services including:
//! - Event and contribution models (moderation state machine)
//! - Error taxonomy with localized user-facing messages
//! - Change feed (per-event insert/update/delete notifications)
//! - Event code generation and normalization
//! - Configuration loading
//! - SQLite-backed contribution and event store

pub mod config;
pub mod db;
pub mod error;
pub mod event_code;
pub mod events;
pub mod models;
pub mod store;
pub mod time;
pub mod uuid_utils;

pub use error::{Error, ErrorClass, Locale, Rejection, Result};
pub use events::{ChangeEvent, ChangeFeed, ChangeKind, Record, Subscription};
pub use models::{
    Contribution, ContributionCounts, ContributionDraft, ContributionKind, ContributionStatus,
    Event, EventSettings, EventStatus, NewEvent, Payload, SortOrder,
};
pub use db::SqliteStore;
pub use store::{ContributionStore, EventDirectory};
