//! memento-server library
//!
//! Contribution lifecycle and moderation for event guestbooks: guest
//! submission, host moderation, live walls, share galleries and exports.

use std::sync::Arc;
use std::time::Duration;

use axum::{middleware, Router};
use chrono::{DateTime, Utc};
use memento_common::{ChangeFeed, ContributionStore, EventDirectory, SqliteStore};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub mod api;
pub mod display;
pub mod error;
pub mod export;
pub mod links;
pub mod moderation;
pub mod notify;
pub mod qr;
pub mod reconcile;
pub mod storage;
pub mod validation;

pub use error::{ApiError, ApiResult};

use links::PublicLinks;
use notify::{LogNotifier, Notification, Notifier};
use storage::MediaStorage;

/// Application state shared across HTTP handlers
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn ContributionStore>,
    pub events: Arc<dyn EventDirectory>,
    pub media: Arc<dyn MediaStorage>,
    /// Change notifications from `store`
    pub feed: ChangeFeed,
    /// Slideshow interval for live walls
    pub slide_interval: Duration,
    pub links: PublicLinks,
    pub notifier: Arc<dyn Notifier>,
    pub startup_time: DateTime<Utc>,
}

impl AppState {
    pub fn new(store: SqliteStore, media: Arc<dyn MediaStorage>, slide_interval: Duration) -> Self {
        let feed = store.feed().clone();
        let store = Arc::new(store);
        Self {
            store: store.clone(),
            events: store,
            media,
            feed,
            slide_interval,
            links: PublicLinks::default(),
            notifier: Arc::new(LogNotifier),
            startup_time: Utc::now(),
        }
    }

    pub fn with_links(mut self, links: PublicLinks) -> Self {
        self.links = links;
        self
    }

    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = notifier;
        self
    }

    /// Tell the host in the background
    pub fn notify(&self, notification: Notification) {
        notify::dispatch(&self.notifier, notification);
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .merge(api::health_routes())
        .merge(api::event_routes())
        .merge(api::moderation_routes())
        .merge(api::feed_routes())
        .merge(api::wall_routes())
        .merge(api::export_routes())
        .merge(api::guest_routes())
        .merge(api::share_routes())
        .merge(api::qr_routes())
        .layer(middleware::from_fn(error::localize_errors))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
