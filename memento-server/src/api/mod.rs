//! HTTP API handlers for memento-server
//!
//! Host routes identify the caller through [`auth::HostIdentity`]; guest
//! entry and the share gallery are public.

pub mod auth;
pub mod events;
pub mod export;
pub mod extract;
pub mod feed;
pub mod guest;
pub mod health;
pub mod moderation;
pub mod qr;
pub mod share;
pub mod wall;

pub use auth::{HostIdentity, HOST_USER_HEADER};
pub use events::event_routes;
pub use export::export_routes;
pub use extract::{ApiJson, ApiPath, ApiQuery};
pub use feed::feed_routes;
pub use guest::guest_routes;
pub use health::health_routes;
pub use moderation::moderation_routes;
pub use qr::qr_routes;
pub use share::share_routes;
pub use wall::wall_routes;
