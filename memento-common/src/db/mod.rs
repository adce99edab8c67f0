//! SQLite persistence
//!
//! Free query functions per table plus [`SqliteStore`], which implements the
//! store contracts on top of them and feeds the change feed.

pub mod contributions;
pub mod events;
pub mod init;
pub mod store;

pub use init::*;
pub use store::SqliteStore;
