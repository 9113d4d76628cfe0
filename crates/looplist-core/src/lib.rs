//! Core library for LoopList: the habit data model, streak recomputation,
//! notification vocabulary, identity contract and configuration.
//!
//! Nothing here performs I/O apart from reading config files; persistence and
//! the store itself live in `looplist-store`.

pub mod config;
pub mod events;
pub mod identity;
pub mod snapshot;
pub mod streak;
pub mod types;

pub use config::Config;
pub use events::{Notification, NotificationEvent, NotificationLevel};
pub use identity::{IdentityProvider, SessionIdentity, StaticIdentity};
pub use snapshot::Snapshot;
pub use types::*;
