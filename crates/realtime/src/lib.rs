//! Realtime sync channel for the MSEL session stores.
//!
//! Other clients' creates, updates and deletes arrive over a WebSocket hub
//! and are applied to the same [`SessionStores`](msel_store::SessionStores)
//! the REST data services write to.

pub mod backoff;
pub mod channel;
pub mod dispatch;
pub mod events;
pub mod protocol;
pub mod state;

pub use backoff::BackoffPolicy;
pub use channel::{SyncChannel, SyncConfig, SyncError};
pub use events::{ChangeKind, EntityKind};
pub use state::{Area, ConnectionState};
