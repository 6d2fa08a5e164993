//! In-memory entity cache for one session.
//!
//! - [`EntityStore`]: the mutation-owning, normalized table for one entity
//!   type, with an active-id pointer and a loading flag.
//! - [`EntityQuery`]: read-only snapshots and streams over a store.
//! - [`EntityList`]: a filtered, sorted, paged view driven by
//!   [`ListParams`](msel_core::list_params::ListParams).
//! - [`SessionStores`]: one store per entity type, created per session
//!   and passed explicitly to services and the realtime channel.
//!
//! Stores are backed by `tokio::sync::watch`: a mutation is visible to
//! every query before the mutating call returns.

pub mod list;
pub mod query;
pub mod session;
pub mod store;

pub use list::EntityList;
pub use query::EntityQuery;
pub use session::SessionStores;
pub use store::{EntityState, EntityStore, StoreError};
