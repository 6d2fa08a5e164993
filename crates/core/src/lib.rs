//! Domain types shared by every MSEL sync crate.
//!
//! - [`types`]: id and timestamp aliases.
//! - [`entity`]: the [`Entity`](entity::Entity) trait implemented by every
//!   cached record, plus the [`Listable`](entity::Listable) extension used
//!   by derived lists.
//! - [`models`]: MSELs, scenario events, data fields/values, teams, users.
//! - [`roles`]: role enums and the capability resolver.
//! - [`list_params`]: filter/sort/page state read from URL query parameters.

pub mod entity;
pub mod error;
pub mod list_params;
pub mod models;
pub mod roles;
pub mod types;
