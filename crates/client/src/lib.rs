//! REST side of the MSEL sync core.
//!
//! - [`api`]: the [`EntityApi`](api::EntityApi) seam and its `reqwest`
//!   implementation.
//! - [`service`]: [`EntityService`](service::EntityService), the per-type
//!   bridge between REST calls and the session stores.
//! - [`failures`]: broadcast channel carrying failed operations to a
//!   central notification surface.
//! - [`url_state`]: list parameters sourced from the current URL.

pub mod api;
pub mod failures;
pub mod service;
pub mod url_state;

pub use api::{ApiError, EntityApi, RestApi};
pub use failures::{FailureChannel, Operation, ServiceFailure};
pub use service::{EntityService, ServiceError};
pub use url_state::UrlState;
