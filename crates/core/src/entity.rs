//! The [`Entity`] trait shared by every cached record type.
//!
//! An entity knows its own id, the REST collection it lives in, the name
//! the realtime hub uses for it (`<TypeName>Created` etc.), and optionally
//! the parent it is scoped under for `load_by_parent` style fetches.

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::CoreError;
use crate::list_params::SortKey;
use crate::types::EntityId;

/// A record held in an entity store.
pub trait Entity: Clone + Serialize + DeserializeOwned + Send + Sync + 'static {
    /// Name used by the realtime hub, e.g. `"ScenarioEvent"`.
    const TYPE_NAME: &'static str;

    /// REST collection segment, e.g. `"scenarioEvents"`.
    const COLLECTION: &'static str;

    /// REST collection of the parent scope, e.g. `"msels"` for scenario
    /// events. `None` when the type cannot be listed by parent.
    const PARENT_COLLECTION: Option<&'static str> = None;

    fn id(&self) -> EntityId;

    /// Id of the owning parent entity, if any.
    fn parent_id(&self) -> Option<EntityId> {
        None
    }

    /// Local checks run before a create or update is sent to the server.
    fn validate(&self) -> Result<(), CoreError> {
        Ok(())
    }
}

/// An entity that can be filtered and sorted by a derived list.
pub trait Listable: Entity {
    /// Text matched (case-insensitively) against the list filter term.
    fn search_text(&self) -> String;

    /// Sort key for the named column. Unknown columns return
    /// [`SortKey::None`], which leaves insertion order untouched.
    fn sort_key(&self, column: &str) -> SortKey;
}
