//! The mutation-owning table for one entity type.
//!
//! Only data services and the realtime sync channel mutate a store; UI-side
//! code reads through [`EntityQuery`](crate::query::EntityQuery).

use std::collections::HashSet;
use std::sync::Arc;

use indexmap::IndexMap;
use msel_core::entity::Entity;
use msel_core::types::EntityId;
use tokio::sync::watch;

use crate::query::EntityQuery;

/// Snapshot of one store: insertion-ordered entities, the active pointer,
/// the loading flag and the parent scopes loaded so far.
#[derive(Debug, Clone)]
pub struct EntityState<T> {
    entities: IndexMap<EntityId, T>,
    active: Option<EntityId>,
    loading: bool,
    loaded_scopes: HashSet<EntityId>,
}

impl<T> Default for EntityState<T> {
    fn default() -> Self {
        Self {
            entities: IndexMap::new(),
            active: None,
            loading: false,
            loaded_scopes: HashSet::new(),
        }
    }
}

impl<T> EntityState<T> {
    pub fn get(&self, id: &EntityId) -> Option<&T> {
        self.entities.get(id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.entities.values()
    }

    pub fn ids(&self) -> impl Iterator<Item = &EntityId> {
        self.entities.keys()
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    pub fn active_id(&self) -> Option<EntityId> {
        self.active
    }

    /// The active entity, or `None` if no pointer is set or the pointed-to
    /// entity has since been removed.
    pub fn active(&self) -> Option<&T> {
        self.active.and_then(|id| self.entities.get(&id))
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    /// Whether the children of `parent_id` were loaded with
    /// [`EntityStore::replace_scope`]. From then on the store, not the
    /// parent's embedded list, is the source of truth for that scope.
    pub fn is_scope_loaded(&self, parent_id: &EntityId) -> bool {
        self.loaded_scopes.contains(parent_id)
    }
}

/// Errors from [`EntityStore::patch`].
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("{entity} patch must be a JSON object")]
    NotAnObject { entity: &'static str },

    #[error("{entity} patch for {id} could not be applied: {source}")]
    Merge {
        entity: &'static str,
        id: EntityId,
        #[source]
        source: serde_json::Error,
    },

    #[error("{entity} patch for {expected} carries id {found}")]
    IdMismatch {
        entity: &'static str,
        expected: EntityId,
        found: EntityId,
    },
}

/// Authoritative, normalized collection for one entity type.
///
/// Cloning yields another handle to the same store.
pub struct EntityStore<T> {
    tx: Arc<watch::Sender<EntityState<T>>>,
}

impl<T> Clone for EntityStore<T> {
    fn clone(&self) -> Self {
        Self {
            tx: Arc::clone(&self.tx),
        }
    }
}

impl<T: Entity> Default for EntityStore<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Entity> EntityStore<T> {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(EntityState::default());
        Self { tx: Arc::new(tx) }
    }

    /// A read-only view over this store.
    pub fn query(&self) -> EntityQuery<T> {
        EntityQuery::new(self.tx.subscribe())
    }

    /// Borrow the current state. Keep the guard short-lived: mutations
    /// block while it is held.
    pub fn state(&self) -> watch::Ref<'_, EntityState<T>> {
        self.tx.borrow()
    }

    pub fn get(&self, id: EntityId) -> Option<T> {
        self.tx.borrow().get(&id).cloned()
    }

    /// Replace the whole collection and clear the loading flag. Loaded
    /// scopes are forgotten.
    pub fn set(&self, items: Vec<T>) {
        let count = items.len();
        self.tx.send_modify(|state| {
            state.entities = items.into_iter().map(|item| (item.id(), item)).collect();
            state.loading = false;
            state.loaded_scopes.clear();
        });
        tracing::trace!(entity = T::TYPE_NAME, count, "Store set");
    }

    /// Insert `item`, or replace the record with the same id in place.
    pub fn upsert(&self, item: T) {
        let id = item.id();
        self.tx.send_modify(|state| {
            state.entities.insert(id, item);
        });
        tracing::trace!(entity = T::TYPE_NAME, %id, "Store upsert");
    }

    /// Upsert several records with a single notification.
    pub fn upsert_many(&self, items: Vec<T>) {
        if items.is_empty() {
            return;
        }
        let count = items.len();
        self.tx.send_modify(|state| {
            for item in items {
                state.entities.insert(item.id(), item);
            }
        });
        tracing::trace!(entity = T::TYPE_NAME, count, "Store upsert many");
    }

    /// Merge the fields of a partial JSON record into the entity `id`.
    ///
    /// Fields missing from `partial` keep their current values. When the
    /// entity is absent the patch must deserialize to a full record.
    pub fn patch(&self, id: EntityId, partial: serde_json::Value) -> Result<(), StoreError> {
        let serde_json::Value::Object(fields) = partial else {
            return Err(StoreError::NotAnObject {
                entity: T::TYPE_NAME,
            });
        };

        let merged = {
            let state = self.tx.borrow();
            let mut base = match state.get(&id) {
                Some(existing) => match serde_json::to_value(existing) {
                    Ok(serde_json::Value::Object(map)) => map,
                    Ok(_) => serde_json::Map::new(),
                    Err(source) => {
                        return Err(StoreError::Merge {
                            entity: T::TYPE_NAME,
                            id,
                            source,
                        })
                    }
                },
                None => serde_json::Map::new(),
            };
            for (key, value) in fields {
                base.insert(key, value);
            }
            serde_json::from_value::<T>(serde_json::Value::Object(base)).map_err(|source| {
                StoreError::Merge {
                    entity: T::TYPE_NAME,
                    id,
                    source,
                }
            })?
        };

        if merged.id() != id {
            return Err(StoreError::IdMismatch {
                entity: T::TYPE_NAME,
                expected: id,
                found: merged.id(),
            });
        }

        self.upsert(merged);
        Ok(())
    }

    /// Remove the entity `id`. Returns whether it was present; removing an
    /// absent id changes nothing and notifies no one.
    pub fn remove(&self, id: EntityId) -> bool {
        let removed = self
            .tx
            .send_if_modified(|state| state.entities.shift_remove(&id).is_some());
        tracing::trace!(entity = T::TYPE_NAME, %id, removed, "Store remove");
        removed
    }

    /// Make `items` the complete set of children of `parent_id` and mark
    /// the scope loaded. Entities of other parents keep their place; a
    /// child already present keeps its position. One notification.
    pub fn replace_scope(&self, parent_id: EntityId, items: Vec<T>) {
        let count = items.len();
        self.tx.send_modify(|state| {
            let fresh: HashSet<EntityId> = items.iter().map(|item| item.id()).collect();
            state
                .entities
                .retain(|id, item| item.parent_id() != Some(parent_id) || fresh.contains(id));
            for item in items {
                state.entities.insert(item.id(), item);
            }
            state.loaded_scopes.insert(parent_id);
        });
        tracing::trace!(entity = T::TYPE_NAME, %parent_id, count, "Store replace scope");
    }

    /// Drop the children of `parent_id` and mark the scope as not loaded.
    pub fn forget_scope(&self, parent_id: EntityId) {
        self.tx.send_if_modified(|state| {
            let before = state.entities.len();
            state
                .entities
                .retain(|_, item| item.parent_id() != Some(parent_id));
            let unmarked = state.loaded_scopes.remove(&parent_id);
            unmarked || state.entities.len() != before
        });
        tracing::trace!(entity = T::TYPE_NAME, %parent_id, "Store forget scope");
    }

    /// Point the active slot at `id` (or clear it with `None`).
    pub fn set_active(&self, id: Option<EntityId>) {
        self.tx.send_if_modified(|state| {
            let changed = state.active != id;
            state.active = id;
            changed
        });
    }

    pub fn set_loading(&self, loading: bool) {
        self.tx.send_if_modified(|state| {
            let changed = state.loading != loading;
            state.loading = loading;
            changed
        });
    }

    /// Drop every entity and reset the active pointer and loading flag.
    pub fn clear(&self) {
        self.tx.send_modify(|state| *state = EntityState::default());
    }

    pub fn len(&self) -> usize {
        self.tx.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.tx.borrow().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use msel_core::models::{ScenarioEventRecord, UserRecord};

    use super::*;

    fn user(name: &str) -> UserRecord {
        UserRecord {
            id: EntityId::new_v4(),
            name: name.into(),
        }
    }

    #[test]
    fn set_replaces_collection_and_clears_loading() {
        let store = EntityStore::new();
        store.upsert(user("old"));
        store.set_loading(true);

        let fresh = vec![user("a"), user("b")];
        store.set(fresh.clone());

        assert_eq!(store.len(), 2);
        assert!(!store.state().is_loading());
        assert_eq!(store.get(fresh[0].id), Some(fresh[0].clone()));
    }

    #[test]
    fn upsert_twice_equals_upsert_once() {
        let store = EntityStore::new();
        let alice = user("alice");
        store.upsert(alice.clone());
        store.upsert(alice.clone());

        assert_eq!(store.len(), 1);
        assert_eq!(store.get(alice.id), Some(alice));
    }

    #[test]
    fn upsert_keeps_insertion_position() {
        let store = EntityStore::new();
        let (a, b) = (user("a"), user("b"));
        store.upsert(a.clone());
        store.upsert(b.clone());
        store.upsert(UserRecord {
            name: "a2".into(),
            ..a.clone()
        });

        let names: Vec<String> = store.state().iter().map(|u| u.name.clone()).collect();
        assert_eq!(names, vec!["a2", "b"]);
    }

    fn event(msel_id: EntityId, row_index: i32) -> ScenarioEventRecord {
        ScenarioEventRecord {
            id: EntityId::new_v4(),
            msel_id,
            row_index,
            delta_seconds: 0,
            data_values: vec![],
            row_metadata: None,
            is_hidden: false,
        }
    }

    #[test]
    fn replace_scope_keeps_other_parents_and_drops_stale_children() {
        let store = EntityStore::new();
        let (mine, other) = (EntityId::new_v4(), EntityId::new_v4());
        let stale = event(mine, 0);
        let kept = event(mine, 1);
        let foreign = event(other, 0);
        store.upsert(stale.clone());
        store.upsert(kept.clone());
        store.upsert(foreign.clone());
        assert!(!store.state().is_scope_loaded(&mine));

        let added = event(mine, 2);
        store.replace_scope(mine, vec![kept.clone(), added.clone()]);

        let ids: Vec<EntityId> = store.state().ids().copied().collect();
        assert_eq!(ids, vec![kept.id, foreign.id, added.id]);
        assert!(store.state().is_scope_loaded(&mine));
        assert!(!store.state().is_scope_loaded(&other));
    }

    #[test]
    fn empty_replace_scope_still_marks_loaded() {
        let store: EntityStore<ScenarioEventRecord> = EntityStore::new();
        let msel_id = EntityId::new_v4();
        store.replace_scope(msel_id, vec![]);
        assert!(store.is_empty());
        assert!(store.state().is_scope_loaded(&msel_id));
    }

    #[test]
    fn forget_scope_unmarks_and_removes_children() {
        let store = EntityStore::new();
        let (mine, other) = (EntityId::new_v4(), EntityId::new_v4());
        store.replace_scope(mine, vec![event(mine, 0)]);
        store.replace_scope(other, vec![event(other, 0)]);

        store.forget_scope(mine);

        assert_eq!(store.len(), 1);
        assert!(!store.state().is_scope_loaded(&mine));
        assert!(store.state().is_scope_loaded(&other));
    }

    #[test]
    fn set_and_clear_forget_loaded_scopes() {
        let store = EntityStore::new();
        let msel_id = EntityId::new_v4();
        store.replace_scope(msel_id, vec![event(msel_id, 0)]);
        store.set(vec![event(msel_id, 1)]);
        assert!(!store.state().is_scope_loaded(&msel_id));

        store.replace_scope(msel_id, vec![]);
        store.clear();
        assert!(!store.state().is_scope_loaded(&msel_id));
    }

    #[test]
    fn remove_absent_is_noop() {
        let store = EntityStore::new();
        store.upsert(user("a"));
        let rx = store.query();

        assert!(!store.remove(EntityId::new_v4()));
        assert_eq!(store.len(), 1);
        assert!(!rx.has_changed());
    }

    #[test]
    fn patch_preserves_missing_fields() {
        let store = EntityStore::new();
        let alice = user("alice");
        store.upsert(alice.clone());

        store
            .patch(alice.id, serde_json::json!({ "name": "Alice B." }))
            .unwrap();

        assert_eq!(store.get(alice.id).unwrap().name, "Alice B.");
    }

    #[test]
    fn patch_inserts_full_record_when_absent() {
        let store: EntityStore<UserRecord> = EntityStore::new();
        let id = EntityId::new_v4();
        store
            .patch(id, serde_json::json!({ "id": id, "name": "new" }))
            .unwrap();
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn patch_rejects_partial_for_absent_entity() {
        let store: EntityStore<UserRecord> = EntityStore::new();
        let result = store.patch(EntityId::new_v4(), serde_json::json!({ "name": "x" }));
        assert_matches!(result, Err(StoreError::Merge { .. }));
        assert!(store.is_empty());
    }

    #[test]
    fn patch_rejects_non_object_and_id_change() {
        let store = EntityStore::new();
        let alice = user("alice");
        store.upsert(alice.clone());

        assert_matches!(
            store.patch(alice.id, serde_json::json!("name")),
            Err(StoreError::NotAnObject { .. })
        );
        assert_matches!(
            store.patch(alice.id, serde_json::json!({ "id": EntityId::new_v4() })),
            Err(StoreError::IdMismatch { .. })
        );
        assert_eq!(store.get(alice.id), Some(alice));
    }

    #[test]
    fn active_pointer_reads_none_after_delete() {
        let store = EntityStore::new();
        let alice = user("alice");
        store.upsert(alice.clone());
        store.set_active(Some(alice.id));
        assert_eq!(store.state().active().map(|u| u.id), Some(alice.id));

        store.remove(alice.id);
        assert!(store.state().active().is_none());
        assert_eq!(store.state().active_id(), Some(alice.id));
    }

    #[test]
    fn clear_resets_everything() {
        let store = EntityStore::new();
        let alice = user("alice");
        store.upsert(alice.clone());
        store.set_active(Some(alice.id));
        store.set_loading(true);

        store.clear();

        let state = store.state();
        assert!(state.is_empty());
        assert!(state.active_id().is_none());
        assert!(!state.is_loading());
    }
}
