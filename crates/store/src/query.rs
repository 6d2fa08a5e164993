//! Read-only views over an [`EntityStore`](crate::store::EntityStore).
//!
//! Snapshot getters read the latest state directly. The `select_*` streams
//! yield the current value first and then once per store mutation; drop a
//! stream to unsubscribe.

use std::cmp::Ordering;

use msel_core::entity::Entity;
use msel_core::types::EntityId;
use tokio::sync::watch;
use tokio_stream::wrappers::WatchStream;
use tokio_stream::{Stream, StreamExt};

use crate::store::EntityState;

pub struct EntityQuery<T> {
    rx: watch::Receiver<EntityState<T>>,
}

impl<T> Clone for EntityQuery<T> {
    fn clone(&self) -> Self {
        Self {
            rx: self.rx.clone(),
        }
    }
}

impl<T: Entity> EntityQuery<T> {
    pub(crate) fn new(rx: watch::Receiver<EntityState<T>>) -> Self {
        Self { rx }
    }

    pub(crate) fn receiver(&self) -> watch::Receiver<EntityState<T>> {
        self.rx.clone()
    }

    /// Run `f` against the current state without cloning it.
    pub fn with_state<R>(&self, f: impl FnOnce(&EntityState<T>) -> R) -> R {
        f(&self.rx.borrow())
    }

    pub fn get_all(&self) -> Vec<T> {
        self.rx.borrow().iter().cloned().collect()
    }

    pub fn get_entity(&self, id: EntityId) -> Option<T> {
        self.rx.borrow().get(&id).cloned()
    }

    pub fn get_active(&self) -> Option<T> {
        self.rx.borrow().active().cloned()
    }

    pub fn active_id(&self) -> Option<EntityId> {
        self.rx.borrow().active_id()
    }

    pub fn is_loading(&self) -> bool {
        self.rx.borrow().is_loading()
    }

    pub fn count(&self) -> usize {
        self.rx.borrow().len()
    }

    /// Whether the store was mutated since this query last observed it.
    pub fn has_changed(&self) -> bool {
        self.rx.has_changed().unwrap_or(false)
    }

    /// Wait for the next mutation. Returns `false` once the store is gone.
    pub async fn changed(&mut self) -> bool {
        self.rx.changed().await.is_ok()
    }

    /// Every entity, in insertion order.
    pub fn select_all(&self) -> impl Stream<Item = Vec<T>> + Send + 'static {
        WatchStream::new(self.rx.clone()).map(|state| state.iter().cloned().collect())
    }

    /// Every entity, ordered by `compare` (stable).
    pub fn select_all_sorted<F>(&self, compare: F) -> impl Stream<Item = Vec<T>> + Send + 'static
    where
        F: Fn(&T, &T) -> Ordering + Send + Sync + 'static,
    {
        WatchStream::new(self.rx.clone()).map(move |state| {
            let mut items: Vec<T> = state.iter().cloned().collect();
            items.sort_by(&compare);
            items
        })
    }

    /// The entity `id`, or `None` while it is absent.
    pub fn select_entity(&self, id: EntityId) -> impl Stream<Item = Option<T>> + Send + 'static {
        WatchStream::new(self.rx.clone()).map(move |state| state.get(&id).cloned())
    }

    /// The active entity, or `None` when no pointer is set or the entity
    /// it points at was removed.
    pub fn select_active(&self) -> impl Stream<Item = Option<T>> + Send + 'static {
        WatchStream::new(self.rx.clone()).map(|state| state.active().cloned())
    }

    pub fn select_loading(&self) -> impl Stream<Item = bool> + Send + 'static {
        WatchStream::new(self.rx.clone()).map(|state| state.is_loading())
    }
}
