//! Per-entity-type data service bridging REST calls and the session stores.
//!
//! Loads degrade to an empty store on failure (the UI shows "no data"),
//! while mutations return their error to the caller. Both kinds of failure
//! are also published on the [`FailureChannel`]. Nothing is retried and
//! nothing is inserted before the server confirms it.

use std::sync::Arc;

use chrono::Utc;
use msel_core::entity::{Entity, Listable};
use msel_core::error::CoreError;
use msel_core::list_params::ListParams;
use msel_core::types::EntityId;
use msel_store::{EntityList, EntityQuery, EntityStore};
use tokio::sync::watch;

use crate::api::{ApiError, EntityApi};
use crate::failures::{FailureChannel, Operation, ServiceFailure};

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    /// The REST call failed; the store was left untouched.
    #[error("Failed to {operation} {entity}: {source}")]
    Api {
        entity: &'static str,
        operation: Operation,
        #[source]
        source: ApiError,
    },

    /// The entity failed local validation and was never sent.
    #[error(transparent)]
    Invalid(CoreError),
}

/// Data service for entity type `T`, calling through `A`.
pub struct EntityService<T: Entity, A: EntityApi<T> + ?Sized> {
    api: Arc<A>,
    store: EntityStore<T>,
    failures: FailureChannel,
}

impl<T: Entity, A: EntityApi<T> + ?Sized> Clone for EntityService<T, A> {
    fn clone(&self) -> Self {
        Self {
            api: Arc::clone(&self.api),
            store: self.store.clone(),
            failures: self.failures.clone(),
        }
    }
}

impl<T: Entity, A: EntityApi<T> + ?Sized> EntityService<T, A> {
    pub fn new(api: Arc<A>, store: EntityStore<T>, failures: FailureChannel) -> Self {
        Self {
            api,
            store,
            failures,
        }
    }

    pub fn query(&self) -> EntityQuery<T> {
        self.store.query()
    }

    pub fn set_active(&self, id: Option<EntityId>) {
        self.store.set_active(id);
    }

    /// Fetch every entity and replace the store contents.
    pub async fn load(&self) {
        self.store.set_loading(true);
        match self.api.list().await {
            Ok(items) => {
                tracing::debug!(entity = T::TYPE_NAME, count = items.len(), "Loaded");
                self.store.set(items);
            }
            Err(e) => {
                self.report(Operation::Load, None, &e);
                self.store.set(Vec::new());
            }
        }
    }

    /// Fetch the signed-in user's entities and replace the store contents.
    pub async fn load_mine(&self) {
        self.store.set_loading(true);
        match self.api.list_mine().await {
            Ok(items) => {
                tracing::debug!(entity = T::TYPE_NAME, count = items.len(), "Loaded mine");
                self.store.set(items);
            }
            Err(e) => {
                self.report(Operation::LoadMine, None, &e);
                self.store.set(Vec::new());
            }
        }
    }

    /// Fetch the entities under `parent_id` and make them the store's
    /// complete set for that scope, leaving entities of other parents in
    /// place. On failure this parent's entities are dropped and the scope
    /// is marked as not loaded.
    pub async fn load_by_parent(&self, parent_id: EntityId) {
        self.store.set_loading(true);
        match self.api.list_by_parent(parent_id).await {
            Ok(items) => {
                tracing::debug!(
                    entity = T::TYPE_NAME,
                    %parent_id,
                    count = items.len(),
                    "Loaded by parent",
                );
                self.store.replace_scope(parent_id, items);
            }
            Err(e) => {
                self.report(Operation::LoadByParent, Some(parent_id), &e);
                self.store.forget_scope(parent_id);
            }
        }
        self.store.set_loading(false);
    }

    /// Fetch one entity and upsert it.
    pub async fn load_by_id(&self, id: EntityId) -> Result<T, ServiceError> {
        let item = self
            .api
            .get(id)
            .await
            .map_err(|e| self.fail(Operation::LoadById, Some(id), e))?;
        self.store.upsert(item.clone());
        Ok(item)
    }

    /// Create `entity` and upsert the server's record, which carries the
    /// server-assigned id.
    pub async fn add(&self, entity: &T) -> Result<T, ServiceError> {
        entity
            .validate()
            .map_err(|e| self.reject(Operation::Add, None, e))?;
        let created = self
            .api
            .create(entity)
            .await
            .map_err(|e| self.fail(Operation::Add, None, e))?;
        tracing::info!(entity = T::TYPE_NAME, id = %created.id(), "Created");
        self.store.upsert(created.clone());
        Ok(created)
    }

    /// Update `entity` and replace the stored record with the server's
    /// canonical version.
    pub async fn update(&self, entity: &T) -> Result<T, ServiceError> {
        let id = entity.id();
        entity
            .validate()
            .map_err(|e| self.reject(Operation::Update, Some(id), e))?;
        let updated = self
            .api
            .update(entity)
            .await
            .map_err(|e| self.fail(Operation::Update, Some(id), e))?;
        tracing::info!(entity = T::TYPE_NAME, %id, "Updated");
        self.store.upsert(updated.clone());
        Ok(updated)
    }

    /// Delete `id` and remove it from the store.
    pub async fn delete(&self, id: EntityId) -> Result<(), ServiceError> {
        self.api
            .delete(id)
            .await
            .map_err(|e| self.fail(Operation::Delete, Some(id), e))?;
        tracing::info!(entity = T::TYPE_NAME, %id, "Deleted");
        self.store.remove(id);
        Ok(())
    }

    // ---- private helpers ----

    fn report(&self, operation: Operation, target_id: Option<EntityId>, error: &ApiError) {
        self.publish(operation, target_id, error.status(), error.to_string());
    }

    fn publish(
        &self,
        operation: Operation,
        target_id: Option<EntityId>,
        status: Option<u16>,
        message: String,
    ) {
        tracing::warn!(
            entity = T::TYPE_NAME,
            %operation,
            target_id = ?target_id,
            error = %message,
            "Data service operation failed",
        );
        self.failures.publish(ServiceFailure {
            entity: T::TYPE_NAME,
            operation,
            target_id,
            status,
            message,
            timestamp: Utc::now(),
        });
    }

    /// Publish a local validation failure; nothing was sent.
    fn reject(&self, operation: Operation, target_id: Option<EntityId>, error: CoreError) -> ServiceError {
        self.publish(operation, target_id, None, error.to_string());
        ServiceError::Invalid(error)
    }

    fn fail(&self, operation: Operation, target_id: Option<EntityId>, source: ApiError) -> ServiceError {
        self.report(operation, target_id, &source);
        ServiceError::Api {
            entity: T::TYPE_NAME,
            operation,
            source,
        }
    }
}

impl<T: Listable, A: EntityApi<T> + ?Sized> EntityService<T, A> {
    /// A filtered, sorted, paged view driven by `params`.
    pub fn list(&self, params: watch::Receiver<ListParams>) -> EntityList<T> {
        EntityList::new(&self.store.query(), params)
    }
}
