//! REST API client for the MSEL entity endpoints.
//!
//! [`EntityApi`] is the seam data services call through; [`RestApi`]
//! implements it for every [`Entity`] type using [`reqwest`], one resource
//! collection per type:
//!
//! | Operation        | Request                                  |
//! |------------------|------------------------------------------|
//! | `list`           | `GET {base}/{collection}`                |
//! | `list_mine`      | `GET {base}/my-{collection}`             |
//! | `list_by_parent` | `GET {base}/{parent}/{id}/{collection}`  |
//! | `get`            | `GET {base}/{collection}/{id}`           |
//! | `create`         | `POST {base}/{collection}`               |
//! | `update`         | `PUT {base}/{collection}/{id}`           |
//! | `delete`         | `DELETE {base}/{collection}/{id}`        |

use async_trait::async_trait;
use msel_core::entity::Entity;
use msel_core::types::EntityId;
use tokio::sync::RwLock;

/// Errors from the REST API layer.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// The HTTP request itself failed (network, DNS, TLS, decoding).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The server returned a non-2xx status code.
    #[error("API error ({status}): {body}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Raw response body for debugging.
        body: String,
    },

    /// The entity type has no parent collection to list under.
    #[error("{0} cannot be listed by parent")]
    NoParentScope(&'static str),
}

impl ApiError {
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            Self::Request(e) => e.status().map(|s| s.as_u16()),
            Self::NoParentScope(_) => None,
        }
    }
}

/// CRUD operations for one entity type.
#[async_trait]
pub trait EntityApi<T: Entity>: Send + Sync {
    async fn list(&self) -> Result<Vec<T>, ApiError>;

    /// Entities visible to (or owned by) the signed-in user.
    async fn list_mine(&self) -> Result<Vec<T>, ApiError>;

    async fn list_by_parent(&self, parent_id: EntityId) -> Result<Vec<T>, ApiError>;

    async fn get(&self, id: EntityId) -> Result<T, ApiError>;

    /// Create `entity`; the returned record carries the server-assigned id.
    async fn create(&self, entity: &T) -> Result<T, ApiError>;

    /// Update the record with `entity.id()`; returns the canonical version.
    async fn update(&self, entity: &T) -> Result<T, ApiError>;

    async fn delete(&self, id: EntityId) -> Result<(), ApiError>;
}

/// HTTP client for the MSEL API, authorized with a bearer token.
pub struct RestApi {
    client: reqwest::Client,
    base_url: String,
    token: RwLock<String>,
}

impl RestApi {
    /// Create a client for `base_url` (e.g. `https://host/api`).
    pub fn new(base_url: impl Into<String>, token: impl Into<String>) -> Self {
        Self::with_client(reqwest::Client::new(), base_url, token)
    }

    /// Create a client reusing an existing [`reqwest::Client`].
    pub fn with_client(
        client: reqwest::Client,
        base_url: impl Into<String>,
        token: impl Into<String>,
    ) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: RwLock::new(token.into()),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Replace the bearer token after a credential rotation.
    pub async fn set_token(&self, token: impl Into<String>) {
        *self.token.write().await = token.into();
    }

    // ---- private helpers ----

    fn collection_url<T: Entity>(&self) -> String {
        format!("{}/{}", self.base_url, T::COLLECTION)
    }

    fn entity_url<T: Entity>(&self, id: EntityId) -> String {
        format!("{}/{}/{}", self.base_url, T::COLLECTION, id)
    }

    async fn authorized(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        let token = self.token.read().await;
        request.bearer_auth(token.as_str())
    }

    async fn fetch<R: serde::de::DeserializeOwned>(&self, url: String) -> Result<R, ApiError> {
        tracing::debug!(%url, "GET");
        let response = self.authorized(self.client.get(url)).await.send().await?;
        Self::parse_response(response).await
    }

    /// Ensure the response has a success status code. Returns the
    /// response unchanged on success, or an [`ApiError::Status`]
    /// containing the status and body text on failure.
    async fn ensure_success(response: reqwest::Response) -> Result<reqwest::Response, ApiError> {
        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            return Err(ApiError::Status {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }

    /// Parse a successful JSON response body into the expected type.
    async fn parse_response<R: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<R, ApiError> {
        let response = Self::ensure_success(response).await?;
        Ok(response.json::<R>().await?)
    }
}

#[async_trait]
impl<T: Entity> EntityApi<T> for RestApi {
    async fn list(&self) -> Result<Vec<T>, ApiError> {
        self.fetch(self.collection_url::<T>()).await
    }

    async fn list_mine(&self) -> Result<Vec<T>, ApiError> {
        self.fetch(format!("{}/my-{}", self.base_url, T::COLLECTION))
            .await
    }

    async fn list_by_parent(&self, parent_id: EntityId) -> Result<Vec<T>, ApiError> {
        let parent = T::PARENT_COLLECTION.ok_or(ApiError::NoParentScope(T::TYPE_NAME))?;
        self.fetch(format!(
            "{}/{}/{}/{}",
            self.base_url,
            parent,
            parent_id,
            T::COLLECTION
        ))
        .await
    }

    async fn get(&self, id: EntityId) -> Result<T, ApiError> {
        self.fetch(self.entity_url::<T>(id)).await
    }

    async fn create(&self, entity: &T) -> Result<T, ApiError> {
        let request = self.client.post(self.collection_url::<T>()).json(entity);
        let response = self.authorized(request).await.send().await?;
        Self::parse_response(response).await
    }

    async fn update(&self, entity: &T) -> Result<T, ApiError> {
        let request = self.client.put(self.entity_url::<T>(entity.id())).json(entity);
        let response = self.authorized(request).await.send().await?;
        Self::parse_response(response).await
    }

    async fn delete(&self, id: EntityId) -> Result<(), ApiError> {
        let request = self.client.delete(self.entity_url::<T>(id));
        let response = self.authorized(request).await.send().await?;
        Self::ensure_success(response).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use msel_core::models::{MselRecord, ScenarioEventRecord, UserRecord};

    use super::*;

    #[test]
    fn trailing_slash_is_trimmed() {
        let api = RestApi::new("http://localhost:4300/api/", "token");
        assert_eq!(api.base_url(), "http://localhost:4300/api");
        assert_eq!(
            api.collection_url::<MselRecord>(),
            "http://localhost:4300/api/msels"
        );
    }

    #[test]
    fn entity_urls_use_collection_and_id() {
        let api = RestApi::new("http://host/api", "token");
        let id = EntityId::nil();
        assert_eq!(
            api.entity_url::<ScenarioEventRecord>(id),
            format!("http://host/api/scenarioEvents/{id}")
        );
    }

    #[tokio::test]
    async fn list_by_parent_requires_parent_scope() {
        let api = RestApi::new("http://host/api", "token");
        let result = <RestApi as EntityApi<UserRecord>>::list_by_parent(&api, EntityId::nil()).await;
        assert_matches!(result, Err(ApiError::NoParentScope("User")));
    }

    #[test]
    fn status_is_exposed() {
        let err = ApiError::Status {
            status: 403,
            body: "forbidden".into(),
        };
        assert_eq!(err.status(), Some(403));
        assert_eq!(ApiError::NoParentScope("User").status(), None);
    }
}
