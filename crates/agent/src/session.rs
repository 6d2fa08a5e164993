//! A signed-in session: stores, REST services and the sync channel wired
//! together.

use std::sync::Arc;

use msel_client::{EntityService, FailureChannel, RestApi};
use msel_core::models::{
    DataFieldRecord, DataValueRecord, MoveRecord, MselRecord, OrganizationRecord, ScenarioEventRecord,
    TeamRecord, UserMselRole, UserRecord,
};
use msel_core::roles::MselCapabilities;
use msel_core::types::EntityId;
use msel_realtime::{Area, SyncChannel, SyncError};
use msel_store::SessionStores;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::capabilities::current_capabilities;
use crate::config::AgentConfig;

pub struct Session {
    pub stores: Arc<SessionStores>,
    pub failures: FailureChannel,
    pub sync: Arc<SyncChannel>,
    pub msels: EntityService<MselRecord, RestApi>,
    pub scenario_events: EntityService<ScenarioEventRecord, RestApi>,
    pub data_fields: EntityService<DataFieldRecord, RestApi>,
    pub data_values: EntityService<DataValueRecord, RestApi>,
    pub moves: EntityService<MoveRecord, RestApi>,
    pub teams: EntityService<TeamRecord, RestApi>,
    pub organizations: EntityService<OrganizationRecord, RestApi>,
    pub user_msel_roles: EntityService<UserMselRole, RestApi>,
    pub users: EntityService<UserRecord, RestApi>,
    api: Arc<RestApi>,
    user_id: EntityId,
    area: Area,
    token: String,
}

impl Session {
    pub fn new(config: &AgentConfig) -> Self {
        let stores = Arc::new(SessionStores::new());
        let api = Arc::new(RestApi::new(config.api_url.clone(), config.token.clone()));
        let failures = FailureChannel::default();
        let sync = Arc::new(SyncChannel::new(config.sync_config(), Arc::clone(&stores)));

        Self {
            msels: EntityService::new(Arc::clone(&api), stores.msels.clone(), failures.clone()),
            scenario_events: EntityService::new(
                Arc::clone(&api),
                stores.scenario_events.clone(),
                failures.clone(),
            ),
            data_fields: EntityService::new(Arc::clone(&api), stores.data_fields.clone(), failures.clone()),
            data_values: EntityService::new(Arc::clone(&api), stores.data_values.clone(), failures.clone()),
            moves: EntityService::new(Arc::clone(&api), stores.moves.clone(), failures.clone()),
            teams: EntityService::new(Arc::clone(&api), stores.teams.clone(), failures.clone()),
            organizations: EntityService::new(
                Arc::clone(&api),
                stores.organizations.clone(),
                failures.clone(),
            ),
            user_msel_roles: EntityService::new(
                Arc::clone(&api),
                stores.user_msel_roles.clone(),
                failures.clone(),
            ),
            users: EntityService::new(Arc::clone(&api), stores.users.clone(), failures.clone()),
            stores,
            failures,
            sync,
            api,
            user_id: config.user_id,
            area: config.area,
            token: config.token.clone(),
        }
    }

    /// Load the user's MSELs and connect the realtime channel.
    pub async fn open(&self) -> Result<(), SyncError> {
        tokio::join!(self.msels.load_mine(), self.users.load());
        tracing::info!(msels = self.stores.msels.len(), "Loaded MSELs");
        self.sync.start(self.area, self.token.clone()).await
    }

    /// Make `msel_id` the active MSEL and load everything scoped to it.
    pub async fn select_msel(&self, msel_id: EntityId) {
        self.msels.set_active(Some(msel_id));
        tokio::join!(
            self.scenario_events.load_by_parent(msel_id),
            self.data_fields.load_by_parent(msel_id),
            self.moves.load_by_parent(msel_id),
            self.teams.load_by_parent(msel_id),
            self.organizations.load_by_parent(msel_id),
            self.user_msel_roles.load_by_parent(msel_id),
        );

        // Data values hang off scenario events rather than the MSEL.
        let event_ids: Vec<EntityId> = self
            .stores
            .scenario_events
            .state()
            .iter()
            .filter(|event| event.msel_id == msel_id)
            .map(|event| event.id)
            .collect();
        futures::future::join_all(
            event_ids
                .into_iter()
                .map(|event_id| self.data_values.load_by_parent(event_id)),
        )
        .await;

        tracing::info!(
            %msel_id,
            events = self.stores.scenario_events.len(),
            "Active MSEL loaded",
        );
    }

    /// Capabilities of the session user on the active MSEL.
    pub fn capabilities(&self, scenario_event_id: Option<EntityId>) -> MselCapabilities {
        current_capabilities(&self.stores, self.user_id, scenario_event_id)
    }

    /// Follow `tokens` with both the REST client and the sync channel.
    pub fn follow_credentials(&self, tokens: watch::Receiver<String>) -> JoinHandle<()> {
        let sync_task = self.sync.watch_credentials(tokens.clone());
        let api = Arc::clone(&self.api);
        let mut tokens = tokens;

        tokio::spawn(async move {
            while tokens.changed().await.is_ok() {
                let token = tokens.borrow_and_update().clone();
                api.set_token(token).await;
                tracing::info!("REST credentials rotated");
            }
            if let Err(e) = sync_task.await {
                tracing::warn!(error = %e, "Hub credential rotation task failed");
            }
        })
    }

    /// Disconnect and drop all cached entities.
    pub async fn close(&self) {
        self.sync.stop().await;
        self.stores.reset();
        tracing::info!("Session closed");
    }
}
