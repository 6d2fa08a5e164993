//! The per-session bundle of entity stores.
//!
//! One [`SessionStores`] is created per signed-in session and handed (as
//! `Arc<SessionStores>`) to every data service and to the realtime sync
//! channel. Logging out or leaving the session calls [`SessionStores::reset`].

use msel_core::models::{
    DataFieldRecord, DataValueRecord, MoveRecord, MselRecord, OrganizationRecord, ScenarioEventRecord,
    TeamRecord, UserMselRole, UserRecord, UserTeamRole,
};
use indexmap::IndexMap;
use msel_core::entity::Entity;
use msel_core::types::EntityId;

use crate::store::EntityStore;

#[derive(Clone, Default)]
pub struct SessionStores {
    pub msels: EntityStore<MselRecord>,
    pub scenario_events: EntityStore<ScenarioEventRecord>,
    pub moves: EntityStore<MoveRecord>,
    pub data_fields: EntityStore<DataFieldRecord>,
    pub data_values: EntityStore<DataValueRecord>,
    pub teams: EntityStore<TeamRecord>,
    pub users: EntityStore<UserRecord>,
    pub organizations: EntityStore<OrganizationRecord>,
    pub user_msel_roles: EntityStore<UserMselRole>,
    pub user_team_roles: EntityStore<UserTeamRole>,
}

impl SessionStores {
    pub fn new() -> Self {
        Self::default()
    }

    /// Empty every store and clear every active pointer.
    pub fn reset(&self) {
        self.msels.clear();
        self.scenario_events.clear();
        self.moves.clear();
        self.data_fields.clear();
        self.data_values.clear();
        self.teams.clear();
        self.users.clear();
        self.organizations.clear();
        self.user_msel_roles.clear();
        self.user_team_roles.clear();
        tracing::debug!("Session stores reset");
    }

    /// The MSEL `msel_id` with its nested lists rebuilt from the per-type
    /// stores.
    ///
    /// A nested list whose scope was loaded into its store is taken from
    /// the store as is, even when empty, so realtime deletes are honoured.
    /// Before that, the embedded list is kept and store entries for this
    /// MSEL are overlaid on it by id. Data values are attached to their
    /// scenario events the same way.
    pub fn msel_view(&self, msel_id: EntityId) -> Option<MselRecord> {
        let mut msel = self.msels.get(msel_id)?;

        msel.user_msel_roles = hydrate(&self.user_msel_roles, msel_id, msel.user_msel_roles);
        msel.data_fields = hydrate(&self.data_fields, msel_id, msel.data_fields);
        msel.moves = hydrate(&self.moves, msel_id, msel.moves);
        msel.teams = hydrate(&self.teams, msel_id, msel.teams);
        msel.scenario_events = hydrate(&self.scenario_events, msel_id, msel.scenario_events);

        for event in &mut msel.scenario_events {
            let embedded = std::mem::take(&mut event.data_values);
            event.data_values = hydrate(&self.data_values, event.id, embedded);
        }

        Some(msel)
    }

    /// The active MSEL, hydrated as in [`msel_view`](Self::msel_view).
    pub fn active_msel_view(&self) -> Option<MselRecord> {
        let id = self.msels.state().active_id()?;
        self.msel_view(id)
    }
}

fn hydrate<T: Entity>(store: &EntityStore<T>, parent_id: EntityId, embedded: Vec<T>) -> Vec<T> {
    let state = store.state();
    let stored = state.iter().filter(|item| item.parent_id() == Some(parent_id));
    if state.is_scope_loaded(&parent_id) {
        return stored.cloned().collect();
    }

    let mut merged: IndexMap<EntityId, T> =
        embedded.into_iter().map(|item| (item.id(), item)).collect();
    for item in stored {
        merged.insert(item.id(), item.clone());
    }
    merged.into_values().collect()
}
