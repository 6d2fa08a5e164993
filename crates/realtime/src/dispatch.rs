//! Apply inbound hub invocations to the session stores.
//!
//! Created and Updated carry the full record and are upserted; Deleted
//! carries the id (bare string or an object with `id`) and removes it.
//! Applying the same event twice leaves the stores as applying it once.

use msel_core::entity::Entity;
use msel_core::types::EntityId;
use msel_store::{EntityStore, SessionStores};
use serde_json::Value;

use crate::events::{parse_target, ChangeKind, EntityKind};

#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error("Unknown hub target: {0}")]
    UnknownTarget(String),

    #[error("{target} carried no payload")]
    MissingPayload { target: String },

    #[error("{target} payload is not a valid {entity}: {source}")]
    Payload {
        target: String,
        entity: &'static str,
        #[source]
        source: serde_json::Error,
    },

    #[error("{target} payload has no valid id")]
    InvalidId { target: String },
}

/// Apply one invocation. Returns which entity kind and change it was.
pub fn apply_invocation(
    stores: &SessionStores,
    target: &str,
    arguments: &[Value],
) -> Result<(EntityKind, ChangeKind), DispatchError> {
    let (kind, change) =
        parse_target(target).ok_or_else(|| DispatchError::UnknownTarget(target.to_string()))?;
    let payload = arguments.first().ok_or_else(|| DispatchError::MissingPayload {
        target: target.to_string(),
    })?;

    match kind {
        EntityKind::Msel => apply(&stores.msels, target, change, payload),
        EntityKind::ScenarioEvent => apply(&stores.scenario_events, target, change, payload),
        EntityKind::Move => apply(&stores.moves, target, change, payload),
        EntityKind::DataField => apply(&stores.data_fields, target, change, payload),
        EntityKind::DataValue => apply(&stores.data_values, target, change, payload),
        EntityKind::Team => apply(&stores.teams, target, change, payload),
        EntityKind::User => apply(&stores.users, target, change, payload),
        EntityKind::Organization => apply(&stores.organizations, target, change, payload),
        EntityKind::UserMselRole => apply(&stores.user_msel_roles, target, change, payload),
        EntityKind::UserTeamRole => apply(&stores.user_team_roles, target, change, payload),
    }?;

    tracing::debug!(target_name = target, "Applied hub event");
    Ok((kind, change))
}

fn apply<T: Entity>(
    store: &EntityStore<T>,
    target: &str,
    change: ChangeKind,
    payload: &Value,
) -> Result<(), DispatchError> {
    match change {
        ChangeKind::Created | ChangeKind::Updated => {
            let entity = serde_json::from_value::<T>(payload.clone()).map_err(|source| {
                DispatchError::Payload {
                    target: target.to_string(),
                    entity: T::TYPE_NAME,
                    source,
                }
            })?;
            store.upsert(entity);
        }
        ChangeKind::Deleted => {
            let id = deleted_id(payload).ok_or_else(|| DispatchError::InvalidId {
                target: target.to_string(),
            })?;
            store.remove(id);
        }
    }
    Ok(())
}

fn deleted_id(payload: &Value) -> Option<EntityId> {
    let raw = match payload {
        Value::String(id) => id.as_str(),
        Value::Object(fields) => fields.get("id")?.as_str()?,
        _ => return None,
    };
    raw.parse().ok()
}
