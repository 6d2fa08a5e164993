//! Inbound hub event names: `<TypeName><Change>`, e.g. `ScenarioEventCreated`.

use msel_core::entity::Entity;
use msel_core::models::{
    DataFieldRecord, DataValueRecord, MoveRecord, MselRecord, OrganizationRecord, ScenarioEventRecord,
    TeamRecord, UserMselRole, UserRecord, UserTeamRole,
};

/// Entity types the hub broadcasts changes for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    Msel,
    ScenarioEvent,
    Move,
    DataField,
    DataValue,
    Team,
    User,
    Organization,
    UserMselRole,
    UserTeamRole,
}

impl EntityKind {
    pub const ALL: [EntityKind; 10] = [
        Self::Msel,
        Self::ScenarioEvent,
        Self::Move,
        Self::DataField,
        Self::DataValue,
        Self::Team,
        Self::User,
        Self::Organization,
        Self::UserMselRole,
        Self::UserTeamRole,
    ];

    pub fn type_name(self) -> &'static str {
        match self {
            Self::Msel => MselRecord::TYPE_NAME,
            Self::ScenarioEvent => ScenarioEventRecord::TYPE_NAME,
            Self::Move => MoveRecord::TYPE_NAME,
            Self::DataField => DataFieldRecord::TYPE_NAME,
            Self::DataValue => DataValueRecord::TYPE_NAME,
            Self::Team => TeamRecord::TYPE_NAME,
            Self::User => UserRecord::TYPE_NAME,
            Self::Organization => OrganizationRecord::TYPE_NAME,
            Self::UserMselRole => UserMselRole::TYPE_NAME,
            Self::UserTeamRole => UserTeamRole::TYPE_NAME,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChangeKind {
    Created,
    Updated,
    Deleted,
}

impl ChangeKind {
    const ALL: [ChangeKind; 3] = [Self::Created, Self::Updated, Self::Deleted];

    pub fn suffix(self) -> &'static str {
        match self {
            Self::Created => "Created",
            Self::Updated => "Updated",
            Self::Deleted => "Deleted",
        }
    }
}

/// Split a hub target into entity kind and change. `None` for targets the
/// channel does not know.
pub fn parse_target(target: &str) -> Option<(EntityKind, ChangeKind)> {
    let (change, type_name) = ChangeKind::ALL
        .into_iter()
        .find_map(|change| target.strip_suffix(change.suffix()).map(|rest| (change, rest)))?;
    let kind = EntityKind::ALL
        .into_iter()
        .find(|kind| kind.type_name() == type_name)?;
    Some((kind, change))
}

/// The hub target for `kind` and `change`.
pub fn target_name(kind: EntityKind, change: ChangeKind) -> String {
    format!("{}{}", kind.type_name(), change.suffix())
}
