//! Join entities assigning roles to users on an MSEL or a team.

use serde::{Deserialize, Serialize};

use crate::entity::Entity;
use crate::roles::{MselRole, TeamRole};
use crate::types::EntityId;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserMselRole {
    pub id: EntityId,
    pub user_id: EntityId,
    pub msel_id: EntityId,
    pub role: MselRole,
}

impl Entity for UserMselRole {
    const TYPE_NAME: &'static str = "UserMselRole";
    const COLLECTION: &'static str = "userMselRoles";
    const PARENT_COLLECTION: Option<&'static str> = Some("msels");

    fn id(&self) -> EntityId {
        self.id
    }

    fn parent_id(&self) -> Option<EntityId> {
        Some(self.msel_id)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserTeamRole {
    pub id: EntityId,
    pub user_id: EntityId,
    pub team_id: EntityId,
    pub role: TeamRole,
}

impl Entity for UserTeamRole {
    const TYPE_NAME: &'static str = "UserTeamRole";
    const COLLECTION: &'static str = "userTeamRoles";
    const PARENT_COLLECTION: Option<&'static str> = Some("teams");

    fn id(&self) -> EntityId {
        self.id
    }

    fn parent_id(&self) -> Option<EntityId> {
        Some(self.team_id)
    }
}
