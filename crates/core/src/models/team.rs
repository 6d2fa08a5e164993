//! Team (exercise unit) entity model.

use serde::{Deserialize, Serialize};

use crate::entity::{Entity, Listable};
use crate::list_params::SortKey;
use crate::models::user::UserRecord;
use crate::types::EntityId;

/// A team participating in an MSEL. Scenario events are assigned to teams
/// through a Team-typed data field whose value names the team.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TeamRecord {
    pub id: EntityId,
    #[serde(default)]
    pub msel_id: Option<EntityId>,
    pub name: String,
    #[serde(default)]
    pub short_name: String,
    #[serde(default)]
    pub users: Vec<UserRecord>,
}

impl TeamRecord {
    pub fn has_member(&self, user_id: EntityId) -> bool {
        self.users.iter().any(|user| user.id == user_id)
    }

    /// Whether a data value entry refers to this team. Short names are the
    /// usual reference; full names are accepted too.
    pub fn is_named(&self, value: &str) -> bool {
        let value = value.trim();
        !value.is_empty()
            && (value.eq_ignore_ascii_case(&self.short_name) || value.eq_ignore_ascii_case(&self.name))
    }
}

impl Entity for TeamRecord {
    const TYPE_NAME: &'static str = "Team";
    const COLLECTION: &'static str = "teams";
    const PARENT_COLLECTION: Option<&'static str> = Some("msels");

    fn id(&self) -> EntityId {
        self.id
    }

    fn parent_id(&self) -> Option<EntityId> {
        self.msel_id
    }
}

impl Listable for TeamRecord {
    fn search_text(&self) -> String {
        format!("{} {}", self.name, self.short_name)
    }

    fn sort_key(&self, column: &str) -> SortKey {
        match column {
            "name" => SortKey::from(self.name.as_str()),
            "shortName" => SortKey::from(self.short_name.as_str()),
            _ => SortKey::None,
        }
    }
}
