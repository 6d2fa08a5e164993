//! User entity model.

use serde::{Deserialize, Serialize};

use crate::entity::{Entity, Listable};
use crate::list_params::SortKey;
use crate::types::EntityId;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRecord {
    pub id: EntityId,
    pub name: String,
}

impl Entity for UserRecord {
    const TYPE_NAME: &'static str = "User";
    const COLLECTION: &'static str = "users";

    fn id(&self) -> EntityId {
        self.id
    }
}

impl Listable for UserRecord {
    fn search_text(&self) -> String {
        self.name.clone()
    }

    fn sort_key(&self, column: &str) -> SortKey {
        match column {
            "name" => SortKey::from(self.name.as_str()),
            _ => SortKey::None,
        }
    }
}
