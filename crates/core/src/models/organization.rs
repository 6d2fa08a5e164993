//! Organization entity model (participating organizations of an MSEL).

use serde::{Deserialize, Serialize};

use crate::entity::{Entity, Listable};
use crate::list_params::SortKey;
use crate::types::EntityId;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrganizationRecord {
    pub id: EntityId,
    /// `None` for organization templates.
    #[serde(default)]
    pub msel_id: Option<EntityId>,
    pub name: String,
    #[serde(default)]
    pub short_name: String,
    #[serde(default)]
    pub summary: Option<String>,
}

impl OrganizationRecord {
    pub fn is_template(&self) -> bool {
        self.msel_id.is_none()
    }
}

impl Entity for OrganizationRecord {
    const TYPE_NAME: &'static str = "Organization";
    const COLLECTION: &'static str = "organizations";
    const PARENT_COLLECTION: Option<&'static str> = Some("msels");

    fn id(&self) -> EntityId {
        self.id
    }

    fn parent_id(&self) -> Option<EntityId> {
        self.msel_id
    }
}

impl Listable for OrganizationRecord {
    fn search_text(&self) -> String {
        format!(
            "{} {} {}",
            self.name,
            self.short_name,
            self.summary.as_deref().unwrap_or_default()
        )
    }

    fn sort_key(&self, column: &str) -> SortKey {
        match column {
            "name" => SortKey::from(self.name.as_str()),
            "shortName" => SortKey::from(self.short_name.as_str()),
            _ => SortKey::None,
        }
    }
}
