//! Move entity model: a phase of the exercise starting at an offset from
//! the MSEL start.

use serde::{Deserialize, Serialize};

use crate::entity::{Entity, Listable};
use crate::error::CoreError;
use crate::list_params::SortKey;
use crate::types::EntityId;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MoveRecord {
    pub id: EntityId,
    pub msel_id: EntityId,
    pub move_number: i32,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub delta_seconds: i64,
}

impl Entity for MoveRecord {
    const TYPE_NAME: &'static str = "Move";
    const COLLECTION: &'static str = "moves";
    const PARENT_COLLECTION: Option<&'static str> = Some("msels");

    fn id(&self) -> EntityId {
        self.id
    }

    fn parent_id(&self) -> Option<EntityId> {
        Some(self.msel_id)
    }

    fn validate(&self) -> Result<(), CoreError> {
        if self.delta_seconds < 0 {
            return Err(CoreError::Validation(format!(
                "Move {} starts before the MSEL ({}s)",
                self.move_number, self.delta_seconds
            )));
        }
        Ok(())
    }
}

impl Listable for MoveRecord {
    fn search_text(&self) -> String {
        format!("{} {}", self.move_number, self.description.as_deref().unwrap_or_default())
    }

    fn sort_key(&self, column: &str) -> SortKey {
        match column {
            "moveNumber" => SortKey::Int(self.move_number.into()),
            "deltaSeconds" => SortKey::Int(self.delta_seconds),
            _ => SortKey::None,
        }
    }
}
