//! Data field entity model: the schema of one custom attribute carried by
//! scenario events.

use serde::{Deserialize, Serialize};

use crate::entity::{Entity, Listable};
use crate::error::CoreError;
use crate::list_params::SortKey;
use crate::types::EntityId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DataFieldType {
    String,
    Integer,
    Double,
    DateTime,
    Organization,
    Status,
    Team,
    TeamsMultiple,
    Move,
    Url,
    Boolean,
    Card,
    Checkbox,
    Html,
    #[serde(other)]
    Other,
}

impl DataFieldType {
    /// Types whose values name teams.
    pub fn references_teams(self) -> bool {
        matches!(self, Self::Team | Self::TeamsMultiple)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataFieldRecord {
    pub id: EntityId,
    /// `None` for data field templates.
    #[serde(default)]
    pub msel_id: Option<EntityId>,
    pub name: String,
    pub data_type: DataFieldType,
    /// Position among the MSEL's fields, unique per MSEL.
    #[serde(default)]
    pub display_order: i32,
    #[serde(default)]
    pub on_scenario_event_list: bool,
    #[serde(default)]
    pub on_exercise_view: bool,
    #[serde(default)]
    pub is_chosen_from_list: bool,
}

impl Entity for DataFieldRecord {
    const TYPE_NAME: &'static str = "DataField";
    const COLLECTION: &'static str = "dataFields";
    const PARENT_COLLECTION: Option<&'static str> = Some("msels");

    fn id(&self) -> EntityId {
        self.id
    }

    fn parent_id(&self) -> Option<EntityId> {
        self.msel_id
    }

    fn validate(&self) -> Result<(), CoreError> {
        if self.name.trim().is_empty() {
            return Err(CoreError::Validation("Data field name must not be empty".into()));
        }
        Ok(())
    }
}

impl Listable for DataFieldRecord {
    fn search_text(&self) -> String {
        self.name.clone()
    }

    fn sort_key(&self, column: &str) -> SortKey {
        match column {
            "name" => SortKey::from(self.name.as_str()),
            "displayOrder" => SortKey::Int(self.display_order.into()),
            _ => SortKey::None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_data_type_deserializes_as_other() {
        let json = serde_json::json!({
            "id": EntityId::new_v4(),
            "name": "Sketch",
            "dataType": "Drawing",
        });
        let field: DataFieldRecord = serde_json::from_value(json).unwrap();
        assert_eq!(field.data_type, DataFieldType::Other);
        assert!(field.msel_id.is_none());
    }

    #[test]
    fn blank_name_fails_validation() {
        let field = DataFieldRecord {
            id: EntityId::new_v4(),
            msel_id: None,
            name: "  ".into(),
            data_type: DataFieldType::String,
            display_order: 1,
            on_scenario_event_list: true,
            on_exercise_view: false,
            is_chosen_from_list: false,
        };
        assert!(field.validate().is_err());
    }
}
