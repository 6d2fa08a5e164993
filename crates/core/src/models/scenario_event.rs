//! Scenario event entity model.

use serde::{Deserialize, Serialize};

use crate::entity::{Entity, Listable};
use crate::error::CoreError;
use crate::list_params::SortKey;
use crate::models::data_value::DataValueRecord;
use crate::types::EntityId;

/// Display hints for the event's row in the event list.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RowMetadata {
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default)]
    pub height: Option<u32>,
}

/// A timed event within an MSEL.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScenarioEventRecord {
    pub id: EntityId,
    pub msel_id: EntityId,
    #[serde(default)]
    pub row_index: i32,
    /// Offset from the MSEL start time. Never negative.
    #[serde(default)]
    pub delta_seconds: i64,
    #[serde(default)]
    pub data_values: Vec<DataValueRecord>,
    #[serde(default)]
    pub row_metadata: Option<RowMetadata>,
    #[serde(default)]
    pub is_hidden: bool,
}

impl ScenarioEventRecord {
    /// The value stored for `data_field_id`, if one exists. Absence means
    /// the field is blank on this event.
    pub fn value_for(&self, data_field_id: EntityId) -> Option<&DataValueRecord> {
        self.data_values
            .iter()
            .find(|value| value.data_field_id == data_field_id)
    }
}

impl Entity for ScenarioEventRecord {
    const TYPE_NAME: &'static str = "ScenarioEvent";
    const COLLECTION: &'static str = "scenarioEvents";
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
                "Scenario event offset must not be negative (got {}s)",
                self.delta_seconds
            )));
        }
        Ok(())
    }
}

impl Listable for ScenarioEventRecord {
    fn search_text(&self) -> String {
        self.data_values
            .iter()
            .filter_map(|value| value.value.as_deref())
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// `deltaSeconds` and `rowIndex` are built in; any other column is
    /// read as a data field id and sorts by that field's value.
    fn sort_key(&self, column: &str) -> SortKey {
        match column {
            "deltaSeconds" => SortKey::Int(self.delta_seconds),
            "rowIndex" => SortKey::Int(self.row_index.into()),
            other => match other.parse::<EntityId>() {
                Ok(field_id) => SortKey::from(
                    self.value_for(field_id)
                        .and_then(|value| value.value.as_deref()),
                ),
                Err(_) => SortKey::None,
            },
        }
    }
}
