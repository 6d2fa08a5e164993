//! Data value entity model: the value of one data field on one scenario
//! event.

use serde::{Deserialize, Serialize};

use crate::entity::Entity;
use crate::types::EntityId;

/// Separator used when a value holds a list (e.g. several teams).
pub const LIST_SEPARATOR: char = ',';

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataValueRecord {
    pub id: EntityId,
    pub scenario_event_id: EntityId,
    pub data_field_id: EntityId,
    #[serde(default)]
    pub value: Option<String>,
}

impl DataValueRecord {
    /// Split a comma-joined value into its trimmed, non-empty entries.
    pub fn values(&self) -> Vec<&str> {
        self.value
            .as_deref()
            .unwrap_or_default()
            .split(LIST_SEPARATOR)
            .map(str::trim)
            .filter(|entry| !entry.is_empty())
            .collect()
    }
}

impl Entity for DataValueRecord {
    const TYPE_NAME: &'static str = "DataValue";
    const COLLECTION: &'static str = "dataValues";
    const PARENT_COLLECTION: Option<&'static str> = Some("scenarioEvents");

    fn id(&self) -> EntityId {
        self.id
    }

    fn parent_id(&self) -> Option<EntityId> {
        Some(self.scenario_event_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn value(raw: Option<&str>) -> DataValueRecord {
        DataValueRecord {
            id: EntityId::new_v4(),
            scenario_event_id: EntityId::new_v4(),
            data_field_id: EntityId::new_v4(),
            value: raw.map(str::to_string),
        }
    }

    #[test]
    fn splits_comma_joined_values() {
        assert_eq!(value(Some("Blue, Red,,Green ")).values(), vec!["Blue", "Red", "Green"]);
    }

    #[test]
    fn missing_value_is_empty_list() {
        assert!(value(None).values().is_empty());
        assert!(value(Some("  ")).values().is_empty());
    }
}
