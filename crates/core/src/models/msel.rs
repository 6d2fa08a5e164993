//! MSEL entity model.

use serde::{Deserialize, Serialize};

use crate::entity::{Entity, Listable};
use crate::error::CoreError;
use crate::list_params::SortKey;
use crate::models::data_field::DataFieldRecord;
use crate::models::exercise_move::MoveRecord;
use crate::models::role_assignment::UserMselRole;
use crate::models::scenario_event::ScenarioEventRecord;
use crate::models::team::TeamRecord;
use crate::roles::{self, MselCapabilities};
use crate::types::{EntityId, Timestamp};

/// MSEL lifecycle status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum MselStatus {
    #[default]
    Pending,
    Entered,
    Approved,
    Complete,
    Deployed,
    Archived,
}

impl MselStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "Pending",
            Self::Entered => "Entered",
            Self::Approved => "Approved",
            Self::Complete => "Complete",
            Self::Deployed => "Deployed",
            Self::Archived => "Archived",
        }
    }
}

/// A Master Scenario Event List with its nested children.
///
/// The nested lists are whatever the server embedded in the record; the
/// per-type stores hold the live copies (see `SessionStores::msel_view`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MselRecord {
    pub id: EntityId,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub status: MselStatus,
    #[serde(default)]
    pub start_time: Option<Timestamp>,
    #[serde(default)]
    pub duration_seconds: i64,
    /// The creating user, who always owns the MSEL.
    pub created_by: EntityId,
    #[serde(default)]
    pub date_modified: Option<Timestamp>,
    #[serde(default)]
    pub user_msel_roles: Vec<UserMselRole>,
    #[serde(default)]
    pub scenario_events: Vec<ScenarioEventRecord>,
    #[serde(default)]
    pub data_fields: Vec<DataFieldRecord>,
    #[serde(default)]
    pub moves: Vec<MoveRecord>,
    #[serde(default)]
    pub teams: Vec<TeamRecord>,
}

impl MselRecord {
    /// Capabilities of `user_id` on this MSEL, optionally narrowed to one
    /// scenario event. See [`roles::resolve_msel_capabilities`].
    pub fn has_role(&self, user_id: EntityId, scenario_event_id: Option<EntityId>) -> MselCapabilities {
        roles::resolve_msel_capabilities(user_id, self, scenario_event_id)
    }

    pub fn scenario_event(&self, id: EntityId) -> Option<&ScenarioEventRecord> {
        self.scenario_events.iter().find(|event| event.id == id)
    }

    /// The first data field whose values name teams.
    pub fn team_data_field(&self) -> Option<&DataFieldRecord> {
        self.data_fields
            .iter()
            .find(|field| field.data_type.references_teams())
    }
}

impl Entity for MselRecord {
    const TYPE_NAME: &'static str = "Msel";
    const COLLECTION: &'static str = "msels";

    fn id(&self) -> EntityId {
        self.id
    }

    fn validate(&self) -> Result<(), CoreError> {
        if self.name.trim().is_empty() {
            return Err(CoreError::Validation("MSEL name must not be empty".into()));
        }
        if self.duration_seconds < 0 {
            return Err(CoreError::Validation("MSEL duration must not be negative".into()));
        }
        Ok(())
    }
}

impl Listable for MselRecord {
    fn search_text(&self) -> String {
        format!(
            "{} {} {}",
            self.name,
            self.description.as_deref().unwrap_or_default(),
            self.status.as_str()
        )
    }

    fn sort_key(&self, column: &str) -> SortKey {
        match column {
            "name" => SortKey::from(self.name.as_str()),
            "status" => SortKey::from(self.status.as_str()),
            "startTime" => self.start_time.map_or(SortKey::None, SortKey::Time),
            "dateModified" => self.date_modified.map_or(SortKey::None, SortKey::Time),
            "durationSeconds" => SortKey::Int(self.duration_seconds),
            _ => SortKey::None,
        }
    }
}
