//! Entity records as exchanged with the REST api and the realtime hub.
//!
//! Field names are camelCase on the wire.

pub mod data_field;
pub mod data_value;
pub mod exercise_move;
pub mod msel;
pub mod organization;
pub mod role_assignment;
pub mod scenario_event;
pub mod team;
pub mod user;

pub use data_field::{DataFieldRecord, DataFieldType};
pub use data_value::DataValueRecord;
pub use exercise_move::MoveRecord;
pub use msel::{MselRecord, MselStatus};
pub use organization::OrganizationRecord;
pub use role_assignment::{UserMselRole, UserTeamRole};
pub use scenario_event::{RowMetadata, ScenarioEventRecord};
pub use team::TeamRecord;
pub use user::UserRecord;
