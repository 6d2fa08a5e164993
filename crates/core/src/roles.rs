//! MSEL and team roles, and the resolver that turns role assignments into
//! the capability set used to gate mutations.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::models::msel::MselRecord;
use crate::models::role_assignment::{UserMselRole, UserTeamRole};
use crate::types::EntityId;

/// Roles a user can hold on an MSEL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MselRole {
    Owner,
    Approver,
    Editor,
    MoveEditor,
    Evaluator,
    Viewer,
}

impl MselRole {
    pub const ALL: [MselRole; 6] = [
        Self::Owner,
        Self::Approver,
        Self::Editor,
        Self::MoveEditor,
        Self::Evaluator,
        Self::Viewer,
    ];
}

/// Roles a user can hold on a team.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TeamRole {
    Inviter,
    GalleryObserver,
    CiteObserver,
}

/// What a user may do on one MSEL (or one of its scenario events).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MselCapabilities {
    pub owner: bool,
    pub move_editor: bool,
    pub approver: bool,
    pub editor: bool,
    pub evaluator: bool,
    pub viewer: bool,
}

impl MselCapabilities {
    pub fn all() -> Self {
        Self {
            owner: true,
            move_editor: true,
            approver: true,
            editor: true,
            evaluator: true,
            viewer: true,
        }
    }

    pub fn has(&self, role: MselRole) -> bool {
        match role {
            MselRole::Owner => self.owner,
            MselRole::Approver => self.approver,
            MselRole::Editor => self.editor,
            MselRole::MoveEditor => self.move_editor,
            MselRole::Evaluator => self.evaluator,
            MselRole::Viewer => self.viewer,
        }
    }

    /// Fail with [`CoreError::Forbidden`] unless `role` is granted.
    pub fn require(&self, role: MselRole) -> Result<(), CoreError> {
        if self.has(role) {
            Ok(())
        } else {
            Err(CoreError::Forbidden(format!("{role:?} role required")))
        }
    }
}

/// Resolve the capabilities of `user_id` on `msel`.
///
/// Ownership (creator or explicit Owner) grants everything. Otherwise the
/// user's explicit assignments decide, with approver implying editor and
/// any role implying viewer.
///
/// An event assigned to one of the user's teams (see
/// [`event_assigned_to_user_team`]) grants exactly the MSEL-level
/// assignments, and so does any other event, so `scenario_event_id` never
/// changes the result.
pub fn resolve_msel_capabilities(
    user_id: EntityId,
    msel: &MselRecord,
    scenario_event_id: Option<EntityId>,
) -> MselCapabilities {
    let roles = &msel.user_msel_roles;
    let owner = msel.created_by == user_id || holds(roles, user_id, msel.id, MselRole::Owner);
    let move_editor = holds(roles, user_id, msel.id, MselRole::MoveEditor);

    if owner {
        return MselCapabilities::all();
    }

    if let Some(event_id) = scenario_event_id {
        tracing::trace!(%user_id, %event_id, "Resolving event capabilities from MSEL roles");
    }
    from_assignments(roles, user_id, msel.id, move_editor)
}

/// Team-scoped capabilities of `user_id` on `team_id`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TeamCapabilities {
    pub inviter: bool,
    pub gallery_observer: bool,
    pub cite_observer: bool,
}

pub fn resolve_team_capabilities(
    user_id: EntityId,
    team_id: EntityId,
    assignments: &[UserTeamRole],
) -> TeamCapabilities {
    let holds = |role: TeamRole| {
        assignments
            .iter()
            .any(|a| a.user_id == user_id && a.team_id == team_id && a.role == role)
    };
    TeamCapabilities {
        inviter: holds(TeamRole::Inviter),
        gallery_observer: holds(TeamRole::GalleryObserver),
        cite_observer: holds(TeamRole::CiteObserver),
    }
}

fn holds(roles: &[UserMselRole], user_id: EntityId, msel_id: EntityId, role: MselRole) -> bool {
    roles
        .iter()
        .any(|a| a.user_id == user_id && a.msel_id == msel_id && a.role == role)
}

fn from_assignments(
    roles: &[UserMselRole],
    user_id: EntityId,
    msel_id: EntityId,
    move_editor: bool,
) -> MselCapabilities {
    let approver = holds(roles, user_id, msel_id, MselRole::Approver);
    let editor = approver || holds(roles, user_id, msel_id, MselRole::Editor);
    let evaluator = holds(roles, user_id, msel_id, MselRole::Evaluator);
    let viewer = approver
        || editor
        || move_editor
        || evaluator
        || holds(roles, user_id, msel_id, MselRole::Viewer);

    MselCapabilities {
        owner: false,
        move_editor,
        approver,
        editor,
        evaluator,
        viewer,
    }
}

/// Whether the event's Team-typed data value names (by short name or
/// name, comma list aware) a team of `msel` that `user_id` belongs to.
pub fn event_assigned_to_user_team(user_id: EntityId, msel: &MselRecord, event_id: EntityId) -> bool {
    let Some(field) = msel.team_data_field() else {
        return false;
    };
    let Some(value) = msel
        .scenario_event(event_id)
        .and_then(|event| event.value_for(field.id))
    else {
        return false;
    };

    value.values().into_iter().any(|name| {
        msel.teams
            .iter()
            .any(|team| team.is_named(name) && team.has_member(user_id))
    })
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;
    use crate::models::{
        DataFieldRecord, DataFieldType, DataValueRecord, MselStatus, ScenarioEventRecord, TeamRecord,
        UserRecord,
    };

    fn msel(created_by: EntityId) -> MselRecord {
        MselRecord {
            id: EntityId::new_v4(),
            name: "Exercise".into(),
            description: None,
            status: MselStatus::Pending,
            start_time: None,
            duration_seconds: 3600,
            created_by,
            date_modified: None,
            user_msel_roles: vec![],
            scenario_events: vec![],
            data_fields: vec![],
            moves: vec![],
            teams: vec![],
        }
    }

    fn assign(msel: &mut MselRecord, user_id: EntityId, role: MselRole) {
        msel.user_msel_roles.push(UserMselRole {
            id: EntityId::new_v4(),
            user_id,
            msel_id: msel.id,
            role,
        });
    }

    /// An MSEL with a Blue team containing `member`, and one event assigned
    /// to `assigned_to` through a Team-typed field.
    fn msel_with_team_event(member: EntityId, assigned_to: &str) -> (MselRecord, EntityId) {
        let mut msel = msel(EntityId::new_v4());
        let field_id = EntityId::new_v4();
        let event_id = EntityId::new_v4();
        msel.data_fields.push(DataFieldRecord {
            id: field_id,
            msel_id: Some(msel.id),
            name: "Assigned To".into(),
            data_type: DataFieldType::Team,
            display_order: 1,
            on_scenario_event_list: true,
            on_exercise_view: true,
            is_chosen_from_list: true,
        });
        msel.teams.push(TeamRecord {
            id: EntityId::new_v4(),
            msel_id: Some(msel.id),
            name: "Blue Cell".into(),
            short_name: "Blue".into(),
            users: vec![UserRecord {
                id: member,
                name: "Member".into(),
            }],
        });
        msel.scenario_events.push(ScenarioEventRecord {
            id: event_id,
            msel_id: msel.id,
            row_index: 0,
            delta_seconds: 0,
            data_values: vec![DataValueRecord {
                id: EntityId::new_v4(),
                scenario_event_id: event_id,
                data_field_id: field_id,
                value: Some(assigned_to.into()),
            }],
            row_metadata: None,
            is_hidden: false,
        });
        (msel, event_id)
    }

    #[test]
    fn creator_gets_everything() {
        let user = EntityId::new_v4();
        let msel = msel(user);
        assert_eq!(msel.has_role(user, None), MselCapabilities::all());
    }

    #[test]
    fn explicit_owner_gets_everything() {
        let user = EntityId::new_v4();
        let mut msel = msel(EntityId::new_v4());
        assign(&mut msel, user, MselRole::Owner);
        assert_eq!(msel.has_role(user, None), MselCapabilities::all());
    }

    #[test]
    fn no_assignments_means_nothing() {
        let msel = msel(EntityId::new_v4());
        assert_eq!(msel.has_role(EntityId::new_v4(), None), MselCapabilities::default());
    }

    #[test]
    fn approver_implies_editor_and_viewer() {
        let user = EntityId::new_v4();
        let mut msel = msel(EntityId::new_v4());
        assign(&mut msel, user, MselRole::Approver);
        let caps = msel.has_role(user, None);
        assert!(caps.approver && caps.editor && caps.viewer);
        assert!(!caps.owner && !caps.evaluator && !caps.move_editor);
    }

    #[test]
    fn move_editor_implies_viewer_only() {
        let user = EntityId::new_v4();
        let mut msel = msel(EntityId::new_v4());
        assign(&mut msel, user, MselRole::MoveEditor);
        let caps = msel.has_role(user, None);
        assert!(caps.move_editor && caps.viewer);
        assert!(!caps.editor && !caps.approver);
    }

    #[test]
    fn assignments_for_other_users_are_ignored() {
        let user = EntityId::new_v4();
        let mut msel = msel(EntityId::new_v4());
        assign(&mut msel, EntityId::new_v4(), MselRole::Editor);
        assert_eq!(msel.has_role(user, None), MselCapabilities::default());
    }

    #[test]
    fn assignments_for_other_msels_are_ignored() {
        let user = EntityId::new_v4();
        let mut msel = msel(EntityId::new_v4());
        msel.user_msel_roles.push(UserMselRole {
            id: EntityId::new_v4(),
            user_id: user,
            msel_id: EntityId::new_v4(),
            role: MselRole::Editor,
        });
        assert_eq!(msel.has_role(user, None), MselCapabilities::default());
    }

    #[test]
    fn event_assigned_to_member_team_uses_msel_roles() {
        let user = EntityId::new_v4();
        let (mut msel, event_id) = msel_with_team_event(user, "Blue");
        assign(&mut msel, user, MselRole::Editor);
        let caps = msel.has_role(user, Some(event_id));
        assert!(caps.editor);
        assert!(caps.viewer);
        assert!(!caps.approver);
        assert!(!caps.owner);
    }

    #[test]
    fn event_id_never_changes_the_result() {
        let user = EntityId::new_v4();
        let (mut msel, event_id) = msel_with_team_event(user, "Blue");
        assign(&mut msel, user, MselRole::Approver);
        assert!(event_assigned_to_user_team(user, &msel, event_id));
        assert_eq!(msel.has_role(user, Some(event_id)), msel.has_role(user, None));

        let (mut other, other_event) = msel_with_team_event(user, "Red");
        assign(&mut other, user, MselRole::Approver);
        assert!(!event_assigned_to_user_team(user, &other, other_event));
        assert_eq!(other.has_role(user, Some(other_event)), other.has_role(user, None));
    }

    #[test]
    fn team_assignment_requires_membership() {
        let (msel, event_id) = msel_with_team_event(EntityId::new_v4(), "Blue Cell");
        assert!(!event_assigned_to_user_team(EntityId::new_v4(), &msel, event_id));
        assert!(!event_assigned_to_user_team(
            msel.teams[0].users[0].id,
            &msel,
            EntityId::new_v4()
        ));
        assert!(event_assigned_to_user_team(msel.teams[0].users[0].id, &msel, event_id));
    }

    #[test]
    fn event_assigned_in_comma_list() {
        let user = EntityId::new_v4();
        let (mut msel, event_id) = msel_with_team_event(user, "Red, Blue");
        assign(&mut msel, user, MselRole::Evaluator);
        let caps = msel.has_role(user, Some(event_id));
        assert!(caps.evaluator && caps.viewer);
    }

    #[test]
    fn unknown_event_falls_through_to_msel_roles() {
        let user = EntityId::new_v4();
        let (mut msel, _) = msel_with_team_event(user, "Blue");
        assign(&mut msel, user, MselRole::Viewer);
        let caps = msel.has_role(user, Some(EntityId::new_v4()));
        assert!(caps.viewer);
        assert!(!caps.editor);
    }

    #[test]
    fn missing_team_field_falls_through() {
        let user = EntityId::new_v4();
        let (mut msel, event_id) = msel_with_team_event(user, "Blue");
        msel.data_fields.clear();
        assert_eq!(msel.has_role(user, Some(event_id)), MselCapabilities::default());
    }

    #[test]
    fn require_reports_forbidden() {
        let caps = MselCapabilities {
            viewer: true,
            ..Default::default()
        };
        assert!(caps.require(MselRole::Viewer).is_ok());
        assert_matches!(caps.require(MselRole::Editor), Err(CoreError::Forbidden(_)));
    }

    #[test]
    fn team_roles_resolve_per_team() {
        let user = EntityId::new_v4();
        let team = EntityId::new_v4();
        let assignments = vec![
            UserTeamRole {
                id: EntityId::new_v4(),
                user_id: user,
                team_id: team,
                role: TeamRole::Inviter,
            },
            UserTeamRole {
                id: EntityId::new_v4(),
                user_id: user,
                team_id: EntityId::new_v4(),
                role: TeamRole::CiteObserver,
            },
        ];
        let caps = resolve_team_capabilities(user, team, &assignments);
        assert_eq!(
            caps,
            TeamCapabilities {
                inviter: true,
                gallery_observer: false,
                cite_observer: false,
            }
        );
    }
}
