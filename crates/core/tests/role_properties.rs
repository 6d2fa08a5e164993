//! Property tests for the MSEL capability resolver.
//!
//! Assignment lists are generated over a small pool of users so that the
//! evaluated user regularly holds several roles at once.

use msel_core::models::{MselRecord, MselStatus, UserMselRole};
use msel_core::roles::{resolve_msel_capabilities, MselCapabilities, MselRole};
use msel_core::types::EntityId;
use proptest::prelude::*;

const USER_POOL: usize = 3;

fn role_strategy() -> impl Strategy<Value = MselRole> {
    proptest::sample::select(MselRole::ALL.to_vec())
}

/// `(user index, role)` pairs; index 0 is the evaluated user.
fn assignments_strategy() -> impl Strategy<Value = Vec<(usize, MselRole)>> {
    proptest::collection::vec((0..USER_POOL, role_strategy()), 0..12)
}

fn build_msel(users: &[EntityId], creator: EntityId, assignments: &[(usize, MselRole)]) -> MselRecord {
    let id = EntityId::new_v4();
    MselRecord {
        id,
        name: "Property".into(),
        description: None,
        status: MselStatus::Pending,
        start_time: None,
        duration_seconds: 0,
        created_by: creator,
        date_modified: None,
        user_msel_roles: assignments
            .iter()
            .map(|(user, role)| UserMselRole {
                id: EntityId::new_v4(),
                user_id: users[*user],
                msel_id: id,
                role: *role,
            })
            .collect(),
        scenario_events: vec![],
        data_fields: vec![],
        moves: vec![],
        teams: vec![],
    }
}

fn users() -> Vec<EntityId> {
    (0..USER_POOL).map(|_| EntityId::new_v4()).collect()
}

proptest! {
    #[test]
    fn creator_always_has_every_capability(assignments in assignments_strategy()) {
        let users = users();
        let msel = build_msel(&users, users[0], &assignments);
        prop_assert_eq!(resolve_msel_capabilities(users[0], &msel, None), MselCapabilities::all());
        prop_assert_eq!(
            resolve_msel_capabilities(users[0], &msel, Some(EntityId::new_v4())),
            MselCapabilities::all()
        );
    }

    #[test]
    fn higher_roles_imply_lower_ones(assignments in assignments_strategy()) {
        let users = users();
        let msel = build_msel(&users, EntityId::new_v4(), &assignments);
        let caps = resolve_msel_capabilities(users[0], &msel, None);

        prop_assert!(!caps.approver || caps.editor);
        prop_assert!(!(caps.approver || caps.editor || caps.move_editor || caps.evaluator) || caps.viewer);
        prop_assert!(!caps.owner || caps == MselCapabilities::all());
    }

    #[test]
    fn explicit_assignments_are_always_reflected(assignments in assignments_strategy()) {
        let users = users();
        let msel = build_msel(&users, EntityId::new_v4(), &assignments);
        let caps = resolve_msel_capabilities(users[0], &msel, None);

        for (user, role) in &assignments {
            if *user == 0 {
                prop_assert!(caps.has(*role), "{:?} assigned but not granted", role);
            }
        }
    }

    #[test]
    fn resolution_is_deterministic(assignments in assignments_strategy(), creator_is_user in any::<bool>()) {
        let users = users();
        let creator = if creator_is_user { users[0] } else { users[1] };
        let msel = build_msel(&users, creator, &assignments);
        let first = resolve_msel_capabilities(users[0], &msel, None);
        let second = resolve_msel_capabilities(users[0], &msel.clone(), None);
        prop_assert_eq!(first, second);
    }
}
