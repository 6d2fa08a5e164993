//! Property tests for entity store mutation semantics.
//!
//! REST responses and realtime events both land on the same store through
//! `upsert`/`remove`, so the final state for an id is decided by the last
//! operation applied, whichever path it came from.

use msel_core::models::UserRecord;
use msel_core::types::EntityId;
use msel_store::EntityStore;
use proptest::prelude::*;

#[derive(Debug, Clone)]
enum Source {
    Rest,
    Realtime,
}

#[derive(Debug, Clone)]
enum Op {
    Upsert(Source, String),
    Remove(Source),
}

fn op_strategy() -> impl Strategy<Value = Op> {
    let source = prop_oneof![Just(Source::Rest), Just(Source::Realtime)];
    prop_oneof![
        (source.clone(), "[a-z]{1,8}").prop_map(|(s, name)| Op::Upsert(s, name)),
        source.prop_map(Op::Remove),
    ]
}

fn apply(store: &EntityStore<UserRecord>, id: EntityId, op: &Op) {
    match op {
        // Scoped REST loads arrive in batches; realtime events one by one.
        Op::Upsert(Source::Rest, name) => store.upsert_many(vec![UserRecord {
            id,
            name: name.clone(),
        }]),
        Op::Upsert(Source::Realtime, name) => store.upsert(UserRecord {
            id,
            name: name.clone(),
        }),
        Op::Remove(_) => {
            store.remove(id);
        }
    }
}

proptest! {
    #[test]
    fn last_writer_wins(ops in proptest::collection::vec(op_strategy(), 1..30)) {
        let store = EntityStore::new();
        let id = EntityId::new_v4();
        for op in &ops {
            apply(&store, id, op);
        }

        match ops.last() {
            Some(Op::Upsert(_, name)) => {
                prop_assert_eq!(store.get(id).map(|u| u.name), Some(name.clone()));
            }
            Some(Op::Remove(_)) | None => prop_assert!(store.get(id).is_none()),
        }
        prop_assert!(store.len() <= 1);
    }

    #[test]
    fn upsert_is_idempotent(names in proptest::collection::vec("[a-z]{1,8}", 1..10)) {
        let once = EntityStore::new();
        let twice = EntityStore::new();
        let records: Vec<UserRecord> = names
            .into_iter()
            .map(|name| UserRecord { id: EntityId::new_v4(), name })
            .collect();

        for record in &records {
            once.upsert(record.clone());
            twice.upsert(record.clone());
            twice.upsert(record.clone());
        }

        prop_assert_eq!(once.query().get_all(), twice.query().get_all());
    }

    #[test]
    fn removing_absent_ids_keeps_size(count in 0usize..10, misses in 1usize..5) {
        let store = EntityStore::new();
        for n in 0..count {
            store.upsert(UserRecord { id: EntityId::new_v4(), name: n.to_string() });
        }
        for _ in 0..misses {
            prop_assert!(!store.remove(EntityId::new_v4()));
        }
        prop_assert_eq!(store.len(), count);
    }
}
