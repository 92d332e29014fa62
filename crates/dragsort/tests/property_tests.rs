use dragsort::{MemoryPivotStore, SiblingPivot};
use dragsort_core::{AttachMethod, DragOperations, Dragable, Position, Relation, SortError};
use proptest::prelude::*;
use std::collections::HashSet;

type TestPivot = SiblingPivot<{ 1 << 20 }, 1024>;
type TestStore = MemoryPivotStore<TestPivot, String>;

const POOL: usize = 8;

#[derive(Debug, Clone)]
enum Op {
    Attach(usize),
    Move {
        member: usize,
        before: Option<usize>,
        after: Option<usize>,
    },
    Rebalance,
}

fn member(idx: usize) -> String {
    format!("m{}", idx)
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        3 => (0..POOL).prop_map(Op::Attach),
        6 => (0..POOL, proptest::option::of(0..POOL), proptest::option::of(0..POOL))
            .prop_map(|(member, before, after)| Op::Move { member, before, after }),
        1 => Just(Op::Rebalance),
    ]
}

async fn apply(store: &TestStore, relation: &Relation<String>, op: &Op) -> Result<(), SortError> {
    match op {
        Op::Attach(idx) => {
            store.upsert_member(member(*idx), member(*idx))?;
            let pivot = TestPivot::new("owner", member(*idx));
            store
                .attach(relation, pivot, AttachMethod::IfNotExists, Position::End)
                .await?;
        }
        Op::Move {
            member: idx,
            before,
            after,
        } => {
            let before = before.map(member);
            let after = after.map(member);
            store
                .move_member(relation, &member(*idx), before.as_ref(), after.as_ref())
                .await?;
        }
        Op::Rebalance => store.resolve_conflict(relation).await?,
    }
    Ok(())
}

fn assert_distinct_and_in_range(values: &[(String, i64)]) {
    let unique: HashSet<i64> = values.iter().map(|(_, v)| *v).collect();
    assert_eq!(unique.len(), values.len(), "duplicate sort values: {:?}", values);
    assert!(
        values
            .iter()
            .all(|(_, v)| (0..=TestPivot::MAX_SORT_VALUE).contains(v)),
        "sort value out of range: {:?}",
        values
    );
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn prop_sort_values_stay_unique(ops in proptest::collection::vec(op_strategy(), 1..60)) {
        let rt = tokio::runtime::Runtime::new().unwrap();
        rt.block_on(async {
            let store = TestStore::new();
            let relation = Relation::new("tags", "owner".to_string());

            for op in &ops {
                match apply(&store, &relation, op).await {
                    Ok(()) => {}
                    // Stale ids are expected: ops reference members that were never attached.
                    Err(SortError::PivotNotFound { .. }) => {}
                    // Moving a member onto its own slot can exhaust a single retry.
                    Err(SortError::NoSortValueAvailable) => {}
                    Err(e) => panic!("unexpected error for {:?}: {}", op, e),
                }
                assert_distinct_and_in_range(&store.sort_values(&relation).unwrap());
            }
        });
    }

    #[test]
    fn prop_append_exceeds_every_existing_value(count in 1usize..40) {
        let rt = tokio::runtime::Runtime::new().unwrap();
        rt.block_on(async {
            let store = TestStore::new();
            let relation = Relation::new("tags", "owner".to_string());

            for idx in 0..count {
                let existing_max = store.max_sort_value(&relation).await.unwrap();
                let assigned = store
                    .attach(
                        &relation,
                        TestPivot::new("owner", member(idx)),
                        AttachMethod::IfNotExists,
                        Position::End,
                    )
                    .await
                    .unwrap()
                    .unwrap();

                match existing_max {
                    Some(max) => assert_eq!(assigned, max + TestPivot::INSERT_STEP),
                    None => assert_eq!(assigned, TestPivot::MAX_SORT_VALUE / 2),
                }
            }
        });
    }
}
