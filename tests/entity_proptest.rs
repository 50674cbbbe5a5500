//! Property tests for the Entity Pool's versioning guarantees.
//!
//! Random allocate/deallocate/is_alive sequences must uphold spec §8
//! invariants 5 and 6: liveness tracks allocation exactly, and deallocating
//! a stale entity never disturbs the handle's current occupant.

use std::collections::HashMap;

use archetype_ecs_core::prelude::*;
use proptest::prelude::*;

#[derive(Debug, Clone)]
enum PoolOp {
    Allocate,
    DeallocateLive(usize),
    DeallocateStale(usize),
}

fn pool_op_strategy() -> impl Strategy<Value = PoolOp> {
    prop_oneof![
        3 => Just(PoolOp::Allocate),
        2 => (0..64usize).prop_map(PoolOp::DeallocateLive),
        1 => (0..64usize).prop_map(PoolOp::DeallocateStale),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(4_000))]

    #[test]
    fn entity_pool_random_ops_preserve_liveness_invariants(
        ops in prop::collection::vec(pool_op_strategy(), 1..300)
    ) {
        let pool = EntityPool::new();
        let mut live: HashMap<u32, Entity> = HashMap::new();
        let mut stale_graveyard: Vec<Entity> = Vec::new();
        let mut handles_in_order: Vec<u32> = Vec::new();

        for op in ops {
            match op {
                PoolOp::Allocate => {
                    let e = pool.allocate_entity();
                    prop_assert!(pool.is_alive(e));
                    if let Some(prior) = live.insert(e.handle(), e) {
                        // Same handle reused -- version must strictly increase.
                        prop_assert!(e.version() > prior.version());
                    }
                    if !handles_in_order.contains(&e.handle()) {
                        handles_in_order.push(e.handle());
                    }
                }
                PoolOp::DeallocateLive(pick) => {
                    if !handles_in_order.is_empty() {
                        let handle = handles_in_order[pick % handles_in_order.len()];
                        if let Some(&e) = live.get(&handle) {
                            prop_assert!(pool.deallocate_entity(e));
                            prop_assert!(!pool.is_alive(e));
                            live.remove(&handle);
                            stale_graveyard.push(e);
                        }
                    }
                }
                PoolOp::DeallocateStale(pick) => {
                    if !stale_graveyard.is_empty() {
                        let idx = pick % stale_graveyard.len();
                        let stale = stale_graveyard[idx];
                        // Invariant 6: no-op, and doesn't disturb whoever
                        // currently occupies that handle (if anyone).
                        let occupant_before = live.get(&stale.handle()).copied();
                        prop_assert!(!pool.deallocate_entity(stale));
                        if let Some(occupant) = occupant_before {
                            prop_assert!(pool.is_alive(occupant));
                        }
                    }
                }
            }

            for &e in live.values() {
                prop_assert!(pool.is_alive(e));
            }
        }
    }
}
