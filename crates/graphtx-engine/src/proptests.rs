//! Property tests for the chain invariants of spec.md §8 (1: chain
//! symmetry, 2: head correctness), run over randomly generated sequences
//! of creates/deletes. Invariant 3 (property-chain termination) is covered
//! alongside the payload-cap overflow test in `property_ops`.

use std::sync::Arc;

use graphtx_log::InMemoryLog;
use graphtx_model::{NodeId, RelationshipId, RelationshipTypeId, Side};
use graphtx_store::{MemoryStore, NoopCacheInvalidator};
use proptest::prelude::*;

use crate::config::EngineConfig;
use crate::transaction::WriteTransaction;

#[derive(Clone, Debug)]
enum Op {
    CreateRel { rel: u64, a: u64, b: u64 },
    DeleteRel { rel: u64 },
}

fn ops_strategy(node_count: u64, rel_count: u64) -> impl Strategy<Value = Vec<Op>> {
    let create =
        (0..rel_count, 0..node_count, 0..node_count).prop_map(|(rel, a, b)| Op::CreateRel { rel: rel + 1, a: a + 1, b: b + 1 });
    let delete = (0..rel_count).prop_map(|rel| Op::DeleteRel { rel: rel + 1 });
    prop::collection::vec(prop_oneof![create, delete], 1..40)
}

fn run(ops: &[Op], node_count: u64) -> WriteTransaction {
    let store = Arc::new(MemoryStore::default());
    let log = Arc::new(InMemoryLog::default());
    let mut tx = WriteTransaction::new(store, Arc::new(NoopCacheInvalidator), log, EngineConfig::default(), 1);

    for n in 1..=node_count {
        let _ = tx.node_create(NodeId::new(n));
    }

    let mut created = std::collections::HashSet::new();
    for op in ops {
        match *op {
            Op::CreateRel { rel, a, b } => {
                if created.contains(&rel) {
                    continue;
                }
                if tx
                    .relationship_create(RelationshipId::new(rel), RelationshipTypeId::new(0), NodeId::new(a), NodeId::new(b))
                    .is_ok()
                {
                    created.insert(rel);
                }
            }
            Op::DeleteRel { rel } => {
                let _ = tx.rel_delete(RelationshipId::new(rel));
            }
        }
    }
    tx
}

proptest! {
    /// Invariant 1: chain symmetry.
    #[test]
    fn chain_symmetry_holds(ops in ops_strategy(6, 10)) {
        let mut tx = run(&ops, 6);
        let ids: Vec<_> = tx.staging.relationships.keys().copied().collect();
        for id in ids {
            let rel = tx.relationship(id).unwrap();
            if !rel.in_use {
                continue;
            }
            for side in [Side::First, Side::Second] {
                let endpoint = rel.endpoint(side);
                let links = rel.links(side);
                if let Some(next_id) = links.next {
                    let next = tx.relationship(next_id).unwrap();
                    let next_side = next.side_facing(endpoint).expect("next must face the same endpoint");
                    prop_assert_eq!(next.links(next_side).prev, Some(id));
                }
                if let Some(prev_id) = links.prev {
                    let prev = tx.relationship(prev_id).unwrap();
                    let prev_side = prev.side_facing(endpoint).expect("prev must face the same endpoint");
                    prop_assert_eq!(prev.links(prev_side).next, Some(id));
                }
            }
        }
    }

    /// Invariant 2: head correctness.
    #[test]
    fn head_correctness_holds(ops in ops_strategy(6, 10)) {
        let mut tx = run(&ops, 6);
        for n in 1..=6u64 {
            let node = tx.node(NodeId::new(n)).unwrap();
            if let Some(head_id) = node.next_rel {
                let head = tx.relationship(head_id).unwrap();
                let side = head.side_facing(NodeId::new(n)).expect("head must face the node");
                prop_assert_eq!(head.links(side).prev, None);
            }
        }
    }
}
