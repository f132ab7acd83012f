//! Def-propagator (C8): once a φ is materialised at a join block, forward
//! broadcast compresses any already-resolved pass-through reference to one
//! of that block's predecessors into a direct reference to the new φ,
//! analogous to path compression in a union-find structure.
//!
//! Since [`crate::timeline::TimelineTable::def_id_of`] always walks the
//! live `incoming` chain, compression here is not required for
//! correctness — only for keeping lookups shallow and for matching the
//! forward-traversal shape the spec describes. Traversal is guarded by a
//! visited set so forks and loop back-edges are each crossed once.

use ssagen_entity::EntitySet;
use ssagen_ir::{inspect, Component, Function, Variable};

use crate::timeline::{IncomingJoin, TimelineRef, TimelineTable};

/// Broadcast the φ just installed at `(join_block, variable)` forward
/// through the CFG, compressing stale pass-through references along the
/// way. Stops at any block that already shadows `variable` (a local def or
/// an established φ) or that has not been touched by the resolver yet.
pub fn broadcast(func: &Function, timelines: &mut TimelineTable, variable: Variable, join_block: Component) {
    let mut predecessors: EntitySet<Component> = EntitySet::new();
    for p in inspect::predecessors(func, join_block) {
        predecessors.insert(p);
    }
    let mut visited = EntitySet::new();
    for succ in inspect::successors(func, join_block) {
        visit(func, timelines, variable, succ, join_block, &predecessors, &mut visited);
    }
}

fn visit(
    func: &Function,
    timelines: &mut TimelineTable,
    variable: Variable,
    block: Component,
    join_block: Component,
    join_predecessors: &EntitySet<Component>,
    visited: &mut EntitySet<Component>,
) {
    if !visited.insert(block) {
        return;
    }
    let Some(existing) = timelines.get(block, variable) else {
        return;
    };
    if !existing.local.is_empty() {
        log::trace!("propagation of {:?} stops at block {:?}: shadowed by a local def", variable, block);
        return;
    }
    match existing.incoming.clone() {
        Some(IncomingJoin::PassThrough(r)) if join_predecessors.contains(r.block) => {
            log::trace!("propagation compresses {:?} at block {:?} to the phi at {:?}", variable, block, join_block);
            timelines.set_incoming(
                block,
                variable,
                IncomingJoin::PassThrough(TimelineRef::incoming(join_block, variable)),
            );
            for succ in inspect::successors(func, block) {
                visit(func, timelines, variable, succ, join_block, join_predecessors, visited);
            }
        }
        Some(IncomingJoin::Phi { .. }) | Some(IncomingJoin::Uninitialized) => {
            log::trace!("propagation of {:?} stops at block {:?}: established join or dead end", variable, block);
        }
        Some(IncomingJoin::PassThrough(_)) => {
            // Pass-through from somewhere other than this join: keep
            // walking in case a further-out block still needs compressing.
            for succ in inspect::successors(func, block) {
                visit(func, timelines, variable, succ, join_block, join_predecessors, visited);
            }
        }
        None => {
            // Not yet touched by the resolver; nothing to compress.
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ssagen_ir::TypeTable;

    #[test]
    fn broadcast_on_block_with_no_downstream_state_is_a_no_op() {
        let types = TypeTable::new();
        let mut f = Function::new("f", 0);
        let a = f.new_block();
        let b = f.new_block();
        let seq = f.new_sequence(vec![a, b]);
        f.set_body(seq);
        let v = f.declare_variable("x", types.i64());
        let mut timelines = TimelineTable::new();
        broadcast(&f, &mut timelines, v, a);
        assert!(!timelines.entry_exists(b, v));
    }
}
