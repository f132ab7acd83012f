//! Structural inspectors (C5): entry, predecessors, successors, leaves,
//! is_leaf, each an exhaustive dispatch over a component's role within its
//! parent, following the per-variant tables of §4.3.

use crate::component::{Component, ComponentData, Role};
use crate::Function;

/// The first block reached on structured entry into `c`.
pub fn entry(f: &Function, c: Component) -> Component {
    match f.data(c) {
        ComponentData::Block(_) => c,
        ComponentData::Sequence(s) => entry(f, s.children[0]),
        ComponentData::Fork(fork) => entry(f, fork.condition),
        ComponentData::Loop(l) => entry(f, l.start),
        ComponentData::FunctionRoot(r) => entry(f, r.body),
    }
}

/// Every leaf block reachable by exiting `c` structurally.
pub fn leaves(f: &Function, c: Component) -> Vec<Component> {
    match f.data(c) {
        ComponentData::Block(_) => vec![c],
        ComponentData::Sequence(s) => {
            let last = *s.children.last().unwrap_or_else(|| crate::bug!("empty sequence"));
            leaves(f, last)
        }
        ComponentData::Fork(fork) => fork.cases.iter().flat_map(|&case| leaves(f, case)).collect(),
        ComponentData::Loop(l) => leaves(f, l.condition),
        ComponentData::FunctionRoot(r) => leaves(f, r.body),
    }
}

/// Whether `sub` is the last-reached position within its immediate parent.
pub fn is_leaf(f: &Function, sub: Component) -> bool {
    match f.role_of(sub) {
        None => false,
        Some((_, Role::ForkCondition)) => false,
        Some((_, Role::ForkCase(_))) => true,
        Some((_, Role::LoopStart)) => false,
        Some((_, Role::LoopCondition)) => true,
        Some((_, Role::LoopBody)) => false,
        Some((_, Role::LoopUpdate)) => false,
        Some((parent, Role::SequenceElem(idx))) => {
            let s = f
                .data(parent)
                .as_sequence()
                .unwrap_or_else(|| crate::bug!("role says Sequence but data disagrees"));
            idx + 1 == s.children.len()
        }
        Some((_, Role::FunctionBody)) => false,
    }
}

/// The predecessor blocks feeding `sub`, per the §4.3 table. Dispatches on
/// `sub`'s role within its immediate parent and recurses outward along the
/// parent chain as needed; bottoms out at the function root with no
/// predecessors.
pub fn predecessors(f: &Function, sub: Component) -> Vec<Component> {
    match f.role_of(sub) {
        None => vec![],
        Some((parent, role)) => match role {
            Role::ForkCondition => predecessors(f, parent),
            Role::ForkCase(_) => {
                let fork = f
                    .data(parent)
                    .as_fork()
                    .unwrap_or_else(|| crate::bug!("role says Fork but data disagrees"));
                leaves(f, fork.condition)
            }
            Role::LoopStart => predecessors(f, parent),
            Role::LoopCondition => {
                let l = f
                    .data(parent)
                    .as_loop()
                    .unwrap_or_else(|| crate::bug!("role says Loop but data disagrees"));
                let mut preds = leaves(f, l.start);
                preds.extend(leaves(f, l.update));
                preds
            }
            Role::LoopBody => {
                let l = f
                    .data(parent)
                    .as_loop()
                    .unwrap_or_else(|| crate::bug!("role says Loop but data disagrees"));
                leaves(f, l.condition)
            }
            Role::LoopUpdate => {
                let l = f
                    .data(parent)
                    .as_loop()
                    .unwrap_or_else(|| crate::bug!("role says Loop but data disagrees"));
                leaves(f, l.body)
            }
            Role::SequenceElem(0) => predecessors(f, parent),
            Role::SequenceElem(idx) => {
                let s = f
                    .data(parent)
                    .as_sequence()
                    .unwrap_or_else(|| crate::bug!("role says Sequence but data disagrees"));
                leaves(f, s.children[idx - 1])
            }
            Role::FunctionBody => vec![],
        },
    }
}

/// The successor blocks reached when leaving `sub`, per the §4.3 table;
/// dual to [`predecessors`].
pub fn successors(f: &Function, sub: Component) -> Vec<Component> {
    match f.role_of(sub) {
        None => vec![],
        Some((parent, role)) => match role {
            Role::ForkCondition => {
                let fork = f
                    .data(parent)
                    .as_fork()
                    .unwrap_or_else(|| crate::bug!("role says Fork but data disagrees"));
                fork.cases.iter().map(|&case| entry(f, case)).collect()
            }
            Role::ForkCase(_) => successors(f, parent),
            Role::LoopStart => {
                let l = f
                    .data(parent)
                    .as_loop()
                    .unwrap_or_else(|| crate::bug!("role says Loop but data disagrees"));
                vec![entry(f, l.condition)]
            }
            Role::LoopCondition => {
                let l = f
                    .data(parent)
                    .as_loop()
                    .unwrap_or_else(|| crate::bug!("role says Loop but data disagrees"));
                let mut succs = vec![entry(f, l.body)];
                succs.extend(successors(f, parent));
                succs
            }
            Role::LoopBody => {
                let l = f
                    .data(parent)
                    .as_loop()
                    .unwrap_or_else(|| crate::bug!("role says Loop but data disagrees"));
                vec![entry(f, l.update)]
            }
            Role::LoopUpdate => {
                let l = f
                    .data(parent)
                    .as_loop()
                    .unwrap_or_else(|| crate::bug!("role says Loop but data disagrees"));
                vec![entry(f, l.condition)]
            }
            Role::SequenceElem(idx) => {
                let s = f
                    .data(parent)
                    .as_sequence()
                    .unwrap_or_else(|| crate::bug!("role says Sequence but data disagrees"));
                if idx + 1 == s.children.len() {
                    successors(f, parent)
                } else {
                    vec![entry(f, s.children[idx + 1])]
                }
            }
            Role::FunctionBody => vec![],
        },
    }
}

/// Count of reachable block components under `c`, used for sizing lowering
/// buffers and for the §6 pretty-printer's "no unreachable blocks" sanity.
pub fn block_count(f: &Function, c: Component) -> usize {
    match f.data(c) {
        ComponentData::Block(_) => 1,
        ComponentData::Sequence(s) => s.children.iter().map(|&ch| block_count(f, ch)).sum(),
        ComponentData::Fork(fork) => {
            block_count(f, fork.condition) + fork.cases.iter().map(|&ch| block_count(f, ch)).sum::<usize>()
        }
        ComponentData::Loop(l) => {
            block_count(f, l.start) + block_count(f, l.condition) + block_count(f, l.body) + block_count(f, l.update)
        }
        ComponentData::FunctionRoot(r) => block_count(f, r.body),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TypeTable;

    #[test]
    fn if_join_predecessors_and_successors_are_dual() {
        let types = TypeTable::new();
        let mut f = Function::new("f", 0);
        let pre = f.new_block();
        let cond = f.new_block();
        let case0 = f.new_block();
        let case1 = f.new_block();
        let post = f.new_block();
        let fork = f.new_fork(cond, vec![case0, case1]);
        let seq = f.new_sequence(vec![pre, fork, post]);
        f.set_body(seq);

        assert_eq!(predecessors(&f, cond), vec![pre]);
        assert_eq!(successors(&f, pre), vec![cond]);

        assert_eq!(predecessors(&f, case0), vec![cond]);
        assert_eq!(predecessors(&f, case1), vec![cond]);

        let succ_of_case0 = successors(&f, case0);
        assert_eq!(succ_of_case0, vec![post]);

        let preds_of_post = predecessors(&f, post);
        assert_eq!(preds_of_post, vec![case0, case1]);
    }

    #[test]
    fn loop_condition_joins_start_and_update() {
        let types = TypeTable::new();
        let mut f = Function::new("f", 0);
        let start = f.new_block();
        let condition = f.new_block();
        let body = f.new_block();
        let update = f.new_block();
        let lp = f.new_loop(start, condition, body, update);
        f.set_body(lp);

        assert_eq!(predecessors(&f, condition), vec![start, update]);
        assert_eq!(successors(&f, update), vec![condition]);
        assert_eq!(successors(&f, body), vec![update]);
    }

    #[test]
    fn is_leaf_matches_fork_and_loop_rules() {
        let types = TypeTable::new();
        let mut f = Function::new("f", 0);
        let cond = f.new_block();
        let case0 = f.new_block();
        let fork = f.new_fork(cond, vec![case0]);
        f.set_body(fork);
        assert!(!is_leaf(&f, cond));
        assert!(is_leaf(&f, case0));
    }

    #[test]
    fn block_count_sums_over_structure() {
        let types = TypeTable::new();
        let mut f = Function::new("f", 0);
        let cond = f.new_block();
        let c0 = f.new_block();
        let c1 = f.new_block();
        let fork = f.new_fork(cond, vec![c0, c1]);
        f.set_body(fork);
        assert_eq!(block_count(&f, f.root), 3);
    }
}
