//! Flattening (§4.3): splicing nested sequences into their parent in place.
//! An identity transformation on program semantics, run once before
//! resolution so the resolver never has to special-case a sequence nested
//! directly inside another sequence.

use crate::component::{Component, ComponentData};
use crate::Function;

/// Post-order walk of `c`, flattening every sequence it encounters.
pub fn recursive_flatten(f: &mut Function, c: Component) {
    match f.data(c) {
        ComponentData::Block(_) => {}
        ComponentData::Sequence(_) => flatten_sequence(f, c),
        ComponentData::Fork(fork) => {
            let condition = fork.condition;
            let cases = fork.cases.clone();
            recursive_flatten(f, condition);
            for case in cases {
                recursive_flatten(f, case);
            }
        }
        ComponentData::Loop(l) => {
            let (start, condition, body, update) = (l.start, l.condition, l.body, l.update);
            recursive_flatten(f, start);
            recursive_flatten(f, condition);
            recursive_flatten(f, body);
            recursive_flatten(f, update);
        }
        ComponentData::FunctionRoot(r) => {
            let body = r.body;
            recursive_flatten(f, body);
        }
    }
}

/// Splice any directly-nested sequence's children in place, preserving
/// order, after first flattening each child recursively.
fn flatten_sequence(f: &mut Function, seq: Component) {
    let children = match f.data(seq) {
        ComponentData::Sequence(s) => s.children.clone(),
        _ => crate::bug!("flatten_sequence called on a non-sequence component"),
    };

    for &child in &children {
        recursive_flatten(f, child);
    }

    let mut spliced = Vec::with_capacity(children.len());
    for child in children {
        match f.data(child) {
            ComponentData::Sequence(inner) => spliced.extend(inner.children.iter().copied()),
            _ => spliced.push(child),
        }
    }

    f.set_sequence_children(seq, spliced);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TypeTable;

    #[test]
    fn nested_sequence_is_spliced_in_place() {
        let types = TypeTable::new();
        let mut f = Function::new("f", 0);
        let a = f.new_block();
        let b = f.new_block();
        let c = f.new_block();
        let inner = f.new_sequence(vec![b, c]);
        let outer = f.new_sequence(vec![a, inner]);
        f.set_body(outer);

        let root = f.root;
        recursive_flatten(&mut f, root);

        match f.data(outer) {
            ComponentData::Sequence(s) => assert_eq!(s.children, vec![a, b, c]),
            _ => panic!("expected sequence"),
        }
    }

    #[test]
    fn flatten_is_idempotent() {
        let types = TypeTable::new();
        let mut f = Function::new("f", 0);
        let a = f.new_block();
        let b = f.new_block();
        let c = f.new_block();
        let inner = f.new_sequence(vec![b, c]);
        let outer = f.new_sequence(vec![a, inner]);
        f.set_body(outer);

        let root = f.root;
        recursive_flatten(&mut f, root);
        let first = match f.data(outer) {
            ComponentData::Sequence(s) => s.children.clone(),
            _ => panic!("expected sequence"),
        };
        let root = f.root;
        recursive_flatten(&mut f, root);
        let second = match f.data(outer) {
            ComponentData::Sequence(s) => s.children.clone(),
            _ => panic!("expected sequence"),
        };
        assert_eq!(first, second);
    }
}
