//! The structured CFG (C4): block, sequence, fork, loop, and the function
//! root, stored in a single arena with parent links as indices rather than
//! owning pointers.
//!
//! Per the redesign notes this collapses the source's visitor-class
//! hierarchy into one tagged variant (`ComponentData`) addressed by a
//! single dense handle (`Component`), and its intrusive parent back-pointer
//! into a `SecondaryMap` from child to parent index. Nothing here is
//! self-referential, so the whole arena is trivially movable.

use crate::instruction::Instruction;
use crate::types::Type;
use crate::variable::Variable;
use ssagen_entity::{entity_impl, PrimaryMap, SecondaryMap};
use std::cell::Cell;

/// A handle into a [`Function`]'s component arena. Stands in for every one
/// of the five structured-node kinds; which kind a given handle names is
/// looked up in the arena, not encoded in the handle itself.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Component(u32);
entity_impl!(Component, "c");

#[derive(Debug, Default)]
pub struct BlockData {
    pub instructions: Vec<Instruction>,
}

/// A non-empty ordered list of subcomponents, with a one-slot cache
/// remembering the last child looked up by identity. Any structural edit
/// invalidates it.
#[derive(Debug)]
pub struct SequenceData {
    pub children: Vec<Component>,
    find_cache: Cell<Option<(Component, usize)>>,
}

impl SequenceData {
    fn new(children: Vec<Component>) -> Self {
        SequenceData {
            children,
            find_cache: Cell::new(None),
        }
    }

    /// Position of `target` among this sequence's direct children, served
    /// from the one-slot cache when it still names `target`.
    pub fn position_of(&self, target: Component) -> Option<usize> {
        if let Some((cached, idx)) = self.find_cache.get() {
            if cached == target {
                return Some(idx);
            }
        }
        let idx = self.children.iter().position(|&c| c == target)?;
        self.find_cache.set(Some((target, idx)));
        Some(idx)
    }

    fn invalidate_cache(&mut self) {
        self.find_cache.set(None);
    }
}

#[derive(Debug)]
pub struct ForkData {
    pub condition: Component,
    pub cases: Vec<Component>,
}

#[derive(Debug)]
pub struct LoopData {
    pub start: Component,
    pub condition: Component,
    pub body: Component,
    pub update: Component,
}

#[derive(Debug)]
pub struct FunctionRootData {
    pub body: Component,
}

/// The closed sum type of structured components (§3, §9's first redesign
/// note): every structural algorithm in this crate is an exhaustive match
/// over this enum instead of a virtual dispatch.
#[derive(Debug)]
pub enum ComponentData {
    Block(BlockData),
    Sequence(SequenceData),
    Fork(ForkData),
    Loop(LoopData),
    FunctionRoot(FunctionRootData),
}

impl ComponentData {
    pub fn as_block(&self) -> Option<&BlockData> {
        match self {
            ComponentData::Block(b) => Some(b),
            _ => None,
        }
    }

    pub fn as_block_mut(&mut self) -> Option<&mut BlockData> {
        match self {
            ComponentData::Block(b) => Some(b),
            _ => None,
        }
    }

    pub fn as_sequence(&self) -> Option<&SequenceData> {
        match self {
            ComponentData::Sequence(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_fork(&self) -> Option<&ForkData> {
        match self {
            ComponentData::Fork(f) => Some(f),
            _ => None,
        }
    }

    pub fn as_loop(&self) -> Option<&LoopData> {
        match self {
            ComponentData::Loop(l) => Some(l),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct VariableData {
    pub name: String,
    pub ty: Type,
    pub next_def_id: u32,
}

/// The identity of a subcomponent within its immediate parent, used by the
/// §4.3 predecessor/successor/leaves/is_leaf formulas to pick the right
/// case of the per-variant table without re-deriving it from raw indices
/// each time.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Role {
    ForkCondition,
    ForkCase(usize),
    LoopStart,
    LoopCondition,
    LoopBody,
    LoopUpdate,
    SequenceElem(usize),
    FunctionBody,
}

/// One compiled function: its variable table, argument list, and the
/// arena of structured components rooted at `root`. Owns everything it
/// refers to; the only thing it borrows is the shared [`crate::types::TypeTable`].
pub struct Function {
    pub name: String,
    pub id: u64,
    pub(crate) variables: PrimaryMap<Variable, VariableData>,
    pub arguments: Vec<Variable>,
    pub(crate) components: PrimaryMap<Component, ComponentData>,
    parents: SecondaryMap<Component, Option<Component>>,
    pub root: Component,
}

impl Function {
    /// Start building a function. The root `FunctionRoot` component is
    /// allocated immediately so every other component can name it as an
    /// eventual ancestor; its `body` field is filled in by [`Function::set_body`].
    pub fn new(name: impl Into<String>, id: u64) -> Self {
        let mut components = PrimaryMap::new();
        // Placeholder body; replaced once the real body is built and
        // attached via `set_body`. The placeholder is an empty block that
        // is never reachable once `set_body` runs.
        let placeholder = components.push(ComponentData::Block(BlockData::default()));
        let root = components.push(ComponentData::FunctionRoot(FunctionRootData {
            body: placeholder,
        }));
        let mut parents = SecondaryMap::new();
        parents[placeholder] = Some(root);

        Function {
            name: name.into(),
            id,
            variables: PrimaryMap::new(),
            arguments: Vec::new(),
            components,
            parents,
            root,
        }
    }

    pub fn declare_variable(&mut self, name: impl Into<String>, ty: Type) -> Variable {
        self.variables.push(VariableData {
            name: name.into(),
            ty,
            next_def_id: 0,
        })
    }

    pub fn declare_argument(&mut self, name: impl Into<String>, ty: Type) -> Variable {
        let v = self.declare_variable(name, ty);
        self.arguments.push(v);
        v
    }

    pub fn variable_name(&self, v: Variable) -> &str {
        &self.variables[v].name
    }

    pub fn variable_type(&self, v: Variable) -> Type {
        self.variables[v].ty
    }

    /// Widen a variable's type; the caller is responsible for computing the
    /// meet and must not pass `void` (§4.2).
    pub fn set_variable_type(&mut self, v: Variable, ty: Type, void: Type) {
        assert!(ty != void, "set_type called with void");
        self.variables[v].ty = ty;
    }

    /// Hand out a fresh `def_id` under `v` and advance its counter.
    pub fn create_def_id(&mut self, v: Variable) -> crate::error::CompileResult<crate::variable::DefId> {
        use ssagen_entity::EntityRef;
        let data = &mut self.variables[v];
        let id = data.next_def_id;
        data.next_def_id = data
            .next_def_id
            .checked_add(1)
            .ok_or_else(|| crate::error::CompileError::CapacityExhaustion(v))?;
        Ok(crate::variable::DefId::new(id as usize))
    }

    pub fn num_defs(&self, v: Variable) -> u32 {
        self.variables[v].next_def_id
    }

    pub fn new_block(&mut self) -> Component {
        self.components.push(ComponentData::Block(BlockData::default()))
    }

    pub fn new_sequence(&mut self, children: Vec<Component>) -> Component {
        assert!(!children.is_empty(), "sequence must be non-empty");
        let id = self
            .components
            .push(ComponentData::Sequence(SequenceData::new(children.clone())));
        for c in children {
            self.parents[c] = Some(id);
        }
        id
    }

    pub fn new_fork(&mut self, condition: Component, cases: Vec<Component>) -> Component {
        assert!(!cases.is_empty(), "fork must have at least one case");
        let id = self.components.push(ComponentData::Fork(ForkData {
            condition,
            cases: cases.clone(),
        }));
        self.parents[condition] = Some(id);
        for c in cases {
            self.parents[c] = Some(id);
        }
        id
    }

    pub fn new_loop(
        &mut self,
        start: Component,
        condition: Component,
        body: Component,
        update: Component,
    ) -> Component {
        let id = self.components.push(ComponentData::Loop(LoopData {
            start,
            condition,
            body,
            update,
        }));
        for c in [start, condition, body, update] {
            self.parents[c] = Some(id);
        }
        id
    }

    /// Attach `body` as this function's single subcomponent, replacing the
    /// placeholder allocated by `new`.
    pub fn set_body(&mut self, body: Component) {
        let root = self.root;
        if let ComponentData::FunctionRoot(r) = &mut self.components[root] {
            r.body = body;
        }
        self.parents[body] = Some(root);
    }

    pub fn body(&self) -> Component {
        match &self.components[self.root] {
            ComponentData::FunctionRoot(r) => r.body,
            _ => crate::bug!("root component is not a FunctionRoot"),
        }
    }

    pub fn data(&self, c: Component) -> &ComponentData {
        &self.components[c]
    }

    pub fn data_mut(&mut self, c: Component) -> &mut ComponentData {
        &mut self.components[c]
    }

    pub fn block(&self, c: Component) -> &BlockData {
        self.components[c]
            .as_block()
            .unwrap_or_else(|| crate::bug!("component {:?} is not a block", c))
    }

    pub fn block_mut(&mut self, c: Component) -> &mut BlockData {
        self.components[c]
            .as_block_mut()
            .unwrap_or_else(|| crate::bug!("component {:?} is not a block", c))
    }

    pub fn parent(&self, c: Component) -> Option<Component> {
        self.parents[c]
    }

    /// This subcomponent's position within its immediate parent, or `None`
    /// if `c` is the function's own root (it has no parent).
    pub fn role_of(&self, c: Component) -> Option<(Component, Role)> {
        let parent = self.parents[c]?;
        let role = match &self.components[parent] {
            ComponentData::Fork(f) => {
                if f.condition == c {
                    Role::ForkCondition
                } else {
                    let idx = f
                        .cases
                        .iter()
                        .position(|&x| x == c)
                        .unwrap_or_else(|| crate::bug!("component not found among fork cases"));
                    Role::ForkCase(idx)
                }
            }
            ComponentData::Loop(l) => {
                if l.start == c {
                    Role::LoopStart
                } else if l.condition == c {
                    Role::LoopCondition
                } else if l.body == c {
                    Role::LoopBody
                } else if l.update == c {
                    Role::LoopUpdate
                } else {
                    crate::bug!("component not found among loop subcomponents")
                }
            }
            ComponentData::Sequence(s) => {
                let idx = s
                    .position_of(c)
                    .unwrap_or_else(|| crate::bug!("component not found in sequence"));
                Role::SequenceElem(idx)
            }
            ComponentData::FunctionRoot(_) => Role::FunctionBody,
            ComponentData::Block(_) => {
                crate::bug!("a block can never be the parent of another component")
            }
        };
        Some((parent, role))
    }

    /// Invalidate a sequence's find-cache after an in-place child edit
    /// (used by `recursive_flatten`, the only mutator of sequence children
    /// after initial construction).
    pub(crate) fn set_sequence_children(&mut self, seq: Component, children: Vec<Component>) {
        for &c in &children {
            self.parents[c] = Some(seq);
        }
        if let ComponentData::Sequence(s) = &mut self.components[seq] {
            s.children = children;
            s.invalidate_cache();
        } else {
            crate::bug!("set_sequence_children called on a non-sequence component");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sequence_position_cache_hits_and_misses() {
        let mut f = Function::new("f", 0);
        let b0 = f.new_block();
        let b1 = f.new_block();
        let seq = f.new_sequence(vec![b0, b1]);
        if let ComponentData::Sequence(s) = f.data(seq) {
            assert_eq!(s.position_of(b1), Some(1));
            assert_eq!(s.position_of(b1), Some(1));
            assert_eq!(s.position_of(b0), Some(0));
        } else {
            panic!("expected sequence");
        }
    }

    #[test]
    fn role_of_identifies_fork_case() {
        let mut f = Function::new("f", 0);
        let cond = f.new_block();
        let case0 = f.new_block();
        let case1 = f.new_block();
        let fork = f.new_fork(cond, vec![case0, case1]);
        f.set_body(fork);
        assert_eq!(f.role_of(cond), Some((fork, Role::ForkCondition)));
        assert_eq!(f.role_of(case1), Some((fork, Role::ForkCase(1))));
    }

    #[test]
    fn root_has_no_role() {
        let f = Function::new("f", 0);
        assert_eq!(f.role_of(f.root), None);
    }
}
