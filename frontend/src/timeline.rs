//! Def-timelines (C6): per-`(block, variable)` records of incoming and
//! locally generated definitions.
//!
//! Grounded on the spec's §4.4 contract. A block's *outgoing* timeline for
//! a variable is its last local definition if it has any, otherwise its
//! `incoming` join (set only by the resolver, never at parse time —
//! invariant 2).

use smallvec::SmallVec;
use ssagen_ir::{Component, DefId, Variable};
use std::collections::HashMap;

/// Most joins in practice have two or three predecessors (an if/else arm,
/// a loop's start+update); four inline slots covers that without spilling.
pub type PhiSources = SmallVec<[(Component, TimelineRef); 4]>;

/// Points at one specific timeline: either a concrete local definition
/// inside `block`, or `block`'s own incoming join.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Hash)]
pub struct TimelineRef {
    pub block: Component,
    pub variable: Variable,
    pub local_index: Option<usize>,
}

impl TimelineRef {
    pub fn incoming(block: Component, variable: Variable) -> Self {
        TimelineRef {
            block,
            variable,
            local_index: None,
        }
    }

    pub fn local(block: Component, variable: Variable, index: usize) -> Self {
        TimelineRef {
            block,
            variable,
            local_index: Some(index),
        }
    }
}

/// Where a block's `incoming` slot resolved to, once the resolver has run.
/// Absent (`None`) at parse time on every block, per invariant 2.
#[derive(Clone, Debug)]
pub enum IncomingJoin {
    /// Exactly one outgoing timeline reaches this block; no φ needed, the
    /// reference simply threads through.
    PassThrough(TimelineRef),
    /// Two or more distinct outgoing timelines reach this block: a φ was
    /// materialised here. `sources` is in stable predecessor order.
    Phi {
        def_id: DefId,
        sources: PhiSources,
    },
    /// No definition reaches this block on any path; reads observe the
    /// uninitialised sentinel.
    Uninitialized,
}

/// One program-point use awaiting def-id resolution, identified by its
/// position in the dynamic IR so the resolver can write back into the
/// owning instruction's operand list.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct UseSite {
    pub block: Component,
    pub instruction_index: usize,
    pub operand_index: usize,
}

/// The per-`(block, variable)` record described in §4.4.
#[derive(Clone, Debug, Default)]
pub struct DefTimeline {
    pub incoming: Option<IncomingJoin>,
    /// This block's local definitions of `variable`, in program order.
    pub local: Vec<DefId>,
    /// Uses recorded before any local def existed and before `incoming`
    /// was populated by the resolver; reattached once resolution runs.
    incoming_uses: Option<Vec<UseSite>>,
}

impl DefTimeline {
    pub fn has_outgoing_timeline(&self) -> bool {
        self.incoming.is_some() || !self.local.is_empty()
    }

    /// The def-id a use at the end of this block would observe, if it is
    /// already known without consulting the resolver (a local def, or an
    /// already-resolved φ/pass-through).
    pub fn outgoing_def_id(&self) -> Option<DefId> {
        if let Some(&last) = self.local.last() {
            return Some(last);
        }
        match &self.incoming {
            Some(IncomingJoin::Phi { def_id, .. }) => Some(*def_id),
            _ => None,
        }
    }
}

/// Every `(block, variable)` timeline materialised so far for one
/// function, plus a side table of the type each individual definition
/// produced (needed by the resolver's φ meet, since `Function` only tracks
/// a variable's current widened type, not each def's own contribution).
#[derive(Default)]
pub struct TimelineTable {
    timelines: HashMap<(Component, Variable), DefTimeline>,
    def_types: HashMap<(Variable, DefId), ssagen_ir::Type>,
}

impl TimelineTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, block: Component, variable: Variable) -> Option<&DefTimeline> {
        self.timelines.get(&(block, variable))
    }

    pub fn get_mut(&mut self, block: Component, variable: Variable) -> &mut DefTimeline {
        self.timelines.entry((block, variable)).or_default()
    }

    pub fn entry_exists(&self, block: Component, variable: Variable) -> bool {
        self.timelines.contains_key(&(block, variable))
    }

    /// Append a new local definition `def_id` to `(block, variable)`'s
    /// timeline, making it the new outgoing timeline for that slot.
    pub fn append_local_def(&mut self, block: Component, variable: Variable, def_id: DefId) -> usize {
        let t = self.get_mut(block, variable);
        t.local.push(def_id);
        t.local.len() - 1
    }

    /// Record that `site` observes whatever is currently the outgoing
    /// timeline of `(block, variable)` — the nearest preceding local def,
    /// or the (possibly still unresolved) incoming join. A use that already
    /// has a local def to observe resolves its `def_id` immediately at
    /// append time (see `FunctionBuilder::append_instruction`), so only a
    /// use with no local def yet needs tracking here, against `incoming`.
    pub fn record_use(&mut self, block: Component, variable: Variable, site: UseSite) {
        let t = self.get_mut(block, variable);
        if t.local.is_empty() {
            t.pending_incoming_uses().push(site);
        }
    }

    /// Resolve the def-id a use at `site` (appended against `block`'s
    /// timeline for `variable`, before any local def existed) now observes,
    /// after the resolver has populated `incoming`.
    pub fn def_id_of(&self, timeline_ref: TimelineRef) -> Option<DefId> {
        match timeline_ref.local_index {
            Some(i) => self
                .get(timeline_ref.block, timeline_ref.variable)
                .and_then(|t| t.local.get(i))
                .copied(),
            None => self
                .get(timeline_ref.block, timeline_ref.variable)
                .and_then(|t| match &t.incoming {
                    Some(IncomingJoin::Phi { def_id, .. }) => Some(*def_id),
                    Some(IncomingJoin::PassThrough(r)) => self.def_id_of(*r),
                    _ => None,
                }),
        }
    }

    pub fn set_incoming(&mut self, block: Component, variable: Variable, join: IncomingJoin) {
        self.get_mut(block, variable).incoming = Some(join);
    }

    /// Every recorded pending use awaiting an `incoming` resolution at
    /// `(block, variable)`, drained so the resolver can reattach them to
    /// whichever timeline `incoming` resolves to.
    pub fn take_pending_incoming_uses(&mut self, block: Component, variable: Variable) -> Vec<UseSite> {
        std::mem::take(self.get_mut(block, variable).pending_incoming_uses())
    }

    pub fn set_def_type(&mut self, variable: Variable, def_id: DefId, ty: ssagen_ir::Type) {
        self.def_types.insert((variable, def_id), ty);
    }

    pub fn def_type(&self, variable: Variable, def_id: DefId) -> Option<ssagen_ir::Type> {
        self.def_types.get(&(variable, def_id)).copied()
    }
}

impl DefTimeline {
    fn pending_incoming_uses(&mut self) -> &mut Vec<UseSite> {
        // A block's incoming timeline's own use list: stored as the
        // zeroth conceptual slot. We model it inline here rather than via
        // a separate field so `DefTimeline` stays small in the common case
        // (a block with only local defs never touches this).
        // SAFETY/INVARIANT: accessed only before `incoming` is populated.
        if self.incoming_uses.is_none() {
            self.incoming_uses = Some(Vec::new());
        }
        self.incoming_uses.as_mut().unwrap()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ssagen_entity::EntityRef;

    #[test]
    fn appending_local_def_becomes_outgoing() {
        let mut table = TimelineTable::new();
        let block = Component::new(0);
        let v = Variable::new(0);
        table.append_local_def(block, v, DefId::new(0));
        table.append_local_def(block, v, DefId::new(1));
        assert_eq!(table.get(block, v).unwrap().outgoing_def_id(), Some(DefId::new(1)));
    }

    #[test]
    fn use_before_any_local_def_is_pending() {
        let mut table = TimelineTable::new();
        let block = Component::new(0);
        let v = Variable::new(0);
        table.record_use(
            block,
            v,
            UseSite {
                block,
                instruction_index: 0,
                operand_index: 0,
            },
        );
        assert_eq!(table.take_pending_incoming_uses(block, v).len(), 1);
    }
}
