//! The def-resolution engine (C7): for a first read of a variable inside a
//! block, find the set of reaching definitions across predecessors,
//! materialising a φ at the join when there is more than one predecessor,
//! and memoising the result on the block's timeline.
//!
//! This is a pull-based rendering of the spec's descending/ascending
//! two-phase builder: instead of building an explicit resolution stack and
//! then popping frames, [`resolve_incoming`] recurses directly on
//! predecessors and breaks loop back-edge cycles the way Braun et al.'s
//! SSA construction does — by reserving the join's def-id *before*
//! recursing into predecessors, so a cyclic revisit of the same block
//! observes the reservation and returns immediately instead of recursing
//! forever. The "resolution stack" and its frames are implicit in the
//! native call stack; "resolvable" is `timelines.get(block, v).incoming.is_some()`.

use smallvec::SmallVec;
use ssagen_ir::{inspect, CompileError, CompileResult, Component, DefId, Function, Instruction, Opcode, Operand, Type, TypeTable, Use, Variable};

use crate::propagate;
use crate::timeline::{IncomingJoin, TimelineRef, TimelineTable};

/// What a reaching-definition search for one path ended in: a concrete
/// definition, or the uninitialised sentinel (no definition on that path at
/// all). A fully uninitialised use (every path uninitialised) is rejected
/// as `UnresolvedUse`; a *partially* uninitialised join is accepted, with
/// the uninitialised paths contributing a sentinel φ operand instead of
/// failing the whole resolution.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ResolvedDef {
    Def(DefId),
    Uninit,
}

/// Resolve the value `variable` carries on entry to `block` (i.e. ignoring
/// any local definition inside `block` itself), creating a φ if more than
/// one predecessor contributes a distinct timeline. Idempotent: a second
/// call against an already-resolved block returns the memoised result.
pub fn resolve_incoming(
    func: &mut Function,
    types: &TypeTable,
    timelines: &mut TimelineTable,
    variable: Variable,
    block: Component,
) -> CompileResult<ResolvedDef> {
    if let Some(t) = timelines.get(block, variable) {
        match t.incoming.clone() {
            Some(IncomingJoin::Phi { def_id, .. }) => return Ok(ResolvedDef::Def(def_id)),
            Some(IncomingJoin::PassThrough(r)) => return resolve_ref(func, types, timelines, variable, r),
            Some(IncomingJoin::Uninitialized) => return Ok(ResolvedDef::Uninit),
            None => {}
        }
    }

    log::trace!("resolving incoming def of {:?} at block {:?}", variable, block);
    let preds = inspect::predecessors(func, block);
    if preds.is_empty() {
        log::trace!("{:?} at block {:?} has no predecessors: uninitialised", variable, block);
        timelines.set_incoming(block, variable, IncomingJoin::Uninitialized);
        reattach_pending(func, timelines, block, variable, ResolvedDef::Uninit);
        return Ok(ResolvedDef::Uninit);
    }

    if preds.len() == 1 {
        let pred = preds[0];
        let r = outgoing_ref(timelines, variable, pred);
        let resolved = resolve_ref(func, types, timelines, variable, r)?;
        timelines.set_incoming(block, variable, IncomingJoin::PassThrough(r));
        reattach_pending(func, timelines, block, variable, resolved);
        return Ok(resolved);
    }

    // Multiple predecessors: reserve the φ's def-id before recursing so a
    // loop back-edge that revisits `block` sees the reservation rather
    // than looping forever.
    let def_id = func.create_def_id(variable)?;
    timelines.set_incoming(
        block,
        variable,
        IncomingJoin::Phi {
            def_id,
            sources: SmallVec::new(),
        },
    );

    let mut sources: SmallVec<[(Component, TimelineRef, ResolvedDef); 4]> = SmallVec::with_capacity(preds.len());
    let mut meet_ty: Option<Type> = None;
    let mut any_defined = false;
    for pred in preds {
        let r = outgoing_ref(timelines, variable, pred);
        let resolved = resolve_ref(func, types, timelines, variable, r)?;
        if let ResolvedDef::Def(pred_def_id) = resolved {
            any_defined = true;
            let pred_ty = timelines
                .def_type(variable, pred_def_id)
                .unwrap_or_else(|| func.variable_type(variable));
            meet_ty = Some(match meet_ty {
                None => pred_ty,
                Some(acc) => types.meet(acc, pred_ty),
            });
        }
        sources.push((pred, r, resolved));
    }

    if !any_defined {
        // Every predecessor is itself uninitialised: no path reaches a
        // definition, so there is nothing for a φ to select between. The
        // reserved def-id above goes unused; that's harmless, since it
        // never appears on any instruction and lowering only renumbers ids
        // it actually observes.
        timelines.set_incoming(block, variable, IncomingJoin::Uninitialized);
        reattach_pending(func, timelines, block, variable, ResolvedDef::Uninit);
        return Ok(ResolvedDef::Uninit);
    }

    let meet_ty = meet_ty.unwrap_or_else(|| ssagen_ir::bug!("meet computed with no defined predecessor"));
    if meet_ty == types.void() {
        return Err(CompileError::type_meet_failure(
            types,
            format!("phi for {:?} at block {:?}", variable, block),
            func.variable_type(variable),
            meet_ty,
        ));
    }
    let widened = types.meet(func.variable_type(variable), meet_ty);
    if widened == types.void() {
        return Err(CompileError::type_meet_failure(
            types,
            format!("phi for {:?} at block {:?}", variable, block),
            func.variable_type(variable),
            meet_ty,
        ));
    }
    log::trace!(
        "widening {:?} from {:?} to {:?} at phi for block {:?}",
        variable,
        func.variable_type(variable),
        widened,
        block
    );
    func.set_variable_type(variable, widened, types.void());
    timelines.set_def_type(variable, def_id, meet_ty);
    timelines.set_incoming(
        block,
        variable,
        IncomingJoin::Phi {
            def_id,
            sources: sources.iter().map(|(p, r, _)| (*p, *r)).collect(),
        },
    );

    // `reattach_pending` must run before `insert_phi`: it indexes into
    // `block`'s instructions by the `instruction_index` each use was
    // recorded under at append time, and `insert_phi` shifts every
    // existing instruction in `block` one slot to the right by inserting
    // the new φ at index 0.
    log::debug!("inserting phi for {:?} at block {:?} with {} source(s)", variable, block, sources.len());
    reattach_pending(func, timelines, block, variable, ResolvedDef::Def(def_id));
    insert_phi(func, block, variable, def_id, &sources)?;
    propagate::broadcast(func, timelines, variable, block);

    Ok(ResolvedDef::Def(def_id))
}

/// The `TimelineRef` a block currently exposes as its outgoing value for
/// `variable`: its last local def if it has one, otherwise its own
/// (possibly still unresolved) incoming slot.
fn outgoing_ref(timelines: &TimelineTable, variable: Variable, block: Component) -> TimelineRef {
    if let Some(t) = timelines.get(block, variable) {
        if !t.local.is_empty() {
            return TimelineRef::local(block, variable, t.local.len() - 1);
        }
    }
    TimelineRef::incoming(block, variable)
}

fn resolve_ref(
    func: &mut Function,
    types: &TypeTable,
    timelines: &mut TimelineTable,
    variable: Variable,
    r: TimelineRef,
) -> CompileResult<ResolvedDef> {
    match r.local_index {
        Some(i) => Ok(ResolvedDef::Def(
            *timelines
                .get(r.block, variable)
                .and_then(|t| t.local.get(i))
                .unwrap_or_else(|| ssagen_ir::bug!("dangling local timeline reference")),
        )),
        None => resolve_incoming(func, types, timelines, variable, r.block),
    }
}

/// Insert a `phi` instruction at the head of `block`, one operand per
/// predecessor in the stable order `sources` was built in (testable
/// property 4). A source that resolved to the uninitialised sentinel
/// contributes an `Uninit` operand rather than a `Use`.
fn insert_phi(
    func: &mut Function,
    block: Component,
    variable: Variable,
    def_id: DefId,
    sources: &[(Component, TimelineRef, ResolvedDef)],
) -> CompileResult<()> {
    let operands = sources
        .iter()
        .map(|(_, _, resolved)| match resolved {
            ResolvedDef::Def(d) => Operand::Use(Use {
                variable,
                def_id: Some(*d),
            }),
            ResolvedDef::Uninit => Operand::Uninit(variable),
        })
        .collect();
    let inst = Instruction::new(Opcode::Phi, Some((variable, def_id)), operands)?;
    func.block_mut(block).instructions.insert(0, inst);
    Ok(())
}

/// Every use recorded against `(block, variable)` before `incoming` had a
/// value — drained and rewritten in place to a fully resolved operand now
/// that `resolved` names what they should observe.
fn reattach_pending(
    func: &mut Function,
    timelines: &mut TimelineTable,
    block: Component,
    variable: Variable,
    resolved: ResolvedDef,
) {
    let pending = timelines.take_pending_incoming_uses(block, variable);
    if pending.is_empty() {
        return;
    }
    for site in pending {
        let inst = &mut func.block_mut(site.block).instructions[site.instruction_index];
        inst.operands[site.operand_index] = match resolved {
            ResolvedDef::Def(d) => Operand::Use(Use {
                variable,
                def_id: Some(d),
            }),
            ResolvedDef::Uninit => Operand::Uninit(variable),
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::{FunctionBuilder, ValueOperand};
    use ssagen_ir::{Constant, TypeTable};

    #[test]
    fn single_predecessor_is_pass_through_with_no_phi() {
        let types = TypeTable::new();
        let mut func = Function::new("f", 0);
        let mut b = FunctionBuilder::new(&mut func, &types);
        let x = b.declare_variable("x", types.i64());
        let b0 = b.create_block();
        b.append_instruction(b0, Opcode::Assign, Some(x), vec![ValueOperand::Const(Constant::I64(1))], Some(types.i64()))
            .unwrap();
        let b1 = b.create_block();
        b.append_instruction(b1, Opcode::Return, None, vec![ValueOperand::Var(x)], None).unwrap();
        let seq = b.create_sequence(vec![b0, b1]);
        b.set_body(seq);
        let out = b.finalize().unwrap();
        assert!(!out.pretty(&types).contains("phi"));
    }

    #[test]
    fn if_join_materialises_a_phi() {
        let types = TypeTable::new();
        let mut func = Function::new("f", 0);
        let mut b = FunctionBuilder::new(&mut func, &types);
        let x = b.declare_variable("x", types.i64());
        let cond = b.create_block();
        let c = b.declare_variable("c", types.bool_());
        b.append_instruction(cond, Opcode::Assign, Some(c), vec![ValueOperand::Const(Constant::Bool(true))], Some(types.bool_()))
            .unwrap();
        let then_blk = b.create_block();
        b.append_instruction(then_blk, Opcode::Assign, Some(x), vec![ValueOperand::Const(Constant::I64(1))], Some(types.i64()))
            .unwrap();
        let else_blk = b.create_block();
        b.append_instruction(else_blk, Opcode::Assign, Some(x), vec![ValueOperand::Const(Constant::I64(2))], Some(types.i64()))
            .unwrap();
        let fork = b.create_fork(cond, vec![then_blk, else_blk]);
        let join = b.create_block();
        b.append_instruction(join, Opcode::Return, None, vec![ValueOperand::Var(x)], None).unwrap();
        let seq = b.create_sequence(vec![fork, join]);
        b.set_body(seq);
        let out = b.finalize().unwrap();
        assert!(out.pretty(&types).contains("phi"));
    }

    #[test]
    fn partially_uninitialised_join_is_accepted_with_sentinel() {
        let types = TypeTable::new();
        let mut func = Function::new("f", 0);
        let mut b = FunctionBuilder::new(&mut func, &types);
        let x = b.declare_variable("x", types.i64());
        let cond = b.create_block();
        let c = b.declare_variable("c", types.bool_());
        b.append_instruction(cond, Opcode::Assign, Some(c), vec![ValueOperand::Const(Constant::Bool(true))], Some(types.bool_()))
            .unwrap();
        let then_blk = b.create_block();
        b.append_instruction(then_blk, Opcode::Assign, Some(x), vec![ValueOperand::Const(Constant::I64(1))], Some(types.i64()))
            .unwrap();
        // else_blk never defines x at all.
        let else_blk = b.create_block();
        let fork = b.create_fork(cond, vec![then_blk, else_blk]);
        let join = b.create_block();
        b.append_instruction(join, Opcode::Return, None, vec![ValueOperand::Var(x)], None).unwrap();
        let seq = b.create_sequence(vec![fork, join]);
        b.set_body(seq);
        let out = b.finalize().unwrap();
        let text = out.pretty(&types);
        assert!(text.contains("phi"));
        assert!(text.contains("uninit"));
    }

    #[test]
    fn use_with_no_reaching_definition_is_rejected() {
        let types = TypeTable::new();
        let mut func = Function::new("f", 0);
        let mut b = FunctionBuilder::new(&mut func, &types);
        let x = b.declare_variable("x", types.i64());
        let b0 = b.create_block();
        b.append_instruction(b0, Opcode::Return, None, vec![ValueOperand::Var(x)], None).unwrap();
        b.set_body(b0);
        let err = b.finalize().unwrap_err();
        assert!(matches!(err, CompileError::UnresolvedUse { .. }));
    }
}
