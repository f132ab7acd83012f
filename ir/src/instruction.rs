//! The instruction model (C3): opcode metadata, an optional definition, and
//! an ordered operand list, where operands are either constants or uses.

use crate::constant::Constant;
use crate::opcode::Opcode;
use crate::variable::{DefId, Variable};

/// A single operand position: either an immediate constant or a use of a
/// variable, initially unresolved (`def_id: None`) and mutated in place by
/// the resolver once a reaching definition is found.
#[derive(Clone, Debug, PartialEq)]
pub enum Operand {
    Constant(Constant),
    Use(Use),
    /// A read whose reaching-definition set includes at least one path with
    /// no definition at all — accepted, not rejected, per the resolver's
    /// partially-uninitialised join handling. Any runtime observation of
    /// this operand traps; that's a code-generator concern, not this
    /// crate's.
    Uninit(Variable),
}

/// A reference to a variable's value at this operand position. `def_id` is
/// `None` until the resolver (C7) determines the reaching definition.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Use {
    pub variable: Variable,
    pub def_id: Option<DefId>,
}

impl Use {
    pub fn unresolved(variable: Variable) -> Self {
        Use {
            variable,
            def_id: None,
        }
    }

    pub fn is_resolved(&self) -> bool {
        self.def_id.is_some()
    }
}

/// One instruction: fixed opcode metadata, the def it produces (if any),
/// and its ordered operand list. A `has_def` instruction's own def is
/// allocated eagerly at construction time, distinct from the lazily
/// resolved `def_id` on each of its `Use` operands.
#[derive(Clone, Debug)]
pub struct Instruction {
    pub opcode: Opcode,
    pub def: Option<(Variable, DefId)>,
    pub operands: Vec<Operand>,
}

impl Instruction {
    /// Build an instruction, enforcing the two structural invariants of
    /// §3: arity must match the opcode's metadata, and `has_def` must
    /// agree with whether `def` was supplied.
    pub fn new(
        opcode: Opcode,
        def: Option<(Variable, DefId)>,
        operands: Vec<Operand>,
    ) -> Result<Self, crate::error::CompileError> {
        if !opcode.accepts_operand_count(operands.len()) {
            return Err(crate::error::CompileError::MalformedInput(format!(
                "{} expects {:?} operands, got {}",
                opcode.mnemonic(),
                opcode.info().arity,
                operands.len()
            )));
        }
        if opcode.has_def() != def.is_some() {
            return Err(crate::error::CompileError::MalformedInput(format!(
                "{} has_def={} but def={:?}",
                opcode.mnemonic(),
                opcode.has_def(),
                def.is_some()
            )));
        }
        Ok(Instruction {
            opcode,
            def,
            operands,
        })
    }

    pub fn is_terminator(&self) -> bool {
        self.opcode.is_terminator()
    }

    /// Every unresolved `Use` operand, in source order, mutable so the
    /// resolver can write the found `def_id` back in place.
    pub fn uses_mut(&mut self) -> impl Iterator<Item = &mut Use> {
        self.operands.iter_mut().filter_map(|op| match op {
            Operand::Use(u) => Some(u),
            Operand::Constant(_) | Operand::Uninit(_) => None,
        })
    }

    pub fn uses(&self) -> impl Iterator<Item = &Use> {
        self.operands.iter().filter_map(|op| match op {
            Operand::Use(u) => Some(u),
            Operand::Constant(_) | Operand::Uninit(_) => None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ssagen_entity::EntityRef;

    #[test]
    fn arity_mismatch_is_malformed_input() {
        let v = Variable::new(0);
        let err = Instruction::new(
            Opcode::Add,
            Some((v, DefId::new(0))),
            vec![Operand::Constant(Constant::I64(1))],
        )
        .unwrap_err();
        assert!(matches!(err, crate::error::CompileError::MalformedInput(_)));
    }

    #[test]
    fn has_def_mismatch_is_malformed_input() {
        let err = Instruction::new(Opcode::Return, None, vec![]).unwrap_err();
        // return has arity-mismatch too (expects 1 operand), which is
        // checked first; exercise the has_def mismatch directly instead.
        assert!(matches!(err, crate::error::CompileError::MalformedInput(_)));

        let v = Variable::new(0);
        let err2 = Instruction::new(
            Opcode::Branch,
            Some((v, DefId::new(0))),
            vec![],
        )
        .unwrap_err();
        assert!(matches!(err2, crate::error::CompileError::MalformedInput(_)));
    }

    #[test]
    fn well_formed_instruction_builds() {
        let v = Variable::new(0);
        let inst = Instruction::new(
            Opcode::Add,
            Some((v, DefId::new(0))),
            vec![
                Operand::Use(Use::unresolved(v)),
                Operand::Constant(Constant::I64(2)),
            ],
        )
        .unwrap();
        assert_eq!(inst.uses().count(), 1);
    }
}
