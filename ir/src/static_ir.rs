//! The static IR (C10): the immutable, densely-numbered handoff to the
//! external code generator. Built once by the lowering pass (C9) and never
//! mutated afterward.

use crate::constant::Constant;
use crate::opcode::Opcode;
use crate::types::{Type, TypeTable};
use std::fmt;

/// A variable's static identity: first-observation order during lowering,
/// not necessarily the same numbering as the dynamic `Variable` it came
/// from.
#[derive(Debug, Clone)]
pub struct StaticVariable {
    pub name: String,
    pub ty: Type,
    pub num_defs: u32,
}

/// A resolved operand in the static program: a literal, or a reference to
/// a specific definition of a specific static variable.
#[derive(Debug, Clone, PartialEq)]
pub enum StaticOperand {
    Constant(Constant),
    Use { variable_id: u32, def_id: u32 },
    /// A read with no reaching definition on at least one incoming path.
    /// Any runtime observation of this operand traps.
    Uninit { variable_id: u32 },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StaticDef {
    pub variable_id: u32,
    pub def_id: u32,
}

#[derive(Debug, Clone)]
pub struct StaticInstruction {
    pub opcode: Opcode,
    pub def: Option<StaticDef>,
    pub operands: Vec<StaticOperand>,
    /// Block targets for `branch`/`cond_branch`, in `[taken, ...]` order;
    /// empty for every other opcode. Kept separate from `operands` because
    /// a block id is not an SSA value.
    pub targets: Vec<u32>,
}

#[derive(Debug, Clone)]
pub struct StaticBlock {
    pub name: String,
    pub instructions: Vec<StaticInstruction>,
}

/// The complete lowered function: dense, immutable, stable across runs for
/// identical input (testable property 6, idempotence).
#[derive(Debug, Clone)]
pub struct StaticFunction {
    pub name: String,
    pub id: u64,
    pub variables: Vec<StaticVariable>,
    pub blocks: Vec<StaticBlock>,
}

impl StaticFunction {
    /// A deterministic pretty-printer: blocks in id order, one instruction
    /// per line, uses printed as `varname.defid`, constants via their
    /// type's own formatting.
    pub fn pretty(&self, types: &TypeTable) -> String {
        use fmt::Write;
        let mut out = String::new();
        let _ = writeln!(out, "function {}(id={}) {{", self.name, self.id);
        for block in &self.blocks {
            let _ = writeln!(out, "{}:", block.name);
            for inst in &block.instructions {
                let _ = writeln!(out, "  {}", self.format_instruction(inst, types));
            }
        }
        let _ = writeln!(out, "}}");
        out
    }

    fn format_instruction(&self, inst: &StaticInstruction, types: &TypeTable) -> String {
        let mut operands: Vec<String> = inst
            .operands
            .iter()
            .map(|op| self.format_operand(op, types))
            .collect();
        operands.extend(inst.targets.iter().map(|t| format!("BLOCK{t}")));
        match inst.def {
            Some(def) => format!(
                "{}.{} := {} {}",
                self.variables[def.variable_id as usize].name,
                def.def_id,
                inst.opcode.mnemonic(),
                operands.join(", ")
            ),
            None => format!("{} {}", inst.opcode.mnemonic(), operands.join(", ")),
        }
    }

    fn format_operand(&self, op: &StaticOperand, types: &TypeTable) -> String {
        match op {
            StaticOperand::Constant(c) => Self::format_constant(c, types),
            StaticOperand::Use { variable_id, def_id } => {
                format!("{}.{}", self.variables[*variable_id as usize].name, def_id)
            }
            StaticOperand::Uninit { variable_id } => {
                format!("{}.uninit", self.variables[*variable_id as usize].name)
            }
        }
    }

    fn format_constant(c: &Constant, types: &TypeTable) -> String {
        let _ = types;
        match c {
            Constant::Bool(b) => b.to_string(),
            Constant::I64(v) => v.to_string(),
            Constant::U64(v) => v.to_string(),
            Constant::F64(v) => v.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pretty_prints_one_instruction_per_line() {
        let types = TypeTable::new();
        let func = StaticFunction {
            name: "f".to_string(),
            id: 7,
            variables: vec![StaticVariable {
                name: "x".to_string(),
                ty: types.i64(),
                num_defs: 1,
            }],
            blocks: vec![StaticBlock {
                name: "BLOCK0".to_string(),
                instructions: vec![StaticInstruction {
                    opcode: Opcode::Assign,
                    def: Some(StaticDef {
                        variable_id: 0,
                        def_id: 0,
                    }),
                    operands: vec![StaticOperand::Constant(Constant::I64(1))],
                    targets: vec![],
                }],
            }],
        };
        let text = func.pretty(&types);
        assert!(text.contains("x.0 := assign 1"));
        assert!(text.contains("BLOCK0:"));
    }
}
