//! The builder API (§6): the surface an external parser drives to
//! construct a structured function body in post-order, append instructions,
//! and finalise it into a resolved, lowerable function.
//!
//! Modelled on `cranelift_frontend::FunctionBuilder`: a thin façade that
//! owns the in-progress [`Function`] plus the per-function resolution
//! state ([`TimelineTable`]) that does not belong in the IR crate itself.

use ssagen_ir::static_ir::StaticFunction;
use ssagen_ir::{flatten, Component, CompileResult, Constant, Function, Instruction, Opcode, Operand, Type, TypeTable, Use, Variable};
use std::collections::HashSet;

use crate::lower;
use crate::resolve;
use crate::timeline::{TimelineTable, UseSite};

/// One operand position as the caller supplies it: either a literal or a
/// read of a variable's current value.
#[derive(Clone, Copy, Debug)]
pub enum ValueOperand {
    Const(Constant),
    Var(Variable),
}

/// Drives construction of one [`Function`] and carries the resolution
/// state accumulated while doing so. `finalize` flattens, forces
/// resolution of every deferred read, and lowers to the static form.
pub struct FunctionBuilder<'a> {
    func: &'a mut Function,
    types: &'a TypeTable,
    timelines: TimelineTable,
    pending_reads: Vec<(Component, Variable)>,
}

impl<'a> FunctionBuilder<'a> {
    pub fn new(func: &'a mut Function, types: &'a TypeTable) -> Self {
        FunctionBuilder {
            func,
            types,
            timelines: TimelineTable::new(),
            pending_reads: Vec::new(),
        }
    }

    pub fn declare_variable(&mut self, name: impl Into<String>, ty: Type) -> Variable {
        self.func.declare_variable(name, ty)
    }

    pub fn declare_argument(&mut self, name: impl Into<String>, ty: Type) -> Variable {
        self.func.declare_argument(name, ty)
    }

    pub fn create_block(&mut self) -> Component {
        self.func.new_block()
    }

    pub fn create_sequence(&mut self, children: Vec<Component>) -> Component {
        self.func.new_sequence(children)
    }

    pub fn create_fork(&mut self, condition: Component, cases: Vec<Component>) -> Component {
        self.func.new_fork(condition, cases)
    }

    pub fn create_loop(&mut self, start: Component, condition: Component, body: Component, update: Component) -> Component {
        self.func.new_loop(start, condition, body, update)
    }

    pub fn set_body(&mut self, body: Component) {
        self.func.set_body(body);
    }

    /// The type a variable currently carries, widened by every def seen so
    /// far. Callers building an instruction's `result_ty` off an existing
    /// variable declaration (rather than a fresh literal type) read this.
    pub fn variable_type(&self, v: Variable) -> Type {
        self.func.variable_type(v)
    }

    /// Append an instruction to `block`, resolving each `Var` operand to a
    /// local def immediately where one already exists in this block, and
    /// deferring resolution to `finalize` otherwise. `def_variable` must be
    /// `Some` iff `opcode.has_def()`; `result_ty` is required alongside it
    /// and is used to widen the variable's type (§4.2).
    pub fn append_instruction(
        &mut self,
        block: Component,
        opcode: Opcode,
        def_variable: Option<Variable>,
        operands: Vec<ValueOperand>,
        result_ty: Option<Type>,
    ) -> CompileResult<Option<ssagen_ir::DefId>> {
        let instruction_index = self.func.block(block).instructions.len();

        let mut lowered_operands = Vec::with_capacity(operands.len());
        for (operand_index, operand) in operands.into_iter().enumerate() {
            lowered_operands.push(match operand {
                ValueOperand::Const(c) => Operand::Constant(c),
                ValueOperand::Var(v) => {
                    let site = UseSite {
                        block,
                        instruction_index,
                        operand_index,
                    };
                    let already_local = self.timelines.get(block, v).and_then(|t| t.local.last()).copied();
                    self.timelines.record_use(block, v, site);
                    if already_local.is_none() {
                        self.pending_reads.push((block, v));
                    }
                    Operand::Use(Use {
                        variable: v,
                        def_id: already_local,
                    })
                }
            });
        }

        let def = match (def_variable, result_ty) {
            (Some(v), Some(ty)) => {
                let def_id = self.func.create_def_id(v)?;
                let widened = self.types.meet(self.func.variable_type(v), ty);
                if widened == self.types.void() {
                    return Err(ssagen_ir::CompileError::type_meet_failure(
                        self.types,
                        format!("assignment to {:?} in block {:?}", v, block),
                        self.func.variable_type(v),
                        ty,
                    ));
                }
                if widened != self.func.variable_type(v) {
                    log::trace!("widening {:?} from {:?} to {:?} at block {:?}", v, self.func.variable_type(v), widened, block);
                }
                self.func.set_variable_type(v, widened, self.types.void());
                self.timelines.set_def_type(v, def_id, ty);
                Some((v, def_id))
            }
            (None, None) => None,
            _ => {
                return Err(ssagen_ir::CompileError::MalformedInput(format!(
                    "{} has_def disagrees with supplied def_variable",
                    opcode.mnemonic()
                )))
            }
        };

        let inst = Instruction::new(opcode, def, lowered_operands)?;
        self.func.block_mut(block).instructions.push(inst);

        if let Some((v, def_id)) = def {
            self.timelines.append_local_def(block, v, def_id);
        }

        Ok(def.map(|(_, d)| d))
    }

    /// Flatten nested sequences, force resolution of every deferred read,
    /// and lower the result into the static form handed to the code
    /// generator.
    ///
    /// A read originally requested directly (not merely probed as one of
    /// several φ sources) that resolves to the uninitialised sentinel is
    /// fatal here: unlike a φ source, there is no sibling path to fall back
    /// on for the value this particular use needed.
    pub fn finalize(mut self) -> CompileResult<StaticFunction> {
        flatten::recursive_flatten(self.func, self.func.root);

        let mut seen: HashSet<(Component, Variable)> = HashSet::new();
        for (block, variable) in std::mem::take(&mut self.pending_reads) {
            if !seen.insert((block, variable)) {
                continue;
            }
            let resolved = resolve::resolve_incoming(self.func, self.types, &mut self.timelines, variable, block)?;
            if resolved == resolve::ResolvedDef::Uninit {
                return Err(ssagen_ir::CompileError::UnresolvedUse { variable, block });
            }
        }

        lower::lower(self.func, self.types)
    }
}
