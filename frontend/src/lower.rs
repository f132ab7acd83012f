//! Static lowering (C9): a single top-down walk over the fully resolved
//! dynamic IR producing the dense, immutable [`StaticFunction`] (C10).

use ssagen_ir::static_ir::{StaticBlock, StaticDef, StaticFunction, StaticInstruction, StaticOperand, StaticVariable};
use ssagen_ir::{inspect, CompileError, CompileResult, Component, ComponentData, DefId, Function, Instruction, Opcode, Operand, TypeTable, Variable};
use std::collections::HashMap;

/// Lower `func` into its static form. `func` must already be fully
/// resolved: every `Use` operand in every instruction must carry a
/// `Some(def_id)` (guaranteed by `FunctionBuilder::finalize`).
pub fn lower(func: &Function, types: &TypeTable) -> CompileResult<StaticFunction> {
    log::debug!("lowering function {:?}", func.name);
    let block_order = preorder_blocks(func, func.root);

    let block_id_of: HashMap<Component, u32> = block_order
        .iter()
        .enumerate()
        .map(|(i, &c)| (c, i as u32))
        .collect();

    let mut var_order: Vec<Variable> = Vec::new();
    let mut var_id_of: HashMap<Variable, u32> = HashMap::new();
    let mut def_id_remap: HashMap<(Variable, DefId), u32> = HashMap::new();
    let mut def_counts: HashMap<Variable, u32> = HashMap::new();

    let observe_var = |v: Variable, var_order: &mut Vec<Variable>, var_id_of: &mut HashMap<Variable, u32>| {
        *var_id_of.entry(v).or_insert_with(|| {
            let id = var_order.len() as u32;
            var_order.push(v);
            id
        })
    };

    // First pass: assign dense variable ids and densely renumbered def-ids
    // in instruction-visitation order (§4.7 step 3).
    for &block in &block_order {
        for inst in &func.block(block).instructions {
            if let Some((v, d)) = inst.def {
                observe_var(v, &mut var_order, &mut var_id_of);
                def_id_remap.entry((v, d)).or_insert_with(|| {
                    let counter = def_counts.entry(v).or_insert(0);
                    let id = *counter;
                    *counter += 1;
                    id
                });
            }
            for operand in &inst.operands {
                match operand {
                    Operand::Use(u) => {
                        observe_var(u.variable, &mut var_order, &mut var_id_of);
                    }
                    Operand::Uninit(v) => {
                        observe_var(*v, &mut var_order, &mut var_id_of);
                    }
                    Operand::Constant(_) => {}
                }
            }
        }
    }

    let variables: Vec<StaticVariable> = var_order
        .iter()
        .map(|&v| StaticVariable {
            name: func.variable_name(v).to_string(),
            ty: func.variable_type(v),
            num_defs: *def_counts.get(&v).unwrap_or(&0),
        })
        .collect();

    let mut blocks = Vec::with_capacity(block_order.len());
    for (i, &block) in block_order.iter().enumerate() {
        let mut instructions: Vec<StaticInstruction> = func
            .block(block)
            .instructions
            .iter()
            .map(|inst| lower_instruction(inst, &var_id_of, &def_id_remap))
            .collect();

        if !instructions.last().map(|i| i.opcode.is_terminator()).unwrap_or(false) {
            instructions.push(synthesize_terminator(
                func,
                block,
                &block_id_of,
                &var_id_of,
                &def_id_remap,
            )?);
        }

        blocks.push(StaticBlock {
            name: format!("BLOCK{i}"),
            instructions,
        });
    }

    let _ = types;
    log::debug!("lowered function {:?} to {} static blocks, {} variables", func.name, blocks.len(), variables.len());
    Ok(StaticFunction {
        name: func.name.clone(),
        id: func.id,
        variables,
        blocks,
    })
}

fn lower_instruction(
    inst: &Instruction,
    var_id_of: &HashMap<Variable, u32>,
    def_id_remap: &HashMap<(Variable, DefId), u32>,
) -> StaticInstruction {
    let def = inst.def.map(|(v, d)| StaticDef {
        variable_id: var_id_of[&v],
        def_id: def_id_remap[&(v, d)],
    });
    let operands = inst
        .operands
        .iter()
        .map(|op| match op {
            Operand::Constant(c) => StaticOperand::Constant(c.clone()),
            Operand::Use(u) => {
                let d = u
                    .def_id
                    .unwrap_or_else(|| ssagen_ir::bug!("use left unresolved at lowering time"));
                StaticOperand::Use {
                    variable_id: var_id_of[&u.variable],
                    def_id: def_id_remap[&(u.variable, d)],
                }
            }
            Operand::Uninit(v) => StaticOperand::Uninit {
                variable_id: var_id_of[v],
            },
        })
        .collect();
    StaticInstruction {
        opcode: inst.opcode,
        def,
        operands,
        targets: vec![],
    }
}

/// Inject the single terminator a block lacks: an unconditional branch for
/// a fall-through sequence edge, or a conditional branch for a fork
/// condition block. A leaf with zero successors is expected to already
/// carry an explicit `return`; reaching this function for one is malformed
/// input.
fn synthesize_terminator(
    func: &Function,
    block: Component,
    block_id_of: &HashMap<Component, u32>,
    var_id_of: &HashMap<Variable, u32>,
    def_id_remap: &HashMap<(Variable, DefId), u32>,
) -> CompileResult<StaticInstruction> {
    let is_fork_condition = matches!(
        func.role_of(block),
        Some((parent, ssagen_ir::Role::ForkCondition)) if matches!(func.data(parent), ComponentData::Fork(_))
    );

    if is_fork_condition {
        let successors = inspect::successors(func, block);
        let targets: Vec<u32> = successors.iter().map(|s| block_id_of[s]).collect();
        let last_def = func
            .block(block)
            .instructions
            .last()
            .and_then(|i| i.def)
            .ok_or_else(|| {
                CompileError::MalformedInput(format!(
                    "fork condition block {:?} has no resolvable value to branch on",
                    block
                ))
            })?;
        return Ok(StaticInstruction {
            opcode: Opcode::CondBranch,
            def: None,
            operands: vec![StaticOperand::Use {
                variable_id: var_id_of[&last_def.0],
                def_id: def_id_remap[&last_def],
            }],
            targets,
        });
    }

    let successors = inspect::successors(func, block);
    match successors.len() {
        0 => Err(CompileError::MalformedInput(format!(
            "block {:?} has no successors and no terminator",
            block
        ))),
        _ => Ok(StaticInstruction {
            opcode: Opcode::Branch,
            def: None,
            operands: vec![],
            targets: vec![block_id_of[&successors[0]]],
        }),
    }
}

/// Entry-order pre-order traversal of the structured tree, per §4.7 step 2.
fn preorder_blocks(func: &Function, c: Component) -> Vec<Component> {
    let mut out = Vec::new();
    walk(func, c, &mut out);
    out
}

fn walk(func: &Function, c: Component, out: &mut Vec<Component>) {
    match func.data(c) {
        ComponentData::Block(_) => {
            log::trace!("lowering: visiting block {:?} at pre-order position {}", c, out.len());
            out.push(c);
        }
        ComponentData::Sequence(s) => {
            for &child in &s.children {
                walk(func, child, out);
            }
        }
        ComponentData::Fork(f) => {
            walk(func, f.condition, out);
            for &case in &f.cases {
                walk(func, case, out);
            }
        }
        ComponentData::Loop(l) => {
            walk(func, l.start, out);
            walk(func, l.condition, out);
            walk(func, l.body, out);
            walk(func, l.update, out);
        }
        ComponentData::FunctionRoot(r) => walk(func, r.body, out),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ssagen_entity::EntityRef;
    use ssagen_ir::TypeTable;

    #[test]
    fn preorder_visits_fork_condition_before_its_cases() {
        let _types = TypeTable::new();
        let mut f = Function::new("f", 0);
        let cond = f.new_block();
        let case0 = f.new_block();
        let case1 = f.new_block();
        let fork = f.new_fork(cond, vec![case0, case1]);
        f.set_body(fork);
        let order = preorder_blocks(&f, f.root);
        assert_eq!(order, vec![cond, case0, case1]);
    }

    #[test]
    fn static_function_has_one_block_per_dynamic_block() {
        let types = TypeTable::new();
        let mut f = Function::new("f", 0);
        let x = f.declare_variable("x", types.i64());
        let b0 = f.new_block();
        let def_id = f.create_def_id(x).unwrap();
        f.block_mut(b0).instructions.push(
            Instruction::new(
                Opcode::Assign,
                Some((x, def_id)),
                vec![Operand::Constant(ssagen_ir::Constant::I64(1))],
            )
            .unwrap(),
        );
        f.block_mut(b0)
            .instructions
            .push(Instruction::new(Opcode::Return, None, vec![Operand::Use(ssagen_ir::Use { variable: x, def_id: Some(ssagen_ir::DefId::new(0)) })]).unwrap());
        f.set_body(b0);
        let out = lower(&f, &types).unwrap();
        assert_eq!(out.blocks.len(), 1);
        assert_eq!(out.variables.len(), 1);
    }
}
