//! Dead-code elimination over functions, global variables, and
//! types/constants.
//!
//! The three passes feed each other (a dead function frees the globals it
//! used, a dead variable frees its pointer type), so they repeat until a
//! round removes nothing.

use crate::ids::{
    all_instructions, attachment_targets, function_id, function_instructions, id_at,
    is_spec_constant, live_uses, opcode, operand_id, use_counts,
};
use crate::options::RemapOptions;
use rspirv::dr::{Instruction, Module, Operand};
use rspirv::spirv::{Decoration, Op, Word};
use std::collections::{BTreeMap, BTreeSet};

/// Counts produced by the dead-code passes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct DceStats {
    pub functions: usize,
    pub variables: usize,
    pub types: usize,
}

pub(crate) fn eliminate_dead_code(module: &mut Module, options: &RemapOptions) -> DceStats {
    let mut stats = DceStats::default();
    loop {
        let mut removed = 0;
        if options.dce_funcs {
            let count = remove_dead_functions(module);
            stats.functions += count;
            removed += count;
        }
        if options.dce_vars {
            let count = remove_dead_variables(module);
            stats.variables += count;
            removed += count;
        }
        if options.dce_types {
            let count = remove_dead_types(module);
            stats.types += count;
            removed += count;
        }
        if removed == 0 {
            break;
        }
    }
    stats
}

fn remove_dead_functions(module: &mut Module) -> usize {
    let bodies: BTreeMap<Word, usize> = module
        .functions
        .iter()
        .enumerate()
        .filter_map(|(index, function)| function_id(function).map(|id| (id, index)))
        .collect();

    let mut worklist: Vec<Word> = module
        .entry_points
        .iter()
        .filter_map(|inst| id_at(inst, 1))
        .chain(
            module
                .annotations
                .iter()
                .filter(|inst| is_linkage_decoration(inst))
                .filter_map(|inst| id_at(inst, 0)),
        )
        .chain(
            module
                .types_global_values
                .iter()
                .flat_map(live_uses)
                .filter(|id| bodies.contains_key(id)),
        )
        .collect();

    if worklist.is_empty() {
        tracing::warn!("module has no entry points or linkage exports, keeping all functions");
        return 0;
    }

    let mut reachable = BTreeSet::new();
    while let Some(id) = worklist.pop() {
        if !reachable.insert(id) {
            continue;
        }
        let Some(index) = bodies.get(&id) else {
            continue;
        };
        for callee in function_instructions(&module.functions[*index])
            .flat_map(live_uses)
            .filter(|callee| bodies.contains_key(callee) && !reachable.contains(callee))
        {
            worklist.push(callee);
        }
    }

    let before = module.functions.len();
    module
        .functions
        .retain(|function| function_id(function).is_none_or(|id| reachable.contains(&id)));
    let removed = before - module.functions.len();
    if removed > 0 {
        tracing::debug!(removed, "removed unreachable functions");
    }
    removed
}

fn is_linkage_decoration(inst: &Instruction) -> bool {
    opcode(inst) == Op::Decorate
        && matches!(
            inst.operands.get(1),
            Some(Operand::Decoration(Decoration::LinkageAttributes))
        )
}

fn remove_dead_variables(module: &mut Module) -> usize {
    let counts = use_counts(module);
    let before = module.types_global_values.len();
    module.types_global_values.retain(|inst| {
        opcode(inst) != Op::Variable
            || inst
                .result_id
                .is_none_or(|id| counts.get(&id).copied().unwrap_or(0) > 0)
    });
    let removed = before - module.types_global_values.len();
    if removed > 0 {
        tracing::debug!(removed, "removed unreferenced global variables");
    }
    removed
}

fn is_type_or_constant_candidate(inst: &Instruction) -> bool {
    let op = opcode(inst);
    inst.result_id.is_some()
        && !matches!(op, Op::Variable | Op::ExtInst | Op::Line | Op::NoLine)
        && !is_spec_constant(op)
}

fn remove_dead_types(module: &mut Module) -> usize {
    let mut counts: BTreeMap<Word, usize> = BTreeMap::new();
    for inst in all_instructions(module).filter(|inst| opcode(inst) != Op::TypeForwardPointer) {
        for id in live_uses(inst) {
            *counts.entry(id).or_insert(0) += 1;
        }
    }

    let mut dead = BTreeSet::new();
    for inst in &module.types_global_values {
        if is_type_or_constant_candidate(inst)
            && let Some(id) = inst.result_id
            && counts.get(&id).copied().unwrap_or(0) == 0
        {
            dead.insert(id);
        }
    }

    let before = module.types_global_values.len();
    module.types_global_values.retain(|inst| {
        let dead_result = inst.result_id.is_some_and(|id| dead.contains(&id));
        let dead_forward = opcode(inst) == Op::TypeForwardPointer
            && id_at(inst, 0).is_some_and(|id| dead.contains(&id));
        !dead_result && !dead_forward
    });
    let removed = before - module.types_global_values.len();
    if removed > 0 {
        tracing::debug!(removed, "removed unreferenced types and constants");
    }
    removed
}

/// Drop names and decorations whose targets no longer exist. Group
/// decorations lose only their dangling targets. Returns the number of
/// instructions removed.
pub(crate) fn purge_dangling_attachments(module: &mut Module) -> usize {
    let defined: BTreeSet<Word> = all_instructions(module)
        .filter_map(|inst| inst.result_id)
        .collect();

    let mut removed = 0;
    for list in [&mut module.debug_names, &mut module.annotations] {
        let before = list.len();
        list.retain_mut(|inst| match opcode(inst) {
            Op::GroupDecorate => {
                let rest = inst.operands.split_off(inst.operands.len().min(1));
                inst.operands.extend(
                    rest.into_iter()
                        .filter(|operand| operand_id(operand).is_some_and(|id| defined.contains(&id))),
                );
                inst.operands.len() > 1
            }
            Op::GroupMemberDecorate => {
                let rest = inst.operands.split_off(inst.operands.len().min(1));
                inst.operands.extend(
                    rest.chunks(2)
                        .filter(|pair| operand_id(&pair[0]).is_some_and(|id| defined.contains(&id)))
                        .flat_map(|pair| pair.iter().cloned()),
                );
                inst.operands.len() > 1
            }
            _ => attachment_targets(inst)
                .iter()
                .all(|target| defined.contains(target)),
        });
        removed += before - list.len();
    }
    removed
}
