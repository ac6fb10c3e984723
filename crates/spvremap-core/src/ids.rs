//! Id operand access and module traversal shared by the passes.

use rspirv::dr::{Function, Instruction, Module, Operand};
use rspirv::spirv::{Op, Word};
use std::collections::BTreeMap;

/// The id carried by an operand, if it is an id operand.
pub(crate) fn operand_id(operand: &Operand) -> Option<Word> {
    match operand {
        Operand::IdRef(id) | Operand::IdMemorySemantics(id) | Operand::IdScope(id) => Some(*id),
        _ => None,
    }
}

pub(crate) fn operand_id_mut(operand: &mut Operand) -> Option<&mut Word> {
    match operand {
        Operand::IdRef(id) | Operand::IdMemorySemantics(id) | Operand::IdScope(id) => Some(id),
        _ => None,
    }
}

/// Ids an instruction reads: its result type and every id operand.
pub(crate) fn referenced_ids(inst: &Instruction) -> impl Iterator<Item = Word> + '_ {
    inst.result_type
        .into_iter()
        .chain(inst.operands.iter().filter_map(operand_id))
}

/// Visit every id slot of an instruction, result id included.
pub(crate) fn for_each_id_mut(inst: &mut Instruction, mut f: impl FnMut(&mut Word)) {
    if let Some(id) = inst.result_type.as_mut() {
        f(id);
    }
    if let Some(id) = inst.result_id.as_mut() {
        f(id);
    }
    for operand in &mut inst.operands {
        if let Some(id) = operand_id_mut(operand) {
            f(id);
        }
    }
}

pub(crate) fn opcode(inst: &Instruction) -> Op {
    inst.class.opcode
}

pub(crate) fn literal_string(inst: &Instruction, index: usize) -> Option<&str> {
    match inst.operands.get(index) {
        Some(Operand::LiteralString(value)) => Some(value.as_str()),
        _ => None,
    }
}

pub(crate) fn id_at(inst: &Instruction, index: usize) -> Option<Word> {
    inst.operands.get(index).and_then(operand_id)
}

pub(crate) fn is_debug(op: Op) -> bool {
    matches!(
        op,
        Op::Source
            | Op::SourceContinued
            | Op::SourceExtension
            | Op::String
            | Op::Name
            | Op::MemberName
            | Op::Line
            | Op::NoLine
            | Op::ModuleProcessed
    )
}

pub(crate) fn is_spec_constant(op: Op) -> bool {
    matches!(
        op,
        Op::SpecConstantTrue
            | Op::SpecConstantFalse
            | Op::SpecConstant
            | Op::SpecConstantComposite
            | Op::SpecConstantOp
    )
}

/// Ids an annotation or debug name is attached to. These references do not
/// keep their targets alive.
pub(crate) fn attachment_targets(inst: &Instruction) -> Vec<Word> {
    match opcode(inst) {
        Op::Name
        | Op::MemberName
        | Op::Decorate
        | Op::MemberDecorate
        | Op::DecorateId
        | Op::DecorateString
        | Op::MemberDecorateString => id_at(inst, 0).into_iter().collect(),
        Op::GroupDecorate => inst.operands.iter().skip(1).filter_map(operand_id).collect(),
        Op::GroupMemberDecorate => inst
            .operands
            .iter()
            .skip(1)
            .step_by(2)
            .filter_map(operand_id)
            .collect(),
        _ => Vec::new(),
    }
}

/// Ids read by an instruction that are uses in the liveness sense: attachment
/// targets are excluded.
pub(crate) fn live_uses(inst: &Instruction) -> Vec<Word> {
    let targets = attachment_targets(inst);
    if targets.is_empty() {
        return referenced_ids(inst).collect();
    }
    let mut uses: Vec<Word> = referenced_ids(inst).collect();
    for target in targets {
        if let Some(pos) = uses.iter().position(|id| *id == target) {
            uses.remove(pos);
        }
    }
    uses
}

pub(crate) fn function_instructions(function: &Function) -> impl Iterator<Item = &Instruction> {
    function
        .def
        .iter()
        .chain(function.parameters.iter())
        .chain(
            function
                .blocks
                .iter()
                .flat_map(|block| block.label.iter().chain(block.instructions.iter())),
        )
        .chain(function.end.iter())
}

pub(crate) fn function_instructions_mut(
    function: &mut Function,
) -> impl Iterator<Item = &mut Instruction> {
    function
        .def
        .iter_mut()
        .chain(function.parameters.iter_mut())
        .chain(
            function
                .blocks
                .iter_mut()
                .flat_map(|block| block.label.iter_mut().chain(block.instructions.iter_mut())),
        )
        .chain(function.end.iter_mut())
}

/// Instructions outside function bodies, in module layout order.
pub(crate) fn global_instructions(module: &Module) -> impl Iterator<Item = &Instruction> {
    module
        .capabilities
        .iter()
        .chain(module.extensions.iter())
        .chain(module.ext_inst_imports.iter())
        .chain(module.memory_model.iter())
        .chain(module.entry_points.iter())
        .chain(module.execution_modes.iter())
        .chain(module.debug_string_source.iter())
        .chain(module.debug_names.iter())
        .chain(module.debug_module_processed.iter())
        .chain(module.annotations.iter())
        .chain(module.types_global_values.iter())
}

pub(crate) fn all_instructions(module: &Module) -> impl Iterator<Item = &Instruction> {
    global_instructions(module).chain(module.functions.iter().flat_map(function_instructions))
}

pub(crate) fn for_each_instruction_mut(module: &mut Module, mut f: impl FnMut(&mut Instruction)) {
    module
        .capabilities
        .iter_mut()
        .chain(module.extensions.iter_mut())
        .chain(module.ext_inst_imports.iter_mut())
        .chain(module.memory_model.iter_mut())
        .chain(module.entry_points.iter_mut())
        .chain(module.execution_modes.iter_mut())
        .chain(module.debug_string_source.iter_mut())
        .chain(module.debug_names.iter_mut())
        .chain(module.debug_module_processed.iter_mut())
        .chain(module.annotations.iter_mut())
        .chain(module.types_global_values.iter_mut())
        .for_each(&mut f);
    for function in &mut module.functions {
        function_instructions_mut(function).for_each(&mut f);
    }
}

/// Number of live uses of every id in the module.
pub(crate) fn use_counts(module: &Module) -> BTreeMap<Word, usize> {
    let mut counts = BTreeMap::new();
    for inst in all_instructions(module) {
        for id in live_uses(inst) {
            *counts.entry(id).or_insert(0) += 1;
        }
    }
    counts
}

pub(crate) fn function_id(function: &Function) -> Option<Word> {
    function.def.as_ref().and_then(|def| def.result_id)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn inst(op: Op, result_type: Option<Word>, result_id: Option<Word>, operands: Vec<Operand>) -> Instruction {
        Instruction::new(op, result_type, result_id, operands)
    }

    #[test]
    fn referenced_ids_include_result_type_but_not_result() {
        let load = inst(Op::Load, Some(3), Some(9), vec![Operand::IdRef(5)]);
        assert_eq!(referenced_ids(&load).collect::<Vec<_>>(), vec![3, 5]);
    }

    #[test]
    fn decorate_target_is_not_a_live_use() {
        let decorate = inst(
            Op::DecorateId,
            None,
            None,
            vec![
                Operand::IdRef(4),
                Operand::Decoration(rspirv::spirv::Decoration::CounterBuffer),
                Operand::IdRef(8),
            ],
        );
        assert_eq!(attachment_targets(&decorate), vec![4]);
        assert_eq!(live_uses(&decorate), vec![8]);
    }

    #[test]
    fn group_member_decorate_targets_skip_literals() {
        let group = inst(
            Op::GroupMemberDecorate,
            None,
            None,
            vec![
                Operand::IdRef(2),
                Operand::IdRef(10),
                Operand::LiteralBit32(0),
                Operand::IdRef(11),
                Operand::LiteralBit32(1),
            ],
        );
        assert_eq!(attachment_targets(&group), vec![10, 11]);
        assert_eq!(live_uses(&group), vec![2]);
    }

    #[test]
    fn for_each_id_mut_rewrites_every_slot() {
        let mut store = inst(
            Op::AtomicStore,
            None,
            None,
            vec![
                Operand::IdRef(1),
                Operand::IdScope(2),
                Operand::IdMemorySemantics(3),
                Operand::IdRef(4),
            ],
        );
        for_each_id_mut(&mut store, |id| *id += 100);
        assert_eq!(
            referenced_ids(&store).collect::<Vec<_>>(),
            vec![101, 102, 103, 104]
        );
    }
}
