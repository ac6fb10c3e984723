//! Load/store cleanup for function-scope variables.
//!
//! Only variables whose every use is a plain `OpLoad` or `OpStore` on the
//! variable itself are candidates; anything else (access chains, calls,
//! memory-access operands) keeps the variable as is.

use crate::ids::{for_each_id_mut, id_at, opcode, operand_id};
use rspirv::dr::{Function, Module, Operand};
use rspirv::spirv::{Op, StorageClass, Word};
use std::collections::{BTreeMap, BTreeSet};

/// Counts produced by the load/store passes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct LoadStoreStats {
    pub variables: usize,
    pub stores: usize,
    pub loads: usize,
}

type Position = (usize, usize);

#[derive(Debug, Default)]
struct LocalUses {
    def: Option<Position>,
    has_initializer: bool,
    stores: Vec<(Position, Word)>,
    loads: Vec<(Position, Word)>,
    escapes: bool,
}

pub(crate) fn optimize_load_store(
    module: &mut Module,
    remove_write_only: bool,
    forward_single_store: bool,
) -> LoadStoreStats {
    let mut stats = LoadStoreStats::default();
    if !remove_write_only && !forward_single_store {
        return stats;
    }
    for function in &mut module.functions {
        let locals = classify_locals(function);
        let mut doomed: BTreeSet<Position> = BTreeSet::new();
        let mut replacements: BTreeMap<Word, Word> = BTreeMap::new();

        for uses in locals.values() {
            let Some(def) = uses.def else { continue };
            if uses.escapes {
                continue;
            }

            if remove_write_only && uses.loads.is_empty() {
                doomed.insert(def);
                doomed.extend(uses.stores.iter().map(|(pos, _)| *pos));
                stats.variables += 1;
                stats.stores += uses.stores.len();
                continue;
            }

            if forward_single_store
                && !uses.has_initializer
                && let [(store_pos, value)] = uses.stores.as_slice()
                && uses
                    .loads
                    .iter()
                    .all(|(pos, _)| pos.0 == store_pos.0 && pos.1 > store_pos.1)
            {
                // A stored value that is, directly or through earlier
                // forwarding, one of this variable's own loads would make the
                // replacement map cyclic. Such a module is invalid; leave it be.
                let target = resolve(&replacements, *value);
                if uses.loads.iter().any(|(_, result)| *result == target) {
                    tracing::debug!(
                        variable = ?def,
                        value = *value,
                        "skipping self-referential store"
                    );
                    continue;
                }
                doomed.insert(def);
                doomed.insert(*store_pos);
                for (pos, result) in &uses.loads {
                    doomed.insert(*pos);
                    replacements.insert(*result, target);
                }
                stats.variables += 1;
                stats.stores += 1;
                stats.loads += uses.loads.len();
            }
        }

        if doomed.is_empty() {
            continue;
        }
        for (block_index, block) in function.blocks.iter_mut().enumerate() {
            let mut inst_index = 0;
            block.instructions.retain(|_| {
                let keep = !doomed.contains(&(block_index, inst_index));
                inst_index += 1;
                keep
            });
        }
        if !replacements.is_empty() {
            let resolved = resolve_chains(&replacements);
            for block in &mut function.blocks {
                for inst in &mut block.instructions {
                    for_each_id_mut(inst, |id| {
                        if let Some(new_id) = resolved.get(id) {
                            *id = *new_id;
                        }
                    });
                }
            }
        }
    }
    stats
}

fn classify_locals(function: &Function) -> BTreeMap<Word, LocalUses> {
    let mut locals: BTreeMap<Word, LocalUses> = BTreeMap::new();
    for (block_index, block) in function.blocks.iter().enumerate() {
        for (inst_index, inst) in block.instructions.iter().enumerate() {
            if opcode(inst) == Op::Variable
                && matches!(
                    inst.operands.first(),
                    Some(Operand::StorageClass(StorageClass::Function))
                )
                && let Some(id) = inst.result_id
            {
                let uses = locals.entry(id).or_default();
                uses.def = Some((block_index, inst_index));
                uses.has_initializer = inst.operands.len() > 1;
            }
        }
    }
    if locals.is_empty() {
        return locals;
    }

    for (block_index, block) in function.blocks.iter().enumerate() {
        for (inst_index, inst) in block.instructions.iter().enumerate() {
            let pos = (block_index, inst_index);
            match opcode(inst) {
                Op::Store if inst.operands.len() == 2 => {
                    let pointer = id_at(inst, 0);
                    let value = id_at(inst, 1);
                    if let (Some(pointer), Some(value)) = (pointer, value)
                        && pointer != value
                        && let Some(uses) = locals.get_mut(&pointer)
                    {
                        uses.stores.push((pos, value));
                        if let Some(uses) = locals.get_mut(&value) {
                            uses.escapes = true;
                        }
                        continue;
                    }
                }
                Op::Load if inst.operands.len() == 1 => {
                    if let (Some(pointer), Some(result)) = (id_at(inst, 0), inst.result_id)
                        && let Some(uses) = locals.get_mut(&pointer)
                    {
                        uses.loads.push((pos, result));
                        continue;
                    }
                }
                Op::Variable if inst.result_id.is_some_and(|id| locals.contains_key(&id)) => {
                    if let Some(init) = inst.operands.get(1).and_then(operand_id)
                        && let Some(uses) = locals.get_mut(&init)
                    {
                        uses.escapes = true;
                    }
                    continue;
                }
                _ => {}
            }
            for id in inst.operands.iter().filter_map(operand_id) {
                if let Some(uses) = locals.get_mut(&id) {
                    uses.escapes = true;
                }
            }
        }
    }

    locals
}

/// Follow `id` through `replacements`, which is kept acyclic.
fn resolve(replacements: &BTreeMap<Word, Word>, mut id: Word) -> Word {
    while let Some(next) = replacements.get(&id) {
        id = *next;
    }
    id
}

fn resolve_chains(replacements: &BTreeMap<Word, Word>) -> BTreeMap<Word, Word> {
    replacements
        .keys()
        .map(|from| (*from, resolve(replacements, *from)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rspirv::dr::{Block, Instruction};

    fn var(id: Word) -> Instruction {
        Instruction::new(
            Op::Variable,
            Some(10),
            Some(id),
            vec![Operand::StorageClass(StorageClass::Function)],
        )
    }

    fn store(pointer: Word, value: Word) -> Instruction {
        Instruction::new(
            Op::Store,
            None,
            None,
            vec![Operand::IdRef(pointer), Operand::IdRef(value)],
        )
    }

    fn load(result: Word, pointer: Word) -> Instruction {
        Instruction::new(Op::Load, Some(11), Some(result), vec![Operand::IdRef(pointer)])
    }

    fn module_with(blocks: Vec<Vec<Instruction>>) -> Module {
        let mut function = Function::new();
        for instructions in blocks {
            let mut block = Block::new();
            block.instructions = instructions;
            function.blocks.push(block);
        }
        let mut module = Module::new();
        module.functions.push(function);
        module
    }

    fn opcodes(module: &Module) -> Vec<Op> {
        module.functions[0]
            .blocks
            .iter()
            .flat_map(|block| block.instructions.iter().map(opcode))
            .collect()
    }

    #[test]
    fn write_only_local_is_removed_with_its_stores() {
        let mut module = module_with(vec![vec![
            var(20),
            store(20, 30),
            store(20, 31),
            Instruction::new(Op::Return, None, None, vec![]),
        ]]);

        let stats = optimize_load_store(&mut module, true, false);

        assert_eq!(stats, LoadStoreStats { variables: 1, stores: 2, loads: 0 });
        assert_eq!(opcodes(&module), vec![Op::Return]);
    }

    #[test]
    fn single_store_is_forwarded_to_loads_in_the_same_block() {
        let mut module = module_with(vec![vec![
            var(20),
            store(20, 30),
            load(40, 20),
            store(50, 40),
            Instruction::new(Op::Return, None, None, vec![]),
        ]]);

        let stats = optimize_load_store(&mut module, false, true);

        assert_eq!(stats, LoadStoreStats { variables: 1, stores: 1, loads: 1 });
        let block = &module.functions[0].blocks[0];
        assert_eq!(block.instructions.len(), 2);
        assert_eq!(id_at(&block.instructions[0], 1), Some(30));
    }

    #[test]
    fn loads_in_other_blocks_are_not_forwarded() {
        let mut module = module_with(vec![
            vec![var(20), store(20, 30)],
            vec![load(40, 20), Instruction::new(Op::Return, None, None, vec![])],
        ]);

        let stats = optimize_load_store(&mut module, true, true);

        assert_eq!(stats, LoadStoreStats::default());
        assert_eq!(opcodes(&module).len(), 4);
    }

    #[test]
    fn escaping_local_is_kept() {
        let mut module = module_with(vec![vec![
            var(20),
            store(20, 30),
            Instruction::new(
                Op::AccessChain,
                Some(12),
                Some(41),
                vec![Operand::IdRef(20), Operand::IdRef(2)],
            ),
            Instruction::new(Op::Return, None, None, vec![]),
        ]]);

        assert_eq!(
            optimize_load_store(&mut module, true, true),
            LoadStoreStats::default()
        );
    }

    #[test]
    fn forwarded_chains_resolve_to_the_original_value() {
        let mut module = module_with(vec![vec![
            var(20),
            var(21),
            store(20, 30),
            load(40, 20),
            store(21, 40),
            load(41, 21),
            store(50, 41),
            Instruction::new(Op::Return, None, None, vec![]),
        ]]);

        let stats = optimize_load_store(&mut module, true, true);

        assert_eq!(stats.variables, 2);
        assert_eq!(stats.loads, 2);
        let block = &module.functions[0].blocks[0];
        assert_eq!(id_at(&block.instructions[0], 0), Some(50));
        assert_eq!(id_at(&block.instructions[0], 1), Some(30));
    }

    #[test]
    fn store_of_own_load_is_not_forwarded() {
        let mut module = module_with(vec![vec![
            var(20),
            store(20, 40),
            load(40, 20),
            Instruction::new(Op::Return, None, None, vec![]),
        ]]);

        let stats = optimize_load_store(&mut module, true, true);

        assert_eq!(stats, LoadStoreStats::default());
        assert_eq!(
            opcodes(&module),
            vec![Op::Variable, Op::Store, Op::Load, Op::Return]
        );
    }

    #[test]
    fn mutually_forwarding_locals_stop_at_the_cycle() {
        // %40 = load %20 feeds %21; %41 = load %21 feeds %20 back.
        let mut module = module_with(vec![vec![
            var(20),
            var(21),
            store(20, 41),
            load(40, 20),
            store(21, 40),
            load(41, 21),
            Instruction::new(Op::Return, None, None, vec![]),
        ]]);

        let stats = optimize_load_store(&mut module, true, true);

        assert_eq!(stats.variables, 1);
        assert_eq!(
            opcodes(&module),
            vec![Op::Variable, Op::Store, Op::Load, Op::Return]
        );
        let block = &module.functions[0].blocks[0];
        assert_eq!(id_at(&block.instructions[1], 0), Some(21));
        assert_eq!(id_at(&block.instructions[1], 1), Some(41));
    }
}
