//! Debug-information stripping.
//!
//! Removes source, name, line and module-processed instructions, plus
//! non-semantic extended instructions together with their imports.

use crate::ids::{id_at, is_debug, literal_string, opcode};
use rspirv::dr::{Instruction, Module};
use rspirv::spirv::{Op, Word};
use std::collections::BTreeSet;

const NON_SEMANTIC_PREFIX: &str = "NonSemantic.";
const NON_SEMANTIC_EXTENSION: &str = "SPV_KHR_non_semantic_info";

/// Strip debug instructions. Returns the number of instructions removed.
pub(crate) fn strip_debug(module: &mut Module) -> usize {
    let non_semantic_sets: BTreeSet<Word> = module
        .ext_inst_imports
        .iter()
        .filter(|inst| {
            literal_string(inst, 0).is_some_and(|name| name.starts_with(NON_SEMANTIC_PREFIX))
        })
        .filter_map(|inst| inst.result_id)
        .collect();

    let strippable = |inst: &Instruction| {
        is_debug(opcode(inst))
            || (opcode(inst) == Op::ExtInst
                && id_at(inst, 0).is_some_and(|set| non_semantic_sets.contains(&set)))
    };

    let mut removed = 0;
    let mut retain = |list: &mut Vec<Instruction>| {
        let before = list.len();
        list.retain(|inst| !strippable(inst));
        removed += before - list.len();
    };

    retain(&mut module.debug_string_source);
    retain(&mut module.debug_names);
    retain(&mut module.debug_module_processed);
    retain(&mut module.types_global_values);
    for function in &mut module.functions {
        for block in &mut function.blocks {
            retain(&mut block.instructions);
        }
    }

    if !non_semantic_sets.is_empty() {
        let before = module.ext_inst_imports.len();
        module.ext_inst_imports.retain(|inst| {
            inst.result_id
                .is_none_or(|id| !non_semantic_sets.contains(&id))
        });
        removed += before - module.ext_inst_imports.len();

        let before = module.extensions.len();
        module
            .extensions
            .retain(|inst| literal_string(inst, 0) != Some(NON_SEMANTIC_EXTENSION));
        removed += before - module.extensions.len();
    }

    removed
}
