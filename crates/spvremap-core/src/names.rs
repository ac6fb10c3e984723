//! Names attached to ids, gathered before stripping removes them.

use crate::ids::{global_instructions, id_at, literal_string, opcode};
use rspirv::dr::Module;
use rspirv::spirv::{Op, Word};
use std::collections::BTreeMap;

/// Name per id from `OpName`, entry point names and extended-instruction
/// set imports. The first name seen for an id wins.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct NameTable {
    names: BTreeMap<Word, String>,
}

impl NameTable {
    pub(crate) fn gather(module: &Module) -> Self {
        let mut names = BTreeMap::new();
        for inst in global_instructions(module) {
            let entry = match opcode(inst) {
                Op::Name => id_at(inst, 0).zip(literal_string(inst, 1)),
                Op::EntryPoint => id_at(inst, 1).zip(literal_string(inst, 2)),
                Op::ExtInstImport => inst.result_id.zip(literal_string(inst, 0)),
                _ => None,
            };
            if let Some((id, name)) = entry
                && !name.is_empty()
            {
                names.entry(id).or_insert_with(|| name.to_string());
            }
        }
        Self { names }
    }

    pub(crate) fn get(&self, id: Word) -> Option<&str> {
        self.names.get(&id).map(String::as_str)
    }

    pub(crate) fn len(&self) -> usize {
        self.names.len()
    }
}
