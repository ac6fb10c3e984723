//! Canonical id assignment.
//!
//! Ids get an optional signature derived from what they denote rather than
//! from where the producer happened to number them:
//!
//! ```text
//! named id           ← hash of its name
//! type / constant    ← hash of opcode, literals, and signatures of operands
//! function           ← hash of the opcode sequence of its body
//! function local     ← hash of (function signature, position, opcode)
//! ```
//!
//! Ids are then renumbered densely from 1: unsigned ids first in their
//! original order, then signed ids ordered by signature. Equal signatures
//! fall back to the original id, so the result is deterministic.

use crate::error::RemapError;
use crate::ids::{
    all_instructions, for_each_id_mut, for_each_instruction_mut, function_id,
    function_instructions, opcode, operand_id, referenced_ids,
};
use crate::names::NameTable;
use crate::options::RemapOptions;
use rspirv::dr::{Instruction, Module};
use rspirv::spirv::Word;
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, BTreeSet};

/// Incremental signature builder.
///
/// Feeds length-prefixed fields in a stable order and truncates the digest
/// to 64 bits.
struct SignatureBuilder {
    hasher: Sha256,
}

impl SignatureBuilder {
    fn new(kind: &str) -> Self {
        Self {
            hasher: Sha256::new(),
        }
        .bytes(kind.as_bytes())
    }

    fn bytes(mut self, value: &[u8]) -> Self {
        self.hasher.update((value.len() as u64).to_le_bytes());
        self.hasher.update(value);
        self
    }

    fn word(mut self, value: u64) -> Self {
        self.hasher.update(value.to_le_bytes());
        self
    }

    fn finish(self) -> u64 {
        let digest = self.hasher.finalize();
        let mut head = [0u8; 8];
        head.copy_from_slice(&digest[..8]);
        u64::from_be_bytes(head)
    }
}

pub(crate) fn compute_signatures(
    module: &Module,
    names: &NameTable,
    options: &RemapOptions,
) -> BTreeMap<Word, u64> {
    let defined: BTreeSet<Word> = all_instructions(module)
        .filter_map(|inst| inst.result_id)
        .collect();
    let mut signatures = BTreeMap::new();

    if options.map_names {
        for id in &defined {
            if let Some(name) = names.get(*id) {
                let signature = SignatureBuilder::new("name").bytes(name.as_bytes()).finish();
                signatures.insert(*id, signature);
            }
        }
    }

    if options.map_types {
        for inst in &module.types_global_values {
            let Some(id) = inst.result_id else { continue };
            if signatures.contains_key(&id) {
                continue;
            }
            let signature = structural_signature(inst, &signatures);
            signatures.insert(id, signature);
        }
    }

    if options.map_funcs {
        for function in &module.functions {
            let Some(id) = function_id(function) else {
                continue;
            };
            let function_signature = match signatures.get(&id) {
                Some(signature) => *signature,
                None => {
                    let signature = function_instructions(function)
                        .fold(SignatureBuilder::new("function"), |builder, inst| {
                            builder.word(opcode(inst) as u64)
                        })
                        .finish();
                    signatures.insert(id, signature);
                    signature
                }
            };
            for (position, inst) in function_instructions(function).enumerate().skip(1) {
                let Some(local) = inst.result_id else { continue };
                signatures.entry(local).or_insert_with(|| {
                    SignatureBuilder::new("local")
                        .word(function_signature)
                        .word(position as u64)
                        .word(opcode(inst) as u64)
                        .finish()
                });
            }
        }
    }

    signatures
}

fn structural_signature(inst: &Instruction, known: &BTreeMap<Word, u64>) -> u64 {
    let id_signature = |id: Word| known.get(&id).copied().unwrap_or(0);
    let mut builder = SignatureBuilder::new("type").word(opcode(inst) as u64);
    if let Some(result_type) = inst.result_type {
        builder = builder.word(id_signature(result_type));
    }
    for operand in &inst.operands {
        builder = match operand_id(operand) {
            Some(id) => builder.word(id_signature(id)),
            None => builder.bytes(format!("{operand:?}").as_bytes()),
        };
    }
    builder.finish()
}

/// Renumber every id densely. Returns the new id bound.
pub(crate) fn renumber(
    module: &mut Module,
    signatures: &BTreeMap<Word, u64>,
) -> Result<Word, RemapError> {
    let mut seen = BTreeSet::new();
    let ordered: Vec<Word> = all_instructions(module)
        .filter_map(|inst| inst.result_id)
        .filter(|id| seen.insert(*id))
        .collect();

    if let Some(undefined) = all_instructions(module)
        .flat_map(referenced_ids)
        .find(|id| !seen.contains(id))
    {
        return Err(RemapError::UndefinedId(undefined));
    }

    let mut keyed: Vec<(Option<u64>, usize, Word)> = ordered
        .iter()
        .enumerate()
        .map(|(position, id)| (signatures.get(id).copied(), position, *id))
        .collect();
    keyed.sort_by_key(|(signature, position, id)| match signature {
        Some(signature) => (1, *signature, *id as usize),
        None => (0, 0, *position),
    });

    let mapping: BTreeMap<Word, Word> = keyed
        .iter()
        .enumerate()
        .map(|(index, (_, _, id))| (*id, index as Word + 1))
        .collect();

    for_each_instruction_mut(module, |inst| {
        for_each_id_mut(inst, |id| {
            if let Some(new_id) = mapping.get(id) {
                *id = *new_id;
            }
        });
    });

    Ok(mapping.len() as Word + 1)
}
