//! The remap pipeline.
//!
//! ```text
//! words ─► Header::parse ─► dr::load_words
//!        ─► NameTable::gather            (names survive stripping)
//!        ─► strip_debug                  (strip)
//!        ─► optimize_load_store          (opt_loadstore, opt_fwd_ls)
//!        ─► eliminate_dead_code          (dce_funcs, dce_vars, dce_types)
//!        ─► purge_dangling_attachments
//!        ─► compute_signatures + renumber (map_types, map_names, map_funcs)
//!        ─► assemble
//! ```

use crate::binary::Header;
use crate::canon::{compute_signatures, renumber};
use crate::dce::{eliminate_dead_code, purge_dangling_attachments};
use crate::error::RemapError;
use crate::loadstore::optimize_load_store;
use crate::names::NameTable;
use crate::options::RemapOptions;
use crate::strip::strip_debug;
use rspirv::binary::Assemble;
use rspirv::spirv::Word;
use serde::{Deserialize, Serialize};

/// Statistics of one remap run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemapReport {
    pub input_words: usize,
    pub output_words: usize,
    pub input_bound: Word,
    pub output_bound: Word,
    pub stripped_instructions: usize,
    pub removed_functions: usize,
    pub removed_variables: usize,
    pub removed_types: usize,
    pub removed_locals: usize,
    pub removed_stores: usize,
    pub forwarded_loads: usize,
    pub purged_attachments: usize,
    pub renumbered: bool,
}

/// Output words of a remap run together with its report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Remapped {
    pub words: Vec<Word>,
    pub report: RemapReport,
}

/// Runs the selected passes over SPIR-V modules. Holds no per-module state,
/// so one remapper can serve any number of modules.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Remapper {
    options: RemapOptions,
}

impl Remapper {
    pub fn new(options: RemapOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &RemapOptions {
        &self.options
    }

    /// Remap one module. Empty input is the empty module and maps to empty
    /// output.
    pub fn remap(&self, words: &[Word]) -> Result<Remapped, RemapError> {
        if words.is_empty() {
            return Ok(Remapped {
                words: Vec::new(),
                report: RemapReport::default(),
            });
        }

        let header = Header::parse(words)?;
        let mut module = rspirv::dr::load_words(words)
            .map_err(|err| RemapError::Parse(format!("{err:?}")))?;
        let options = self.options;
        let mut report = RemapReport {
            input_words: words.len(),
            input_bound: header.bound,
            ..RemapReport::default()
        };

        let names = NameTable::gather(&module);
        tracing::debug!(names = names.len(), "gathered id names");

        if options.strip {
            report.stripped_instructions = strip_debug(&mut module);
            tracing::debug!(removed = report.stripped_instructions, "stripped debug instructions");
        }

        let load_store = optimize_load_store(&mut module, options.opt_loadstore, options.opt_fwd_ls);
        report.removed_locals = load_store.variables;
        report.removed_stores = load_store.stores;
        report.forwarded_loads = load_store.loads;
        if load_store.variables > 0 {
            tracing::debug!(
                variables = load_store.variables,
                stores = load_store.stores,
                loads = load_store.loads,
                "optimized function-scope loads and stores"
            );
        }

        if options.eliminates_dead_code() {
            let dce = eliminate_dead_code(&mut module, &options);
            report.removed_functions = dce.functions;
            report.removed_variables = dce.variables;
            report.removed_types = dce.types;
        }

        report.purged_attachments = purge_dangling_attachments(&mut module);

        let bound = if options.maps_ids() {
            let signatures = compute_signatures(&module, &names, &options);
            report.renumbered = true;
            renumber(&mut module, &signatures)?
        } else {
            header.bound
        };
        // The loader rebuilds the header with its own generator and a zero
        // schema word; only the bound is ours to change.
        if let Some(module_header) = module.header.as_mut() {
            module_header.version = header.version;
            module_header.generator = header.generator;
            module_header.reserved_word = header.schema;
            module_header.bound = bound;
        }

        let output = module.assemble();
        report.output_words = output.len();
        report.output_bound = bound;
        tracing::info!(
            input_words = report.input_words,
            output_words = report.output_words,
            input_bound = report.input_bound,
            output_bound = report.output_bound,
            "remapped module"
        );

        Ok(Remapped {
            words: output,
            report,
        })
    }
}
