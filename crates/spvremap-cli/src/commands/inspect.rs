use crate::support::{exit_with, print_json, read_module_or_exit};
use serde::Serialize;
use spvremap_core::Header;
use spvremap_core::rspirv::dr::Module;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
struct InstructionCounts {
    total: usize,
    debug: usize,
    annotations: usize,
    types_and_globals: usize,
    entry_points: usize,
    functions: usize,
    function_instructions: usize,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct Inspection {
    path: String,
    words: usize,
    version: String,
    generator: u32,
    bound: u32,
    schema: u32,
    counts: InstructionCounts,
}

fn count_instructions(module: &Module) -> InstructionCounts {
    let debug = module.debug_string_source.len()
        + module.debug_names.len()
        + module.debug_module_processed.len();
    let function_instructions = module
        .functions
        .iter()
        .map(|function| {
            usize::from(function.def.is_some())
                + function.parameters.len()
                + function
                    .blocks
                    .iter()
                    .map(|block| usize::from(block.label.is_some()) + block.instructions.len())
                    .sum::<usize>()
                + usize::from(function.end.is_some())
        })
        .sum();
    let preamble = module.capabilities.len()
        + module.extensions.len()
        + module.ext_inst_imports.len()
        + usize::from(module.memory_model.is_some())
        + module.entry_points.len()
        + module.execution_modes.len();

    InstructionCounts {
        total: preamble
            + debug
            + module.annotations.len()
            + module.types_global_values.len()
            + function_instructions,
        debug,
        annotations: module.annotations.len(),
        types_and_globals: module.types_global_values.len(),
        entry_points: module.entry_points.len(),
        functions: module.functions.len(),
        function_instructions,
    }
}

pub fn run(input: String, json_output: bool) {
    let words = read_module_or_exit(&input);
    let header = Header::parse(&words).unwrap_or_else(|e| exit_with(format!("{input}: {e}")));
    let module = spvremap_core::rspirv::dr::load_words(&words)
        .unwrap_or_else(|e| exit_with(format!("{input}: failed to parse module: {e:?}")));
    let (major, minor) = header.version_pair();

    let inspection = Inspection {
        path: input,
        words: words.len(),
        version: format!("{major}.{minor}"),
        generator: header.generator,
        bound: header.bound,
        schema: header.schema,
        counts: count_instructions(&module),
    };

    if json_output {
        print_json(&inspection);
        return;
    }

    let counts = &inspection.counts;
    println!("spvremap inspect {}", inspection.path);
    println!();
    println!("  words: {}", inspection.words);
    println!("  version: {}", inspection.version);
    println!("  generator: {:#010x}", inspection.generator);
    println!("  bound: {}", inspection.bound);
    println!("  instructions: {}", counts.total);
    println!("  debug: {}", counts.debug);
    println!("  annotations: {}", counts.annotations);
    println!("  types/globals: {}", counts.types_and_globals);
    println!("  entry points: {}", counts.entry_points);
    println!(
        "  functions: {} ({} instructions)",
        counts.functions, counts.function_instructions
    );
}
