use crate::cli::{DceMode, MapMode, OptMode, StripMode};
use crate::support::{
    PassOverrides, apply_overrides, exit_with, load_config, print_json, read_module, write_module,
};
use serde::Serialize;
use spvremap_core::{RemapOptions, RemapReport, Remapper};
use std::fs;
use std::path::{Path, PathBuf};

pub struct Args {
    pub inputs: Vec<String>,
    pub output: Option<String>,
    pub output_dir: Option<String>,
    pub config: Option<String>,
    pub strip: Option<StripMode>,
    pub map: Option<MapMode>,
    pub dce: Option<DceMode>,
    pub opt: Option<OptMode>,
    pub json: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
struct FileOutcome {
    input: String,
    output: String,
    report: RemapReport,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RunOutcome {
    options: RemapOptions,
    option_bits: u32,
    files: Vec<FileOutcome>,
}

/// Where each input's result goes.
fn output_paths(
    inputs: &[String],
    output: Option<&str>,
    output_dir: Option<&str>,
) -> Result<Vec<PathBuf>, String> {
    if let Some(output) = output {
        if inputs.len() != 1 {
            return Err(format!(
                "--output takes a single input, got {}; use --output-dir",
                inputs.len()
            ));
        }
        return Ok(vec![PathBuf::from(output)]);
    }
    let Some(dir) = output_dir else {
        return Ok(inputs.iter().map(PathBuf::from).collect());
    };
    inputs
        .iter()
        .map(|input| {
            Path::new(input)
                .file_name()
                .map(|name| Path::new(dir).join(name))
                .ok_or_else(|| format!("input has no file name: {input}"))
        })
        .collect()
}

fn remap_file(remapper: &Remapper, input: &str, output: &Path) -> Result<FileOutcome, String> {
    let words = read_module(input)?;
    let remapped = remapper
        .remap(&words)
        .map_err(|e| format!("failed to remap {input}: {e}"))?;
    write_module(output, &remapped.words)?;
    tracing::info!(
        input,
        output = %output.display(),
        words = remapped.report.output_words,
        "wrote remapped module"
    );
    Ok(FileOutcome {
        input: input.to_string(),
        output: output.display().to_string(),
        report: remapped.report,
    })
}

pub fn run(args: Args) {
    let outputs = output_paths(
        &args.inputs,
        args.output.as_deref(),
        args.output_dir.as_deref(),
    )
    .unwrap_or_else(|e| exit_with(e));
    if let Some(dir) = &args.output_dir {
        fs::create_dir_all(dir)
            .unwrap_or_else(|e| exit_with(format!("failed to create {dir}: {e}")));
    }

    let config = load_config(args.config.as_deref()).unwrap_or_else(|e| exit_with(e));
    let options = apply_overrides(
        config,
        PassOverrides {
            strip: args.strip,
            map: args.map,
            dce: args.dce,
            opt: args.opt,
        },
    );
    tracing::debug!(bits = options.bits(), "selected remap passes");
    let remapper = Remapper::new(options);

    let mut files = Vec::with_capacity(args.inputs.len());
    for (input, output) in args.inputs.iter().zip(&outputs) {
        let outcome = remap_file(&remapper, input, output).unwrap_or_else(|e| exit_with(e));
        files.push(outcome);
    }

    if args.json {
        print_json(&RunOutcome {
            options,
            option_bits: options.bits(),
            files,
        });
        return;
    }

    for file in &files {
        let report = &file.report;
        println!("spvremap remap {} -> {}", file.input, file.output);
        println!("  words: {} -> {}", report.input_words, report.output_words);
        println!("  bound: {} -> {}", report.input_bound, report.output_bound);
        println!("  stripped: {}", report.stripped_instructions);
        println!(
            "  removed: {} functions, {} variables, {} types",
            report.removed_functions, report.removed_variables, report.removed_types
        );
        println!(
            "  load/store: {} locals, {} stores, {} loads forwarded",
            report.removed_locals, report.removed_stores, report.forwarded_loads
        );
    }
}
