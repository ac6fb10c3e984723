use crate::cli::{DceMode, MapMode, OptMode, StripMode};
use serde::Deserialize;
use spvremap_core::rspirv::spirv::Word;
use spvremap_core::{RemapOptions, words_from_bytes, words_to_bytes};
use std::fs;
use std::path::Path;

/// On-disk configuration. Only the `[remap]` table is read; a missing
/// table or missing keys fall back to running every pass.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigFile {
    #[serde(default)]
    remap: RemapOptions,
}

/// Per-group command-line overrides. Each group, when given, replaces that
/// group's switches from the config file wholesale.
#[derive(Debug, Clone, Copy, Default)]
pub struct PassOverrides {
    pub strip: Option<StripMode>,
    pub map: Option<MapMode>,
    pub dce: Option<DceMode>,
    pub opt: Option<OptMode>,
}

pub fn parse_config(text: &str) -> Result<RemapOptions, String> {
    toml::from_str::<ConfigFile>(text)
        .map(|config| config.remap)
        .map_err(|e| format!("invalid config: {e}"))
}

pub fn load_config(path: Option<&str>) -> Result<RemapOptions, String> {
    let Some(path) = path else {
        return Ok(RemapOptions::default());
    };
    let text =
        fs::read_to_string(path).map_err(|e| format!("failed to read config {path}: {e}"))?;
    parse_config(&text).map_err(|e| format!("{path}: {e}"))
}

pub fn apply_overrides(mut options: RemapOptions, overrides: PassOverrides) -> RemapOptions {
    if let Some(strip) = overrides.strip {
        options.strip = strip == StripMode::All;
    }
    if let Some(map) = overrides.map {
        options.map_types = matches!(map, MapMode::All | MapMode::Types);
        options.map_names = matches!(map, MapMode::All | MapMode::Names);
        options.map_funcs = matches!(map, MapMode::All | MapMode::Funcs);
    }
    if let Some(dce) = overrides.dce {
        options.dce_types = matches!(dce, DceMode::All | DceMode::Types);
        options.dce_funcs = matches!(dce, DceMode::All | DceMode::Funcs);
        options.dce_vars = matches!(dce, DceMode::All | DceMode::Vars);
    }
    if let Some(opt) = overrides.opt {
        options.opt_loadstore = matches!(opt, OptMode::All | OptMode::Loadstore);
        options.opt_fwd_ls = matches!(opt, OptMode::All | OptMode::Fwd);
    }
    options
}

pub fn read_module(path: impl AsRef<Path>) -> Result<Vec<Word>, String> {
    let path = path.as_ref();
    let bytes = fs::read(path).map_err(|e| format!("failed to read {}: {e}", path.display()))?;
    words_from_bytes(&bytes).map_err(|e| format!("{}: {e}", path.display()))
}

pub fn write_module(path: impl AsRef<Path>, words: &[Word]) -> Result<(), String> {
    let path = path.as_ref();
    fs::write(path, words_to_bytes(words))
        .map_err(|e| format!("failed to write {}: {e}", path.display()))
}

pub fn read_module_or_exit(path: &str) -> Vec<Word> {
    read_module(path).unwrap_or_else(|e| exit_with(e))
}

pub fn exit_with(message: impl std::fmt::Display) -> ! {
    eprintln!("error: {message}");
    std::process::exit(1);
}

pub fn print_json(payload: &impl serde::Serialize) {
    match serde_json::to_string_pretty(payload) {
        Ok(text) => println!("{text}"),
        Err(e) => exit_with(format!("failed to render json: {e}")),
    }
}
