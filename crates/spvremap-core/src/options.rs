//! Remap pass selection.
//!
//! Each pass is an independent switch. The bit encoding is stable and is
//! what the C entry points accept as their option mask.

use crate::error::RemapError;
use serde::{Deserialize, Serialize};

pub const STRIP: u32 = 1 << 0;
pub const MAP_TYPES: u32 = 1 << 1;
pub const MAP_NAMES: u32 = 1 << 2;
pub const MAP_FUNCS: u32 = 1 << 3;
pub const DCE_FUNCS: u32 = 1 << 4;
pub const DCE_VARS: u32 = 1 << 5;
pub const DCE_TYPES: u32 = 1 << 6;
pub const OPT_LOADSTORE: u32 = 1 << 7;
pub const OPT_FWD_LS: u32 = 1 << 8;

pub const MAP_ALL: u32 = MAP_TYPES | MAP_NAMES | MAP_FUNCS;
pub const DCE_ALL: u32 = DCE_FUNCS | DCE_VARS | DCE_TYPES;
pub const OPT_ALL: u32 = OPT_LOADSTORE | OPT_FWD_LS;
pub const ALL_BUT_STRIP: u32 = MAP_ALL | DCE_ALL | OPT_ALL;
pub const DO_EVERYTHING: u32 = STRIP | ALL_BUT_STRIP;

/// Which remap passes run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RemapOptions {
    /// Remove debug and non-semantic instructions.
    pub strip: bool,
    /// Structural signatures for types, constants and globals.
    pub map_types: bool,
    /// Name-derived signatures for named ids.
    pub map_names: bool,
    /// Body-derived signatures for functions and their locals.
    pub map_funcs: bool,
    /// Remove functions unreachable from entry points.
    pub dce_funcs: bool,
    /// Remove unreferenced global variables.
    pub dce_vars: bool,
    /// Remove unreferenced types and constants.
    pub dce_types: bool,
    /// Remove write-only function-scope variables.
    pub opt_loadstore: bool,
    /// Forward single-store function-scope variables to their loads.
    pub opt_fwd_ls: bool,
}

impl Default for RemapOptions {
    fn default() -> Self {
        Self::everything()
    }
}

impl RemapOptions {
    pub fn everything() -> Self {
        Self::from_known_bits(DO_EVERYTHING)
    }

    pub fn none() -> Self {
        Self::from_known_bits(0)
    }

    pub fn all_but_strip() -> Self {
        Self::from_known_bits(ALL_BUT_STRIP)
    }

    /// Decode an option mask. Unknown bits are an error rather than ignored.
    pub fn from_bits(bits: u32) -> Result<Self, RemapError> {
        let unknown = bits & !DO_EVERYTHING;
        if unknown != 0 {
            return Err(RemapError::UnknownOptionBits(unknown));
        }
        Ok(Self::from_known_bits(bits))
    }

    fn from_known_bits(bits: u32) -> Self {
        Self {
            strip: bits & STRIP != 0,
            map_types: bits & MAP_TYPES != 0,
            map_names: bits & MAP_NAMES != 0,
            map_funcs: bits & MAP_FUNCS != 0,
            dce_funcs: bits & DCE_FUNCS != 0,
            dce_vars: bits & DCE_VARS != 0,
            dce_types: bits & DCE_TYPES != 0,
            opt_loadstore: bits & OPT_LOADSTORE != 0,
            opt_fwd_ls: bits & OPT_FWD_LS != 0,
        }
    }

    pub fn bits(&self) -> u32 {
        [
            (self.strip, STRIP),
            (self.map_types, MAP_TYPES),
            (self.map_names, MAP_NAMES),
            (self.map_funcs, MAP_FUNCS),
            (self.dce_funcs, DCE_FUNCS),
            (self.dce_vars, DCE_VARS),
            (self.dce_types, DCE_TYPES),
            (self.opt_loadstore, OPT_LOADSTORE),
            (self.opt_fwd_ls, OPT_FWD_LS),
        ]
        .into_iter()
        .filter(|(enabled, _)| *enabled)
        .fold(0, |acc, (_, bit)| acc | bit)
    }

    /// True when any id-mapping pass is enabled.
    pub fn maps_ids(&self) -> bool {
        self.map_types || self.map_names || self.map_funcs
    }

    /// True when any dead-code pass is enabled.
    pub fn eliminates_dead_code(&self) -> bool {
        self.dce_funcs || self.dce_vars || self.dce_types
    }
}
