use clap::{ArgAction, Parser, Subcommand, ValueEnum};

#[derive(Parser)]
#[command(
    name = "spvremap",
    about = "spvremap: canonicalize SPIR-V modules for better compression and deduplication",
    version
)]
pub struct Cli {
    /// Raise log verbosity (-v info, -vv debug); RUST_LOG overrides
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Remap SPIR-V modules; inputs are overwritten unless an output is given
    Remap {
        /// SPIR-V binaries to remap
        #[arg(required = true)]
        inputs: Vec<String>,

        /// Output file (single input only)
        #[arg(short, long, conflicts_with = "output_dir")]
        output: Option<String>,

        /// Directory receiving one output per input, under the input's file name
        #[arg(long)]
        output_dir: Option<String>,

        /// TOML file with a [remap] table of pass switches
        #[arg(long)]
        config: Option<String>,

        /// Debug stripping
        #[arg(long, value_enum)]
        strip: Option<StripMode>,

        /// Id remapping
        #[arg(long, value_enum)]
        map: Option<MapMode>,

        /// Dead code elimination
        #[arg(long, value_enum)]
        dce: Option<DceMode>,

        /// Load/store optimization
        #[arg(long, value_enum)]
        opt: Option<OptMode>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show header fields and instruction counts of a SPIR-V module
    Inspect {
        /// SPIR-V binary
        input: String,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum StripMode {
    All,
    None,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum MapMode {
    All,
    Types,
    Names,
    Funcs,
    None,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum DceMode {
    All,
    Types,
    Funcs,
    Vars,
    None,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OptMode {
    All,
    Loadstore,
    Fwd,
    None,
}
