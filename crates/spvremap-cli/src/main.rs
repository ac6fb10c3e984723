//! spvremap CLI: the `spvremap` command.

mod cli;
mod commands;
mod support;

use clap::Parser;
use cli::{Cli, Commands};
use tracing_subscriber::EnvFilter;

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Remap {
            inputs,
            output,
            output_dir,
            config,
            strip,
            map,
            dce,
            opt,
            json,
        } => commands::remap::run(commands::remap::Args {
            inputs,
            output,
            output_dir,
            config,
            strip,
            map,
            dce,
            opt,
            json,
        }),

        Commands::Inspect { input, json } => commands::inspect::run(input, json),
    }
}

/// `RUST_LOG` wins; otherwise `-v` raises the default from warn.
fn init_tracing(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();
}
