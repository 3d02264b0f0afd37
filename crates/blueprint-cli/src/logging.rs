//! Tracing setup for the `blueprint` binary.
//!
//! The library crates emit events; only this module installs a subscriber.
//! Events go to stderr so stdout stays clean for generated source and JSON.
//!
//! | Flags     | Level |
//! |-----------|-------|
//! | (none)    | warn  |
//! | `-v`      | info  |
//! | `-vv`     | debug |
//! | `-vvv`    | trace |
//! | `--quiet` | error |
//!
//! A set `RUST_LOG` replaces the table. With `--output-format json` log
//! lines are JSON objects as well.

use std::io::{self, IsTerminal as _};

use tracing_subscriber::{
    EnvFilter, Layer, Registry, fmt, layer::SubscriberExt, util::SubscriberInitExt,
};

use crate::cli::{GlobalArgs, OutputFormat};

const CRATES: [&str; 3] = ["blueprint", "blueprint_core", "blueprint_adapters"];

/// Install the global subscriber. Fails if one is already set.
pub fn init_logging(args: &GlobalArgs) -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directives(derive_level(args))));

    let layer: Box<dyn Layer<Registry> + Send + Sync> = if args.output_format == OutputFormat::Json
    {
        fmt::layer()
            .json()
            .with_current_span(false)
            .with_writer(io::stderr)
            .boxed()
    } else {
        fmt::layer()
            .with_target(false)
            .with_ansi(!args.no_color && io::stderr().is_terminal())
            .with_writer(io::stderr)
            .boxed()
    };

    tracing_subscriber::registry()
        .with(layer)
        .with(filter)
        .try_init()
        .map_err(|e| anyhow::anyhow!("tracing subscriber already installed: {e}"))
}

fn default_directives(level: &str) -> String {
    CRATES
        .iter()
        .map(|krate| format!("{krate}={level}"))
        .collect::<Vec<_>>()
        .join(",")
}

/// Translate the verbosity counter + quiet flag to a level string.
fn derive_level(args: &GlobalArgs) -> &'static str {
    if args.quiet {
        return "error";
    }
    match args.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    }
}
