//! `blueprint`: discover DAG blueprints, check instance configs and write
//! Airflow DAG files.
//!
//! `main` loads `.env`, parses arguments, installs logging, loads
//! [`AppConfig`] and hands off to one command. Every failure after parsing
//! becomes a [`CliError`], which picks the exit status:
//!
//! | Code | Meaning                                  |
//! |------|------------------------------------------|
//! |  0   | Success                                  |
//! |  1   | Internal or I/O failure                  |
//! |  2   | Bad input, invalid configs, lint failure |
//! |  3   | Unknown blueprint                        |
//! |  4   | Malformed config file or app settings    |

use std::io::IsTerminal;
use std::process::ExitCode;

use clap::Parser;
use tracing::{debug, instrument};

use crate::{
    cli::{Cli, Commands},
    config::AppConfig,
    error::{CliError, CliResult},
    logging::init_logging,
    output::OutputManager,
};

mod cli;
mod commands;
mod config;
mod error;
mod logging;
mod output;

fn main() -> ExitCode {
    // A missing .env is fine.
    let _ = dotenvy::dotenv();

    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        // Also the path for --help and --version, which exit 0.
        Err(e) => {
            let _ = e.print();
            return ExitCode::from(if e.use_stderr() { 2 } else { 0 });
        }
    };

    if let Err(e) = init_logging(&cli.global) {
        eprintln!("blueprint: {e}");
        return ExitCode::from(1);
    }
    debug!(global = ?cli.global, "arguments parsed");

    let verbose = cli.global.verbose > 0;
    match AppConfig::load(cli.global.config.as_ref())
        .map_err(|e| CliError::ConfigError {
            message: format!("{e:#}"),
            source: None,
        })
        .and_then(|config| run(cli, config))
    {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => report(&err, verbose),
    }
}

#[instrument(skip_all)]
fn run(cli: Cli, config: AppConfig) -> CliResult<()> {
    let output = OutputManager::new(&cli.global, &config);
    match cli.command {
        Commands::List(args) => commands::list::execute(args, config, output),
        Commands::Describe(args) => commands::describe::execute(args, config, output),
        Commands::Schema(args) => commands::schema::execute(args, config, output),
        Commands::Lint(args) => commands::lint::execute(args, config, output),
        Commands::Render(args) => commands::render::execute(args, config, output),
        Commands::New(args) => commands::new::execute(args, cli.global, config, output),
        Commands::Init(args) => commands::init::execute(args, output),
        Commands::Completions(args) => commands::completions::execute(args),
    }
}

fn report(err: &CliError, verbose: bool) -> ExitCode {
    err.log();
    let text = if std::io::stderr().is_terminal() {
        err.format_colored(verbose)
    } else {
        err.format_plain(verbose)
    };
    eprint!("{text}");
    ExitCode::from(err.exit_code())
}
