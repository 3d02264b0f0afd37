//! `blueprint completions`: shell completion scripts on stdout.

use std::io;

use clap::CommandFactory;
use clap_complete::{Generator, generate, shells};

use crate::{
    cli::{Cli, CompletionsArgs, Shell},
    error::CliResult,
};

const BIN_NAME: &str = "blueprint";

pub fn execute(args: CompletionsArgs) -> CliResult<()> {
    match args.shell {
        Shell::Bash => emit(shells::Bash),
        Shell::Zsh => emit(shells::Zsh),
        Shell::Fish => emit(shells::Fish),
        Shell::PowerShell => emit(shells::PowerShell),
        Shell::Elvish => emit(shells::Elvish),
    }
    Ok(())
}

fn emit(shell: impl Generator) {
    let mut cmd = Cli::command();
    generate(shell, &mut cmd, BIN_NAME, &mut io::stdout());
}
