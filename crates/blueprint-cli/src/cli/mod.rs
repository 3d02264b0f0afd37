//! Argument surface of the `blueprint` binary.
//!
//! Command handlers receive these structs as parsed; flag names and help
//! text are defined here and nowhere else.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

pub mod global;
pub use global::{GlobalArgs, OutputFormat};

#[derive(Debug, Parser)]
#[command(
    name    = "blueprint",
    bin_name = "blueprint",
    version  = env!("CARGO_PKG_VERSION"),
    author   = env!("CARGO_PKG_AUTHORS"),
    about    = "Reusable, validated DAG templates for Airflow",
    long_about = "Blueprint discovers typed DAG templates, validates YAML instance \
                  configs against their schemas and writes standalone Airflow DAG files.",
    after_help = "EXAMPLES:\n\
        \x20 blueprint list\n\
        \x20 blueprint describe daily_etl\n\
        \x20 blueprint lint\n\
        \x20 blueprint render dags/configs/customer.dag.yaml\n\
        \x20 blueprint completions bash > /usr/share/bash-completion/completions/blueprint",
    arg_required_else_help = true,
    subcommand_required    = true,
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// List available blueprints.
    #[command(
        visible_alias = "ls",
        about = "List available blueprints",
        after_help = "EXAMPLES:\n\
            \x20 blueprint list\n\
            \x20 blueprint list --template-dir ./templates --format json"
    )]
    List(ListArgs),

    /// Show parameters and an example config for one blueprint.
    #[command(
        visible_alias = "show",
        about = "Describe a blueprint",
        after_help = "EXAMPLES:\n\
            \x20 blueprint describe daily_etl"
    )]
    Describe(DescribeArgs),

    /// Print the JSON schema of a blueprint's configuration.
    #[command(
        about = "Print a blueprint's JSON schema",
        after_help = "EXAMPLES:\n\
            \x20 blueprint schema daily_etl\n\
            \x20 blueprint schema daily_etl -o schemas/daily_etl.json"
    )]
    Schema(SchemaArgs),

    /// Validate instance configs.
    #[command(
        about = "Validate *.dag.yaml configs",
        after_help = "EXAMPLES:\n\
            \x20 blueprint lint                       # every *.dag.yaml below the current directory\n\
            \x20 blueprint lint configs/customer.dag.yaml"
    )]
    Lint(LintArgs),

    /// Generate a DAG file from an instance config.
    #[command(
        about = "Render a config into a DAG file",
        after_help = "EXAMPLES:\n\
            \x20 blueprint render configs/customer.dag.yaml\n\
            \x20 blueprint render configs/customer.dag.yaml -o dags/customer.py --no-lint"
    )]
    Render(RenderArgs),

    /// Interactively create an instance config.
    #[command(
        visible_alias = "n",
        about = "Create a new DAG config interactively",
        after_help = "EXAMPLES:\n\
            \x20 blueprint new\n\
            \x20 blueprint new --blueprint daily_etl --output-dir configs"
    )]
    New(NewArgs),

    /// Create a project configuration and an example manifest.
    #[command(
        about = "Initialise a project",
        after_help = "EXAMPLES:\n\
            \x20 blueprint init\n\
            \x20 blueprint init --force"
    )]
    Init(InitArgs),

    /// Arguments for `blueprint completions`.
    #[command(
        about = "Generate shell completions",
        after_help = "EXAMPLES:\n\
            \x20 blueprint completions bash > ~/.local/share/bash-completion/completions/blueprint\n\
            \x20 blueprint completions zsh  > ~/.zfunc/_blueprint\n\
            \x20 blueprint completions fish > ~/.config/fish/completions/blueprint.fish"
    )]
    Completions(CompletionsArgs),
}

/// Search-directory override shared by the registry-backed commands.
#[derive(Debug, Clone, Default, Args)]
pub struct TemplateDirArgs {
    /// Search only these directories (repeatable).
    #[arg(
        long = "template-dir",
        value_name = "DIR",
        help = "Blueprint directory to search (repeatable; replaces the default search path)"
    )]
    pub template_dirs: Vec<PathBuf>,
}

/// Arguments for `blueprint list`.
#[derive(Debug, Args)]
pub struct ListArgs {
    #[command(flatten)]
    pub templates: TemplateDirArgs,

    /// Output format.
    #[arg(
        long = "format",
        value_enum,
        default_value = "table",
        help = "Output format"
    )]
    pub format: ListFormat,
}

/// How `blueprint list` prints the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ListFormat {
    /// Aligned columns with a header row.
    Table,
    /// Bare registry names, newline separated.
    List,
    /// JSON array.
    Json,
}

/// Arguments for `blueprint describe`.
#[derive(Debug, Args)]
pub struct DescribeArgs {
    /// Blueprint name, e.g. `daily_etl`.
    #[arg(value_name = "NAME")]
    pub name: String,

    #[command(flatten)]
    pub templates: TemplateDirArgs,
}

/// Arguments for `blueprint schema`.
#[derive(Debug, Args)]
pub struct SchemaArgs {
    /// Blueprint name, e.g. `daily_etl`.
    #[arg(value_name = "NAME")]
    pub name: String,

    /// Write the schema to a file instead of stdout.
    #[arg(short = 'o', long = "output", value_name = "FILE")]
    pub output: Option<PathBuf>,

    #[command(flatten)]
    pub templates: TemplateDirArgs,
}

/// Arguments for `blueprint lint`.
#[derive(Debug, Args)]
pub struct LintArgs {
    /// A config file, or a directory to search for `*.dag.yaml`.
    /// Defaults to the current directory.
    #[arg(value_name = "PATH")]
    pub path: Option<PathBuf>,

    #[command(flatten)]
    pub templates: TemplateDirArgs,
}

/// Arguments for `blueprint render`.
#[derive(Debug, Args)]
pub struct RenderArgs {
    /// Instance config to render.
    #[arg(value_name = "CONFIG")]
    pub config: PathBuf,

    /// Output file. Defaults to `<dags_folder>/<dag_id>.py`.
    #[arg(short = 'o', long = "output", value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// How the source text is produced.
    #[arg(long = "strategy", value_enum, default_value = "graph")]
    pub strategy: Strategy,

    /// Skip running the linter on the generated file.
    #[arg(long = "no-lint", help = "Do not lint the generated file")]
    pub no_lint: bool,

    /// Override a config value (repeatable). Values are parsed as YAML
    /// scalars, so `retries=3` is an integer.
    #[arg(long = "set", value_name = "KEY=VALUE", value_parser = parse_key_value)]
    pub overrides: Vec<(String, String)>,

    /// Print the generated source instead of writing it.
    #[arg(long = "dry-run", help = "Print the DAG source without writing it")]
    pub dry_run: bool,

    #[command(flatten)]
    pub templates: TemplateDirArgs,
}

fn parse_key_value(raw: &str) -> Result<(String, String), String> {
    match raw.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() => {
            Ok((key.trim().to_string(), value.to_string()))
        }
        _ => Err(format!("expected KEY=VALUE, got '{raw}'")),
    }
}

/// Rendering strategy for `blueprint render`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Strategy {
    /// Render a graph and serialize it.
    Graph,
    /// Use the blueprint's own source template.
    Template,
}

/// Arguments for `blueprint new`.
#[derive(Debug, Args)]
pub struct NewArgs {
    /// Skip the blueprint picker.
    #[arg(short = 'b', long = "blueprint", value_name = "NAME")]
    pub blueprint: Option<String>,

    /// Directory the config is written to. Defaults to `output.configs_dir`
    /// from the config file, else the current directory.
    #[arg(short = 'o', long = "output-dir", value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// Replace a config file that already exists.
    #[arg(long = "force", help = "Overwrite an existing config")]
    pub force: bool,

    #[command(flatten)]
    pub templates: TemplateDirArgs,
}

/// Arguments for `blueprint init`.
#[derive(Debug, Args)]
pub struct InitArgs {
    /// Overwrite existing files.
    #[arg(short = 'f', long = "force", help = "Overwrite existing files")]
    pub force: bool,
}

/// Arguments for `blueprint completions`.
#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Target shell.
    #[arg(value_enum, help = "Target shell")]
    pub shell: Shell,
}

/// Shells `clap_complete` can target.
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum Shell {
    Bash,
    Zsh,
    Fish,
    PowerShell,
    Elvish,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn command_definitions_are_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parse_render_with_options() {
        let cli = Cli::try_parse_from([
            "blueprint",
            "render",
            "configs/etl.dag.yaml",
            "-o",
            "out.py",
            "--strategy",
            "template",
            "--no-lint",
        ])
        .unwrap();
        let Commands::Render(args) = cli.command else {
            panic!("expected render");
        };
        assert_eq!(args.config, PathBuf::from("configs/etl.dag.yaml"));
        assert_eq!(args.output, Some(PathBuf::from("out.py")));
        assert_eq!(args.strategy, Strategy::Template);
        assert!(args.no_lint);
        assert!(!args.dry_run);
    }

    #[test]
    fn set_takes_key_value_pairs() {
        let cli = Cli::try_parse_from([
            "blueprint",
            "render",
            "etl.dag.yaml",
            "--set",
            "retries=3",
            "--set",
            "job_id=a=b",
        ])
        .unwrap();
        let Commands::Render(args) = cli.command else {
            panic!("expected render");
        };
        assert_eq!(
            args.overrides,
            [
                ("retries".to_string(), "3".to_string()),
                ("job_id".to_string(), "a=b".to_string())
            ]
        );
        assert!(Cli::try_parse_from(["blueprint", "render", "x", "--set", "novalue"]).is_err());
    }

    #[test]
    fn template_dir_is_repeatable() {
        let cli = Cli::try_parse_from([
            "blueprint",
            "list",
            "--template-dir",
            "a",
            "--template-dir",
            "b",
            "--format",
            "json",
        ])
        .unwrap();
        let Commands::List(args) = cli.command else {
            panic!("expected list");
        };
        assert_eq!(
            args.templates.template_dirs,
            [PathBuf::from("a"), PathBuf::from("b")]
        );
        assert_eq!(args.format, ListFormat::Json);
    }

    #[test]
    fn global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["blueprint", "lint", "-vv", "--no-color"]).unwrap();
        assert_eq!(cli.global.verbose, 2);
        assert!(cli.global.no_color);
    }

    #[test]
    fn quiet_conflicts_with_verbose() {
        assert!(Cli::try_parse_from(["blueprint", "-q", "-v", "list"]).is_err());
    }

    #[test]
    fn describe_requires_name() {
        assert!(Cli::try_parse_from(["blueprint", "describe"]).is_err());
    }
}
