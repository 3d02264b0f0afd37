//! Implementation of the `blueprint list` command.

use tracing::instrument;

use blueprint_core::application::BlueprintSummary;

use crate::{
    cli::{ListArgs, ListFormat, OutputFormat},
    config::AppConfig,
    error::CliResult,
    output::{OutputManager, table},
};

const DESCRIPTION_WIDTH: usize = 50;

#[instrument(skip_all)]
pub fn execute(args: ListArgs, config: AppConfig, output: OutputManager) -> CliResult<()> {
    let mut registry = super::registry(&config, &args.templates);
    let blueprints = registry.list()?;

    let format = if output.format() == OutputFormat::Json {
        ListFormat::Json
    } else {
        args.format
    };

    match format {
        ListFormat::Table => {
            if blueprints.is_empty() {
                let dirs: Vec<String> = registry
                    .search_directories()
                    .iter()
                    .map(|d| d.display().to_string())
                    .collect();
                output.warning(&format!("No blueprints found in {}", dirs.join(", ")))?;
                return Ok(());
            }
            output.header("Available Blueprints:")?;
            let rows: Vec<Vec<String>> = blueprints.iter().map(row).collect();
            for line in table(&["NAME", "CLASS", "DESCRIPTION", "LOCATION"], &rows) {
                output.print(&line)?;
            }
        }

        ListFormat::List => {
            for blueprint in &blueprints {
                output.data(&blueprint.name)?;
            }
        }

        // JSON must stay parseable, so it bypasses quiet mode.
        ListFormat::Json => output.json(&blueprints)?,
    }

    Ok(())
}

fn row(summary: &BlueprintSummary) -> Vec<String> {
    vec![
        summary.name.clone(),
        summary.class.clone(),
        truncate(summary.description.lines().next().unwrap_or_default()),
        summary.module.clone(),
    ]
}

fn truncate(text: &str) -> String {
    if text.chars().count() <= DESCRIPTION_WIDTH {
        return text.to_string();
    }
    let cut: String = text.chars().take(DESCRIPTION_WIDTH - 3).collect();
    format!("{}...", cut.trim_end())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn long_descriptions_are_truncated() {
        let long = "Daily ETL job that moves data between tables with configurable scheduling.";
        let short = truncate(long);
        assert!(short.ends_with("..."));
        assert!(short.chars().count() <= DESCRIPTION_WIDTH);
        assert_eq!(truncate("Says hello"), "Says hello");
    }

    #[test]
    fn row_uses_first_description_line() {
        let summary = BlueprintSummary {
            name: "daily_etl".into(),
            class: "DailyETL".into(),
            module: "team/templates/etl.toml".into(),
            description: "Moves data.\n\nMore detail.".into(),
            locations: vec!["team/templates/etl.toml".into()],
        };
        assert_eq!(
            row(&summary),
            ["daily_etl", "DailyETL", "Moves data.", "team/templates/etl.toml"]
        );
    }
}
