//! Everything a command prints to stdout goes through [`OutputManager`].
//!
//! Status lines (`success`, `warning`, `info`, `header`, `muted`) respect
//! `--quiet`; failures and payloads (`data`, `json`) are always written.

use std::io::{self, IsTerminal};

use console::Term;
use owo_colors::{OwoColorize, Style};
use serde::Serialize;

use crate::cli::global::{GlobalArgs, OutputFormat};
use crate::config::AppConfig;

const CHECK: &str = "\u{2713}";
const CROSS: &str = "\u{2717}";
const WARN: &str = "\u{26a0}";
const INFO: &str = "\u{2139}";

pub struct OutputManager {
    resolved_format: OutputFormat,
    quiet: bool,
    no_color: bool,
    term: Term,
}

impl OutputManager {
    /// `Auto` becomes `Human` on a terminal and `Plain` when piped; colour
    /// is only used for `Human`.
    pub fn new(args: &GlobalArgs, config: &AppConfig) -> Self {
        let resolved_format = match args.output_format {
            OutputFormat::Auto if io::stdout().is_terminal() => OutputFormat::Human,
            OutputFormat::Auto => OutputFormat::Plain,
            other => other,
        };
        Self {
            resolved_format,
            quiet: args.quiet,
            no_color: args.no_color
                || config.output.no_color
                || resolved_format != OutputFormat::Human,
            term: Term::stdout(),
        }
    }

    pub fn print(&self, msg: &str) -> io::Result<()> {
        if self.quiet {
            return Ok(());
        }
        self.term.write_line(msg)
    }

    /// Command payload: generated source, schemas, listings.
    pub fn data(&self, text: &str) -> io::Result<()> {
        self.term.write_line(text.trim_end_matches('\n'))
    }

    pub fn json<T: Serialize + ?Sized>(&self, value: &T) -> io::Result<()> {
        let text = serde_json::to_string_pretty(value).map_err(io::Error::other)?;
        self.data(&text)
    }

    pub fn success(&self, msg: &str) -> io::Result<()> {
        self.status(Some(CHECK), msg, Style::new().green())
    }

    pub fn failure(&self, msg: &str) -> io::Result<()> {
        self.term.write_line(&self.styled(Some(CROSS), msg, Style::new().red()))
    }

    pub fn warning(&self, msg: &str) -> io::Result<()> {
        self.status(Some(WARN), msg, Style::new().yellow())
    }

    pub fn info(&self, msg: &str) -> io::Result<()> {
        self.status(Some(INFO), msg, Style::new().blue())
    }

    pub fn header(&self, text: &str) -> io::Result<()> {
        self.status(None, text, Style::new().cyan().bold())
    }

    pub fn muted(&self, text: &str) -> io::Result<()> {
        self.status(None, text, Style::new().dimmed())
    }

    fn status(&self, symbol: Option<&str>, msg: &str, style: Style) -> io::Result<()> {
        if self.quiet {
            return Ok(());
        }
        self.term.write_line(&self.styled(symbol, msg, style))
    }

    fn styled(&self, symbol: Option<&str>, msg: &str, style: Style) -> String {
        match (symbol, self.no_color) {
            (Some(symbol), true) => format!("{symbol} {msg}"),
            (None, true) => msg.to_string(),
            (Some(symbol), false) => format!(
                "{} {}",
                symbol.style(style.bold()),
                msg.style(style)
            ),
            (None, false) => msg.style(style).to_string(),
        }
    }

    // ── Accessors ─────────────────────────────────────────────────────────

    pub fn supports_color(&self) -> bool {
        !self.no_color
    }

    /// Never `Auto`.
    pub fn format(&self) -> OutputFormat {
        self.resolved_format
    }
}

/// Left-aligned text table with a header row and a rule under it.
pub fn table(headers: &[&str], rows: &[Vec<String>]) -> Vec<String> {
    let mut widths: Vec<usize> = headers.iter().map(|h| console::measure_text_width(h)).collect();
    for row in rows {
        for (idx, cell) in row.iter().enumerate() {
            if let Some(width) = widths.get_mut(idx) {
                *width = (*width).max(console::measure_text_width(cell));
            }
        }
    }

    let mut lines = Vec::with_capacity(rows.len() + 2);
    lines.push(render_row(headers.iter().copied(), &widths));
    lines.push(
        widths
            .iter()
            .map(|w| "-".repeat(*w))
            .collect::<Vec<_>>()
            .join("  "),
    );
    for row in rows {
        lines.push(render_row(row.iter().map(String::as_str), &widths));
    }
    lines
}

fn render_row<'a>(cells: impl Iterator<Item = &'a str>, widths: &[usize]) -> String {
    cells
        .zip(widths)
        .map(|(cell, width)| console::pad_str(cell, *width, console::Alignment::Left, None))
        .collect::<Vec<_>>()
        .join("  ")
        .trim_end()
        .to_string()
}
