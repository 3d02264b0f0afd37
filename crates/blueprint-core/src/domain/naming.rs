//! Name derivation.
//!
//! Registry keys are derived from a blueprint's declared class identifier,
//! and generated DAG files need valid Python identifiers for task variables.

use std::sync::LazyLock;

use regex::Regex;

static ACRONYM_BOUNDARY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new("([A-Z]+)([A-Z][a-z])").expect("static acronym pattern"));

static CASE_BOUNDARY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([a-z\d])([A-Z])").expect("static case pattern"));

const PYTHON_KEYWORDS: &[&str] = &[
    "False", "None", "True", "and", "as", "assert", "async", "await", "break", "class", "continue",
    "def", "del", "elif", "else", "except", "finally", "for", "from", "global", "if", "import",
    "in", "is", "lambda", "nonlocal", "not", "or", "pass", "raise", "return", "try", "while",
    "with", "yield",
];

/// Derive the registry key for a blueprint class identifier.
///
/// Two passes run in sequence: the first splits a run of capitals from a
/// following capitalised word (`ETLJob` -> `ETL_Job`), the second splits
/// lower-to-upper boundaries. The result is lowercased.
///
/// ```
/// use blueprint_core::domain::blueprint_name;
///
/// assert_eq!(blueprint_name("DailyETLJob"), "daily_etl_job");
/// assert_eq!(blueprint_name("MultiSourceETL"), "multi_source_etl");
/// ```
pub fn blueprint_name(class_ident: &str) -> String {
    let pass_one = ACRONYM_BOUNDARY.replace_all(class_ident, "${1}_${2}");
    let pass_two = CASE_BOUNDARY.replace_all(&pass_one, "${1}_${2}");
    pass_two.to_lowercase()
}

/// Turn arbitrary text (usually a task id) into a valid Python identifier.
pub fn python_identifier(text: &str) -> String {
    let mut ident: String = text
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
        .collect();

    if ident.is_empty() {
        return "_".to_string();
    }
    if ident.starts_with(|c: char| c.is_ascii_digit()) {
        ident.insert(0, '_');
    }
    if PYTHON_KEYWORDS.contains(&ident.as_str()) {
        ident.push('_');
    }
    ident
}
