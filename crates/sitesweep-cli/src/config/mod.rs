//! Configuration loading and resolution.

pub mod logging;

use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use chrono::NaiveDate;
use regex::Regex;
use sitesweep::Overrides;

pub use logging::{init_logging, LogFormat, LoggingConfig};

/// Directory generated output paths are placed under.
pub const DEFAULT_OUTPUT_DIR: &str = "static";

pub const ENV_HEADFUL: &str = "SITESWEEP_HEADFUL";

fn non_word() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\W+").expect("non-word regex is valid"))
}

/// Lowercase `query` and collapse every run of non-word characters to `_`.
pub fn sanitize_query(query: &str) -> String {
    non_word()
        .replace_all(&query.trim().to_lowercase(), "_")
        .trim_matches('_')
        .to_string()
}

/// Resolve the CSV output path.
///
/// An explicit path wins. Otherwise the file goes to
/// `static/<query>_<site>_<DDMMYY>.csv`.
pub fn resolve_output_path(
    explicit: Option<&Path>,
    query: &str,
    site: &str,
    date: NaiveDate,
) -> PathBuf {
    if let Some(path) = explicit {
        return path.to_path_buf();
    }

    let stem = match sanitize_query(query) {
        s if s.is_empty() => "results".to_string(),
        s => s,
    };
    PathBuf::from(DEFAULT_OUTPUT_DIR).join(format!(
        "{stem}_{site}_{}.csv",
        date.format("%d%m%y")
    ))
}

/// Merge flag overrides over environment overrides.
pub fn resolve_overrides(flags: Overrides) -> Overrides {
    flags.or(Overrides::from_env())
}

/// Whether to show the browser window: `--headful` or `SITESWEEP_HEADFUL=1`.
pub fn resolve_headful(flag: bool) -> bool {
    flag || std::env::var(ENV_HEADFUL)
        .map(|v| matches!(v.trim(), "1" | "true" | "yes"))
        .unwrap_or(false)
}
