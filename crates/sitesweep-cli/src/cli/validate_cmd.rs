//! `sitesweep validate`: check every built-in plugin without a real browser.
//!
//! Each plugin must pass the registry's validation contract and then an
//! offline dry run against an empty scripted page, which must produce a
//! header-only CSV and release its session.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Result};
use serde::Serialize;
use sitesweep::browser::scripted::{ScriptedBrowser, ScriptedPage};
use sitesweep::sink::read_table;
use sitesweep::{plugins, Browser, CollectionRequest, Collector, Overrides, PluginRegistry};

use crate::cli::output::{print_json, OutputMode};

/// Verdict for one plugin.
#[derive(Debug, Clone, Serialize)]
pub struct PluginCheck {
    pub site: String,
    pub description: Option<String>,
    /// `None` when the plugin passed.
    pub problem: Option<String>,
}

impl PluginCheck {
    pub fn passed(&self) -> bool {
        self.problem.is_none()
    }
}

pub async fn run(mode: OutputMode) -> Result<()> {
    let checks = check_plugins(plugins::builtin()).await;

    if mode.json {
        print_json(&checks);
    } else {
        for check in &checks {
            match (&check.problem, &check.description) {
                (None, Some(description)) => println!("{} - {description}", check.site),
                (None, None) => println!("{}", check.site),
                (Some(problem), _) => println!("{}: {problem}", check.site),
            }
        }
    }

    let failed = checks.iter().filter(|c| !c.passed()).count();
    if failed > 0 {
        bail!("{failed} plugin(s) failed validation");
    }
    Ok(())
}

/// Validate `candidates` and dry-run each one that registers.
pub async fn check_plugins(candidates: Vec<Arc<dyn Collector>>) -> Vec<PluginCheck> {
    let registry = PluginRegistry::from_plugins(candidates);
    let mut checks = Vec::new();

    for descriptor in registry.descriptors() {
        let problem = match registry.resolve(descriptor.site) {
            Ok(plugin) => dry_run(plugin.as_ref()).await.err(),
            Err(e) => Some(e.to_string()),
        };
        checks.push(PluginCheck {
            site: descriptor.site.to_string(),
            description: Some(descriptor.description.to_string()),
            problem,
        });
    }

    for rejection in registry.rejected() {
        checks.push(PluginCheck {
            site: rejection.site.clone(),
            description: None,
            problem: Some(rejection.error.to_string()),
        });
    }

    checks
}

/// Run `plugin` against a page that renders its results container but no candidates.
async fn dry_run(plugin: &dyn Collector) -> Result<(), String> {
    let descriptor = plugin.descriptor();
    let profile = plugin.profile();
    let browser = ScriptedBrowser::new(
        ScriptedPage::new(profile.candidates).ready(&profile.results.selector),
    );

    let path = std::env::temp_dir().join(format!(
        "sitesweep-validate-{}-{}.csv",
        descriptor.site,
        std::process::id()
    ));
    let request = CollectionRequest::new(descriptor.site, "validation dry run", &path, Some(1));
    let overrides = Overrides {
        scroll_delay: Some(Duration::ZERO),
        max_rounds: Some(1),
        navigation_timeout: Some(Duration::ZERO),
        results_timeout: Some(Duration::ZERO),
    };

    let outcome = plugin
        .collect(&browser, &request, &overrides)
        .await
        .map_err(|e| format!("dry run failed: {e}"));
    let table = read_table(&path).map_err(|e| format!("dry run output unreadable: {e}"));
    let _ = std::fs::remove_file(&path);

    let outcome = outcome?;
    let table = table?;
    if outcome.record_count != 0 || !table.rows.is_empty() {
        return Err(format!(
            "dry run produced {} records from an empty page",
            outcome.record_count
        ));
    }
    if table.headers != descriptor.schema.fields {
        return Err(format!(
            "dry run header {:?} does not match schema {:?}",
            table.headers, descriptor.schema.fields
        ));
    }
    if browser.active_sessions() != 0 {
        return Err("dry run left a browser session open".to_string());
    }
    Ok(())
}
