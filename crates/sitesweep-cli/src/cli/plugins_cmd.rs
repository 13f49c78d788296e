//! `sitesweep plugins`: list registered sites.

use anyhow::Result;
use serde_json::json;
use sitesweep::PluginRegistry;

use crate::cli::output::{print_json, OutputMode};

pub fn run(mode: OutputMode) -> Result<()> {
    let registry = PluginRegistry::builtin();

    if mode.json {
        let items: Vec<serde_json::Value> = registry
            .descriptors()
            .iter()
            .map(|d| {
                json!({
                    "site": d.site,
                    "description": d.description,
                    "fields": d.schema.fields,
                    "placeholder": d.schema.placeholder,
                })
            })
            .collect();
        print_json(&json!({ "total": items.len(), "plugins": items }));
        return Ok(());
    }

    if registry.is_empty() {
        mode.note("No plugins registered.");
        return Ok(());
    }

    for d in registry.descriptors() {
        println!("{} - {}", d.site, d.description);
        println!("    fields: {}", d.schema.fields.join(", "));
    }
    Ok(())
}
