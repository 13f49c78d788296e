//! Plugin registration, validation and lookup.

use std::collections::HashSet;
use std::sync::Arc;

use url::Url;

use crate::collect::{Collector, PluginDescriptor};
use crate::error::{HarvestError, HarvestResult, ValidationError};
use crate::plugins;

/// Query used to check that a plugin builds a usable search URL.
const SAMPLE_QUERY: &str = "coffee shops";

/// A plugin that failed validation and was left out of the registry.
#[derive(Debug, Clone)]
pub struct Rejection {
    pub site: String,
    pub error: ValidationError,
}

/// Site id → plugin. Read-only once built.
pub struct PluginRegistry {
    plugins: Vec<Arc<dyn Collector>>,
    rejected: Vec<Rejection>,
}

impl PluginRegistry {
    /// Registry of every built-in plugin that passes validation.
    pub fn builtin() -> Self {
        Self::from_plugins(plugins::builtin())
    }

    /// Validate and register `candidates`. Invalid plugins are logged and skipped.
    pub fn from_plugins(candidates: impl IntoIterator<Item = Arc<dyn Collector>>) -> Self {
        let mut plugins: Vec<Arc<dyn Collector>> = Vec::new();
        let mut rejected = Vec::new();
        let mut seen = HashSet::new();

        for plugin in candidates {
            let site = plugin.descriptor().site;
            let verdict = validate(plugin.as_ref()).and_then(|()| {
                if seen.contains(site) {
                    Err(ValidationError::DuplicateSite(site.to_string()))
                } else {
                    Ok(())
                }
            });

            match verdict {
                Ok(()) => {
                    tracing::debug!("Registered plugin {site}");
                    seen.insert(site);
                    plugins.push(plugin);
                }
                Err(error) => {
                    tracing::warn!("Excluding plugin '{site}': {error}");
                    rejected.push(Rejection {
                        site: site.to_string(),
                        error,
                    });
                }
            }
        }

        Self { plugins, rejected }
    }

    /// Look up the plugin for `site`.
    pub fn resolve(&self, site: &str) -> HarvestResult<Arc<dyn Collector>> {
        self.plugins
            .iter()
            .find(|p| p.descriptor().site == site)
            .cloned()
            .ok_or_else(|| HarvestError::PluginNotFound(site.to_string()))
    }

    /// Descriptors of all registered plugins, in registration order.
    pub fn descriptors(&self) -> Vec<&PluginDescriptor> {
        self.plugins.iter().map(|p| p.descriptor()).collect()
    }

    pub fn sites(&self) -> Vec<&'static str> {
        self.plugins.iter().map(|p| p.descriptor().site).collect()
    }

    pub fn rejected(&self) -> &[Rejection] {
        &self.rejected
    }

    pub fn len(&self) -> usize {
        self.plugins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.plugins.is_empty()
    }
}

/// Check that a plugin exposes everything the dispatcher relies on.
pub fn validate(plugin: &dyn Collector) -> Result<(), ValidationError> {
    let descriptor = plugin.descriptor();

    if descriptor.site.trim().is_empty() {
        return Err(ValidationError::MissingSiteId);
    }
    if descriptor.description.trim().is_empty() {
        return Err(ValidationError::MissingDescription);
    }
    if descriptor.schema.is_empty() {
        return Err(ValidationError::EmptySchema);
    }

    let mut names = HashSet::new();
    for field in descriptor.schema.fields {
        if !names.insert(*field) {
            return Err(ValidationError::DuplicateField(field.to_string()));
        }
    }

    let url = plugin.search_url(SAMPLE_QUERY);
    match Url::parse(&url) {
        Ok(parsed) if matches!(parsed.scheme(), "http" | "https") => Ok(()),
        _ => Err(ValidationError::BadSearchUrl(url)),
    }
}
