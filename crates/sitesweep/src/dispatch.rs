//! Request dispatch: resolve a plugin, run it, and report the result.

use std::sync::Arc;
use std::time::Instant;

use crate::browser::Browser;
use crate::error::{HarvestError, HarvestResult};
use crate::registry::PluginRegistry;
use crate::settings::Overrides;
use crate::types::{CollectionRequest, CollectionResult};

/// Routes collection requests to registered plugins.
pub struct Dispatcher {
    registry: Arc<PluginRegistry>,
    browser: Arc<dyn Browser>,
    overrides: Overrides,
}

impl Dispatcher {
    pub fn new(registry: Arc<PluginRegistry>, browser: Arc<dyn Browser>) -> Self {
        Self {
            registry,
            browser,
            overrides: Overrides::default(),
        }
    }

    pub fn with_overrides(mut self, overrides: Overrides) -> Self {
        self.overrides = overrides;
        self
    }

    pub fn registry(&self) -> &PluginRegistry {
        &self.registry
    }

    /// Run one request to completion.
    ///
    /// The plugin is resolved before any browser work starts, so an unknown
    /// site leaves no output file behind. The returned count is whatever the
    /// plugin wrote; a count below the limit is still a success.
    pub async fn run(&self, request: &CollectionRequest) -> HarvestResult<CollectionResult> {
        if request.query.trim().is_empty() {
            return Err(HarvestError::InvalidRequest("query must not be empty".into()));
        }

        let plugin = self.registry.resolve(&request.site)?;
        let started = Instant::now();

        let outcome = plugin
            .collect(self.browser.as_ref(), request, &self.overrides)
            .await
            .map_err(|source| {
                tracing::error!("Collector '{}' failed: {source}", request.site);
                HarvestError::CollectionFailed {
                    site: request.site.clone(),
                    source,
                }
            })?;

        let mut warnings = outcome.warnings;
        if let Some(limit) = request.cap() {
            if outcome.record_count < limit {
                let notice = format!(
                    "collected {} of {} requested records",
                    outcome.record_count, limit
                );
                tracing::info!("{notice}");
                warnings.push(notice);
            }
        }

        let elapsed_ms = started.elapsed().as_millis() as u64;
        tracing::info!(
            "Collected {} records for '{}' into {} in {}ms",
            outcome.record_count,
            request.query,
            request.output_path.display(),
            elapsed_ms
        );

        Ok(CollectionResult {
            site: request.site.clone(),
            record_count: outcome.record_count,
            output_path: request.output_path.clone(),
            warnings,
            stop: outcome.stop,
            elapsed_ms,
        })
    }
}
