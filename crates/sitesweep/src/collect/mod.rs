//! The collection protocol shared by every site plugin.
//!
//! A run goes through four phases:
//! 1. build the search URL from the query (pure),
//! 2. open a session, navigate, and wait for the results container,
//! 3. scroll until the candidate count settles, hits the limit, or the
//!    round cap is reached,
//! 4. extract each candidate (capped at the limit) and write the CSV.
//!
//! A results container that never appears is an empty result, not an
//! error. The session is closed on every exit path.

pub mod extract;
pub mod stabilize;

use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;

use crate::browser::{Browser, BrowserResult, BrowserSession, Locator, ScrollTarget};
use crate::error::CollectError;
use crate::settings::Overrides;
use crate::sink;
use crate::types::{CollectOutcome, CollectionRequest, FieldSchema, Record};

pub use extract::{extract_candidates, FieldReader};
pub use stabilize::{load_until_stable, LoadReport, StopReason};

/// Static identity of a plugin.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PluginDescriptor {
    /// Registry key, e.g. `google_maps`.
    pub site: &'static str,
    /// Short human-readable description of what the plugin scrapes.
    pub description: &'static str,
    pub schema: FieldSchema,
}

/// Timeouts and loop bounds for one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Timing {
    pub navigation_timeout: Duration,
    pub results_timeout: Duration,
    pub scroll_delay: Duration,
    pub max_rounds: u32,
}

/// Where a site renders its results and how to page through them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageProfile {
    /// Element whose presence proves results rendered.
    pub results: Locator,
    /// Selector matching one element per candidate listing.
    pub candidates: &'static str,
    pub scroll: ScrollTarget,
    pub timing: Timing,
}

/// A site plugin: one URL scheme, one DOM shape, one field schema.
#[async_trait]
pub trait Collector: Send + Sync {
    fn descriptor(&self) -> &PluginDescriptor;

    /// Search URL for `query`. Must be a pure function of the query.
    fn search_url(&self, query: &str) -> String;

    fn profile(&self) -> PageProfile;

    /// Read the fields of candidate `fields.index()` into `fields`.
    ///
    /// Returning an error drops this candidate only, unless the error is fatal.
    async fn extract(
        &self,
        session: &mut dyn BrowserSession,
        fields: &mut FieldReader<'_>,
    ) -> BrowserResult<()>;

    /// Run the full protocol for `request` and write its CSV.
    async fn collect(
        &self,
        browser: &dyn Browser,
        request: &CollectionRequest,
        overrides: &Overrides,
    ) -> Result<CollectOutcome, CollectError> {
        run(self, browser, request, overrides).await
    }
}

/// Records gathered while the session was open.
struct Harvest {
    records: Vec<Record>,
    warnings: Vec<String>,
    stop: Option<StopReason>,
}

impl Harvest {
    fn empty(warning: String) -> Self {
        Self {
            records: Vec::new(),
            warnings: vec![warning],
            stop: None,
        }
    }
}

/// Drive `plugin` through all four phases.
pub async fn run<C: Collector + ?Sized>(
    plugin: &C,
    browser: &dyn Browser,
    request: &CollectionRequest,
    overrides: &Overrides,
) -> Result<CollectOutcome, CollectError> {
    let descriptor = plugin.descriptor();
    let cap = request.cap();
    tracing::info!(
        "Running {} collector for '{}' (limit: {:?})",
        descriptor.site,
        request.query,
        request.limit
    );

    if cap == Some(0) {
        tracing::info!("Limit {:?} requests nothing, skipping browser", request.limit);
        sink::write_records(&descriptor.schema, &[], &request.output_path)?;
        return Ok(CollectOutcome::default());
    }

    let mut profile = plugin.profile();
    profile.timing = overrides.apply(profile.timing);
    let url = plugin.search_url(&request.query);
    tracing::info!("Opening URL: {url}");

    let mut session = browser.open_session().await?;
    let harvest = drive(plugin, session.as_mut(), &profile, &url, cap).await;
    if let Err(e) = session.close().await {
        tracing::warn!("Failed to close browser session: {e}");
    }
    let harvest = harvest?;

    if harvest.records.is_empty() {
        tracing::warn!("No data extracted for '{}'", request.query);
    }
    let record_count =
        sink::write_records(&descriptor.schema, &harvest.records, &request.output_path)?;

    Ok(CollectOutcome {
        record_count,
        warnings: harvest.warnings,
        stop: harvest.stop,
    })
}

/// Phases 2–4 against an open session.
async fn drive<C: Collector + ?Sized>(
    plugin: &C,
    session: &mut dyn BrowserSession,
    profile: &PageProfile,
    url: &str,
    cap: Option<usize>,
) -> BrowserResult<Harvest> {
    let timing = profile.timing;

    match session.navigate(url, timing.navigation_timeout).await {
        Ok(nav) => tracing::debug!("Loaded {} in {}ms", nav.final_url, nav.load_time_ms),
        Err(e) if e.is_timeout() => {
            tracing::error!("Timeout: search page did not load: {e}");
            return Ok(Harvest::empty(format!("search page did not load: {e}")));
        }
        Err(e) => return Err(e),
    }

    tracing::info!("Waiting for results to load...");
    match session.wait_for(&profile.results, timing.results_timeout).await {
        Ok(()) => {}
        Err(e) if e.is_timeout() => {
            tracing::error!("Timeout: listing container not found");
            return Ok(Harvest::empty(format!("no results container: {e}")));
        }
        Err(e) => return Err(e),
    }

    let report = load_until_stable(
        session,
        &profile.scroll,
        profile.candidates,
        timing.scroll_delay,
        timing.max_rounds,
        cap,
    )
    .await?;

    let mut warnings = Vec::new();
    let records = extract_candidates(plugin, session, report.measured, cap, &mut warnings).await?;

    Ok(Harvest {
        records,
        warnings,
        stop: Some(report.stop),
    })
}
