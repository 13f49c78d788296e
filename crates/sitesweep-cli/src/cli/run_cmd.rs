//! `sitesweep run`: dispatch one collection request.

use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use sitesweep::{
    format_found_count, Browser, CollectionRequest, CollectionResult, Dispatcher, Overrides,
    PluginRegistry,
};

use crate::cli::output::{write_json, OutputMode};
use crate::config::{resolve_headful, resolve_output_path, resolve_overrides};

/// Arguments of one `run` invocation.
#[derive(Debug, Clone)]
pub struct RunArgs {
    pub site: String,
    pub query: String,
    pub output: Option<PathBuf>,
    pub limit: Option<i64>,
    /// Timing values given as flags; environment fills the rest.
    pub overrides: Overrides,
    pub headful: bool,
}

pub async fn run(args: RunArgs, mode: OutputMode) -> Result<()> {
    let browser = build_browser(resolve_headful(args.headful));
    let dispatcher = Dispatcher::new(Arc::new(PluginRegistry::builtin()), browser)
        .with_overrides(resolve_overrides(args.overrides));

    let today = chrono::Local::now().date_naive();
    let output = resolve_output_path(args.output.as_deref(), &args.query, &args.site, today);
    let request = CollectionRequest::new(args.site, args.query, output, args.limit);

    execute(&dispatcher, &request, mode, &mut std::io::stdout()).await?;
    Ok(())
}

/// Run `request` and write the completion signal to `out`.
///
/// On success `out` receives the `FOUND_COUNT` line, followed by the
/// result as JSON when `mode.json` is set. Nothing is written on failure.
pub async fn execute<W: Write>(
    dispatcher: &Dispatcher,
    request: &CollectionRequest,
    mode: OutputMode,
    out: &mut W,
) -> Result<CollectionResult> {
    let result = dispatcher.run(request).await?;

    writeln!(out, "{}", format_found_count(result.record_count))?;
    if mode.json {
        write_json(out, &result)?;
    }
    out.flush()?;

    mode.note(format!(
        "Saved {} records to {}",
        result.record_count,
        result.output_path.display()
    ));
    Ok(result)
}

#[cfg(feature = "chromium")]
fn build_browser(headful: bool) -> Arc<dyn Browser> {
    use sitesweep::browser::chromium::{ChromiumBrowser, ChromiumOptions};

    Arc::new(ChromiumBrowser::new(ChromiumOptions {
        executable: None,
        headless: !headful,
    }))
}

#[cfg(not(feature = "chromium"))]
fn build_browser(_headful: bool) -> Arc<dyn Browser> {
    tracing::warn!("Built without Chromium support; runs will fail to launch a browser");
    Arc::new(sitesweep::NoopBrowser)
}
