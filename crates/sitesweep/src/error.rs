//! Error types for browser sessions, the record sink, plugins and dispatch.

use std::path::PathBuf;

/// Failures raised by a browser session.
#[derive(thiserror::Error, Debug)]
pub enum BrowserError {
    #[error("browser launch failed: {0}")]
    Launch(String),

    #[error("navigation failed: {0}")]
    Navigation(String),

    #[error("timed out after {timeout_ms}ms waiting for {what}")]
    Timeout { what: String, timeout_ms: u64 },

    /// The element at `index` of `selector` is no longer in the DOM.
    #[error("element {index} of '{selector}' is detached")]
    Detached { selector: String, index: usize },

    #[error("script evaluation failed: {0}")]
    Script(String),

    #[error("browser disconnected: {0}")]
    Disconnected(String),
}

impl BrowserError {
    /// Protocol-level failures that no plugin can recover from.
    pub fn is_fatal(&self) -> bool {
        matches!(self, BrowserError::Launch(_) | BrowserError::Disconnected(_))
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, BrowserError::Timeout { .. })
    }
}

/// Failures while persisting records.
#[derive(thiserror::Error, Debug)]
pub enum SinkError {
    #[error("failed to write {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

/// An error escaping a plugin after its own recovery is exhausted.
#[derive(thiserror::Error, Debug)]
pub enum CollectError {
    #[error(transparent)]
    Browser(#[from] BrowserError),

    #[error(transparent)]
    Sink(#[from] SinkError),
}

/// Errors surfaced by the dispatcher to its caller.
#[derive(thiserror::Error, Debug)]
pub enum HarvestError {
    #[error("no plugin registered for site '{0}'")]
    PluginNotFound(String),

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("collection failed for '{site}': {source}")]
    CollectionFailed {
        site: String,
        #[source]
        source: CollectError,
    },
}

/// Why a plugin was rejected by the registry.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("missing required element: site id")]
    MissingSiteId,

    #[error("missing required element: description")]
    MissingDescription,

    #[error("missing required element: field schema")]
    EmptySchema,

    #[error("duplicate field '{0}' in schema")]
    DuplicateField(String),

    #[error("search URL '{0}' is not an absolute http(s) URL")]
    BadSearchUrl(String),

    #[error("site id '{0}' is already registered")]
    DuplicateSite(String),
}

pub type HarvestResult<T> = Result<T, HarvestError>;
