//! Browser abstraction for driving JavaScript-rendered result pages.
//!
//! Defines the `Browser` and `BrowserSession` traits that abstract over
//! the browser engine (Chromium via chromiumoxide, or the in-memory
//! `ScriptedBrowser` used by tests and offline validation).

#[cfg(feature = "chromium")]
pub mod chromium;
pub mod scripted;

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::BrowserError;

pub type BrowserResult<T> = Result<T, BrowserError>;

/// Result of navigating to a URL.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NavigationResult {
    /// The final URL after any redirects.
    pub final_url: String,
    /// Time taken to load the page in milliseconds.
    pub load_time_ms: u64,
}

/// Addresses one element: the `index`-th match of `selector`, optionally
/// narrowed to the first descendant matching `child`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Locator {
    pub selector: String,
    pub index: usize,
    pub child: Option<String>,
}

impl Locator {
    pub fn nth(selector: impl Into<String>, index: usize) -> Self {
        Self {
            selector: selector.into(),
            index,
            child: None,
        }
    }

    pub fn first(selector: impl Into<String>) -> Self {
        Self::nth(selector, 0)
    }

    pub fn child(mut self, child: impl Into<String>) -> Self {
        self.child = Some(child.into());
        self
    }
}

/// What a loading round scrolls.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScrollTarget {
    /// Scroll the document by its full height.
    Window,
    /// Scroll a scrollable element (e.g. a results feed) by its height.
    Element(Locator),
}

/// A browser engine that can open sessions.
#[async_trait]
pub trait Browser: Send + Sync {
    /// Open a new session. The caller owns it and must `close` it.
    async fn open_session(&self) -> BrowserResult<Box<dyn BrowserSession>>;
    /// Number of sessions opened and not yet closed.
    fn active_sessions(&self) -> usize;
}

/// One page under remote control. Calls are made strictly one at a time.
#[async_trait]
pub trait BrowserSession: Send + Sync {
    /// Navigate to a URL with a timeout.
    async fn navigate(&mut self, url: &str, timeout: Duration) -> BrowserResult<NavigationResult>;
    /// Wait until `locator` exists, failing with `BrowserError::Timeout`.
    async fn wait_for(&mut self, locator: &Locator, timeout: Duration) -> BrowserResult<()>;
    /// Scroll the target once.
    async fn scroll(&mut self, target: &ScrollTarget) -> BrowserResult<()>;
    /// Number of elements currently matching `selector`.
    async fn count(&self, selector: &str) -> BrowserResult<usize>;
    /// Read an attribute; `Ok(None)` when the element or attribute is absent.
    ///
    /// Fails with `BrowserError::Detached` when the base element at
    /// `locator.index` no longer exists.
    async fn attribute(&self, locator: &Locator, name: &str) -> BrowserResult<Option<String>>;
    /// Read rendered text; absent elements behave as in `attribute`.
    async fn text(&self, locator: &Locator) -> BrowserResult<Option<String>>;
    /// Click an element.
    async fn click(&mut self, locator: &Locator) -> BrowserResult<()>;
    /// Close this session and release the remote browser.
    async fn close(self: Box<Self>) -> BrowserResult<()>;
}

/// A browser that cannot open sessions, used when Chromium is unavailable.
pub struct NoopBrowser;

#[async_trait]
impl Browser for NoopBrowser {
    async fn open_session(&self) -> BrowserResult<Box<dyn BrowserSession>> {
        Err(BrowserError::Launch(
            "no browser available in this build".to_string(),
        ))
    }

    fn active_sessions(&self) -> usize {
        0
    }
}
