//! In-memory browser that replays a scripted results page.
//!
//! Used by tests and by offline plugin validation. A `ScriptedPage`
//! describes the candidate elements, how many become visible per scroll,
//! which selectors are ready, and where failures should be injected.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use super::{Browser, BrowserResult, BrowserSession, Locator, NavigationResult, ScrollTarget};
use crate::error::BrowserError;

/// One candidate element on a scripted page.
#[derive(Debug, Clone, Default)]
pub struct ScriptedElement {
    /// Attributes keyed by `(child selector, attribute)`; `None` is the element itself.
    attrs: HashMap<(Option<String>, String), String>,
    texts: HashMap<Option<String>, String>,
    /// Page-level selector text shown after this element is clicked.
    detail: HashMap<String, String>,
    /// Page-level reads after a click that still see the previous pane.
    detail_lag: usize,
    /// Keys (`attr:<name>`, `text`, or a child selector) whose reads fail.
    broken: HashSet<String>,
    detached: bool,
}

impl ScriptedElement {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn attr(mut self, name: &str, value: &str) -> Self {
        self.attrs.insert((None, name.to_string()), value.to_string());
        self
    }

    pub fn child_attr(mut self, child: &str, name: &str, value: &str) -> Self {
        self.attrs
            .insert((Some(child.to_string()), name.to_string()), value.to_string());
        self
    }

    pub fn text(mut self, value: &str) -> Self {
        self.texts.insert(None, value.to_string());
        self
    }

    pub fn child_text(mut self, child: &str, value: &str) -> Self {
        self.texts.insert(Some(child.to_string()), value.to_string());
        self
    }

    /// Text of a page-level selector once this element has been clicked.
    pub fn detail(mut self, selector: &str, value: &str) -> Self {
        self.detail.insert(selector.to_string(), value.to_string());
        self
    }

    /// Keep showing the previously clicked element's detail pane for the
    /// next `reads` page-level reads after this element is clicked.
    pub fn detail_lag(mut self, reads: usize) -> Self {
        self.detail_lag = reads;
        self
    }

    /// Make reads of `key` fail with a script error.
    pub fn broken(mut self, key: &str) -> Self {
        self.broken.insert(key.to_string());
        self
    }

    /// Make every access to this element fail as detached.
    pub fn detached(mut self) -> Self {
        self.detached = true;
        self
    }
}

/// A scripted results page.
#[derive(Debug, Clone)]
pub struct ScriptedPage {
    candidate_selector: String,
    elements: Vec<ScriptedElement>,
    initially_visible: usize,
    per_scroll: usize,
    ready: HashSet<String>,
    disconnect_after_scrolls: Option<usize>,
}

impl ScriptedPage {
    /// A page whose candidates match `candidate_selector`. Nothing is ready
    /// and nothing is visible until configured.
    pub fn new(candidate_selector: &str) -> Self {
        Self {
            candidate_selector: candidate_selector.to_string(),
            elements: Vec::new(),
            initially_visible: 0,
            per_scroll: 0,
            ready: HashSet::new(),
            disconnect_after_scrolls: None,
        }
    }

    pub fn element(mut self, element: ScriptedElement) -> Self {
        self.elements.push(element);
        self
    }

    pub fn elements(mut self, elements: impl IntoIterator<Item = ScriptedElement>) -> Self {
        self.elements.extend(elements);
        self
    }

    /// Visible candidates before the first scroll, and how many each scroll reveals.
    pub fn reveal(mut self, initially: usize, per_scroll: usize) -> Self {
        self.initially_visible = initially;
        self.per_scroll = per_scroll;
        self
    }

    /// Mark a selector as present so `wait_for` succeeds on it.
    pub fn ready(mut self, selector: &str) -> Self {
        self.ready.insert(selector.to_string());
        self
    }

    /// Every browser call after this many scrolls fails as disconnected.
    pub fn disconnect_after_scrolls(mut self, scrolls: usize) -> Self {
        self.disconnect_after_scrolls = Some(scrolls);
        self
    }
}

/// What a scripted session observed, for assertions.
#[derive(Debug, Clone, Default)]
pub struct SessionLog {
    pub visited: Vec<String>,
    pub scrolls: usize,
    pub clicks: Vec<usize>,
    pub closed: bool,
}

/// Browser that serves one `ScriptedPage` to every session.
pub struct ScriptedBrowser {
    page: ScriptedPage,
    active: Arc<AtomicUsize>,
    opened: AtomicUsize,
    log: Arc<Mutex<SessionLog>>,
}

impl ScriptedBrowser {
    pub fn new(page: ScriptedPage) -> Self {
        Self {
            page,
            active: Arc::new(AtomicUsize::new(0)),
            opened: AtomicUsize::new(0),
            log: Arc::new(Mutex::new(SessionLog::default())),
        }
    }

    /// Total sessions ever opened.
    pub fn sessions_opened(&self) -> usize {
        self.opened.load(Ordering::Relaxed)
    }

    /// Snapshot of the most recent session's log.
    pub fn log(&self) -> SessionLog {
        self.log.lock().map(|l| l.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl Browser for ScriptedBrowser {
    async fn open_session(&self) -> BrowserResult<Box<dyn BrowserSession>> {
        self.active.fetch_add(1, Ordering::Relaxed);
        self.opened.fetch_add(1, Ordering::Relaxed);
        if let Ok(mut log) = self.log.lock() {
            *log = SessionLog::default();
        }
        Ok(Box::new(ScriptedSession {
            page: self.page.clone(),
            visible: self.page.initially_visible.min(self.page.elements.len()),
            clicked: None,
            previous: None,
            lag: AtomicUsize::new(0),
            active: Arc::clone(&self.active),
            log: Arc::clone(&self.log),
        }))
    }

    fn active_sessions(&self) -> usize {
        self.active.load(Ordering::Relaxed)
    }
}

struct ScriptedSession {
    page: ScriptedPage,
    visible: usize,
    clicked: Option<usize>,
    /// Element whose detail pane is still rendered while `lag` is non-zero.
    previous: Option<usize>,
    lag: AtomicUsize,
    active: Arc<AtomicUsize>,
    log: Arc<Mutex<SessionLog>>,
}

impl ScriptedSession {
    fn record(&self, f: impl FnOnce(&mut SessionLog)) {
        if let Ok(mut log) = self.log.lock() {
            f(&mut log);
        }
    }

    fn check_connected(&self) -> BrowserResult<()> {
        let scrolls = self.log.lock().map(|l| l.scrolls).unwrap_or(0);
        match self.page.disconnect_after_scrolls {
            Some(limit) if scrolls >= limit => Err(BrowserError::Disconnected(
                "scripted connection dropped".to_string(),
            )),
            _ => Ok(()),
        }
    }

    /// Resolve a candidate locator to its element, honouring visibility.
    fn candidate(&self, locator: &Locator) -> BrowserResult<&ScriptedElement> {
        let detached = || BrowserError::Detached {
            selector: locator.selector.clone(),
            index: locator.index,
        };
        if locator.index >= self.visible {
            return Err(detached());
        }
        let element = self.page.elements.get(locator.index).ok_or_else(detached)?;
        if element.detached {
            return Err(detached());
        }
        Ok(element)
    }

    fn is_candidate(&self, locator: &Locator) -> bool {
        locator.selector == self.page.candidate_selector
    }

    /// Index of the element whose detail pane is currently rendered.
    fn shown(&self) -> Option<usize> {
        let stale = self
            .lag
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |n| n.checked_sub(1))
            .is_ok();
        if stale {
            self.previous
        } else {
            self.clicked
        }
    }

    /// Text of a page-level selector from the rendered detail pane.
    fn detail_text(&self, selector: &str) -> Option<String> {
        let element = self.page.elements.get(self.shown()?)?;
        element.detail.get(selector).cloned()
    }

    /// A page-level read of a selector the rendered pane does not contain.
    fn page_detached(locator: &Locator) -> BrowserError {
        BrowserError::Detached {
            selector: locator.selector.clone(),
            index: locator.index,
        }
    }

    fn broken(element: &ScriptedElement, key: &str) -> BrowserResult<()> {
        if element.broken.contains(key) {
            return Err(BrowserError::Script(format!("scripted failure reading {key}")));
        }
        Ok(())
    }
}

#[async_trait]
impl BrowserSession for ScriptedSession {
    async fn navigate(&mut self, url: &str, _timeout: Duration) -> BrowserResult<NavigationResult> {
        self.record(|log| log.visited.push(url.to_string()));
        Ok(NavigationResult {
            final_url: url.to_string(),
            load_time_ms: 0,
        })
    }

    async fn wait_for(&mut self, locator: &Locator, timeout: Duration) -> BrowserResult<()> {
        self.check_connected()?;
        let present = self.page.ready.contains(&locator.selector)
            || (self.is_candidate(locator) && locator.index < self.visible);
        if present {
            Ok(())
        } else {
            Err(BrowserError::Timeout {
                what: format!("'{}' [{}]", locator.selector, locator.index),
                timeout_ms: timeout.as_millis() as u64,
            })
        }
    }

    async fn scroll(&mut self, _target: &ScrollTarget) -> BrowserResult<()> {
        self.check_connected()?;
        self.visible = (self.visible + self.page.per_scroll).min(self.page.elements.len());
        self.record(|log| log.scrolls += 1);
        Ok(())
    }

    async fn count(&self, selector: &str) -> BrowserResult<usize> {
        self.check_connected()?;
        if selector == self.page.candidate_selector {
            Ok(self.visible)
        } else {
            Ok(usize::from(self.detail_text(selector).is_some()))
        }
    }

    async fn attribute(&self, locator: &Locator, name: &str) -> BrowserResult<Option<String>> {
        self.check_connected()?;
        if !self.is_candidate(locator) {
            // Detail entries carry text only; the element exists but has no attributes.
            return match self.detail_text(&locator.selector) {
                Some(_) => Ok(None),
                None => Err(Self::page_detached(locator)),
            };
        }
        let element = self.candidate(locator)?;
        Self::broken(element, &format!("attr:{name}"))?;
        if let Some(child) = &locator.child {
            Self::broken(element, child)?;
        }
        Ok(element
            .attrs
            .get(&(locator.child.clone(), name.to_string()))
            .cloned())
    }

    async fn text(&self, locator: &Locator) -> BrowserResult<Option<String>> {
        self.check_connected()?;
        if !self.is_candidate(locator) {
            return self
                .detail_text(&locator.selector)
                .map(Some)
                .ok_or_else(|| Self::page_detached(locator));
        }
        let element = self.candidate(locator)?;
        match &locator.child {
            Some(child) => Self::broken(element, child)?,
            None => Self::broken(element, "text")?,
        }
        Ok(element.texts.get(&locator.child).cloned())
    }

    async fn click(&mut self, locator: &Locator) -> BrowserResult<()> {
        self.check_connected()?;
        let lag = self.candidate(locator)?.detail_lag;
        self.previous = self.clicked;
        self.clicked = Some(locator.index);
        *self.lag.get_mut() = lag;
        self.record(|log| log.clicks.push(locator.index));
        Ok(())
    }

    async fn close(self: Box<Self>) -> BrowserResult<()> {
        self.active.fetch_sub(1, Ordering::Relaxed);
        self.record(|log| log.closed = true);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page() -> ScriptedPage {
        ScriptedPage::new("li.card")
            .ready("ul.results")
            .reveal(1, 2)
            .elements((0..4).map(|i| ScriptedElement::new().attr("href", &format!("/{i}"))))
    }

    #[tokio::test]
    async fn test_scroll_reveals_until_exhausted() {
        let browser = ScriptedBrowser::new(page());
        let mut session = browser.open_session().await.unwrap();

        assert_eq!(session.count("li.card").await.unwrap(), 1);
        session.scroll(&ScrollTarget::Window).await.unwrap();
        assert_eq!(session.count("li.card").await.unwrap(), 3);
        session.scroll(&ScrollTarget::Window).await.unwrap();
        session.scroll(&ScrollTarget::Window).await.unwrap();
        assert_eq!(session.count("li.card").await.unwrap(), 4);

        session.close().await.unwrap();
        assert_eq!(browser.active_sessions(), 0);
        assert_eq!(browser.log().scrolls, 3);
    }

    #[tokio::test]
    async fn test_hidden_candidates_read_as_detached() {
        let browser = ScriptedBrowser::new(page());
        let session = browser.open_session().await.unwrap();

        let first = session.attribute(&Locator::first("li.card"), "href").await.unwrap();
        assert_eq!(first.as_deref(), Some("/0"));
        let hidden = session.attribute(&Locator::nth("li.card", 2), "href").await;
        assert!(matches!(hidden, Err(BrowserError::Detached { index: 2, .. })));

        session.close().await.unwrap();
    }

    #[tokio::test]
    async fn test_wait_for_times_out_on_unready_selector() {
        let browser = ScriptedBrowser::new(page());
        let mut session = browser.open_session().await.unwrap();

        assert!(session
            .wait_for(&Locator::nth("ul.results", 1), Duration::from_millis(5))
            .await
            .is_ok());
        let err = session
            .wait_for(&Locator::first("div.missing"), Duration::from_millis(5))
            .await
            .unwrap_err();
        assert!(err.is_timeout());

        session.close().await.unwrap();
    }

    #[tokio::test]
    async fn test_absent_page_element_reads_as_detached() {
        let page = ScriptedPage::new("li.card").reveal(1, 0).element(
            ScriptedElement::new().detail("span.address", "1 Lane"),
        );
        let browser = ScriptedBrowser::new(page);
        let mut session = browser.open_session().await.unwrap();

        session.click(&Locator::first("li.card")).await.unwrap();
        let address = session.text(&Locator::first("span.address")).await.unwrap();
        assert_eq!(address.as_deref(), Some("1 Lane"));
        let rating = session.text(&Locator::first("span.rating")).await;
        assert!(matches!(
            rating,
            Err(BrowserError::Detached { ref selector, index: 0 }) if selector == "span.rating"
        ));
        let label = session
            .attribute(&Locator::first("span.rating"), "aria-label")
            .await;
        assert!(matches!(label, Err(BrowserError::Detached { .. })));

        session.close().await.unwrap();
    }

    #[tokio::test]
    async fn test_lagging_pane_shows_previous_detail() {
        let page = ScriptedPage::new("li.card").reveal(2, 0).elements([
            ScriptedElement::new().detail("h1", "First"),
            ScriptedElement::new().detail("h1", "Second").detail_lag(2),
        ]);
        let browser = ScriptedBrowser::new(page);
        let mut session = browser.open_session().await.unwrap();
        let title = Locator::first("h1");

        session.click(&Locator::nth("li.card", 0)).await.unwrap();
        assert_eq!(session.text(&title).await.unwrap().as_deref(), Some("First"));
        session.click(&Locator::nth("li.card", 1)).await.unwrap();
        assert_eq!(session.text(&title).await.unwrap().as_deref(), Some("First"));
        assert_eq!(session.text(&title).await.unwrap().as_deref(), Some("First"));
        assert_eq!(session.text(&title).await.unwrap().as_deref(), Some("Second"));

        session.close().await.unwrap();
    }
}
