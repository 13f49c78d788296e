//! Chromium-backed browser using chromiumoxide.
//!
//! Each session launches its own headless Chromium process so a run owns
//! its browser outright and closing the session tears the process down.

use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use chromiumoxide::browser::{Browser as CdpBrowser, BrowserConfig};
use chromiumoxide::error::CdpError;
use chromiumoxide::page::Page;
use futures::StreamExt;
use serde::Deserialize;
use serde_json::Value;
use tokio::task::JoinHandle;

use super::{Browser, BrowserResult, BrowserSession, Locator, NavigationResult, ScrollTarget};
use crate::error::BrowserError;

/// How often `wait_for` re-checks the DOM.
const POLL_INTERVAL: Duration = Duration::from_millis(250);

/// How long one CDP command may go unanswered.
const CDP_REQUEST_TIMEOUT_MS: u64 = 30_000;

/// Find the Chromium binary path.
pub fn find_chromium() -> Option<PathBuf> {
    // 1. SITESWEEP_CHROMIUM_PATH env
    if let Ok(p) = std::env::var("SITESWEEP_CHROMIUM_PATH") {
        let path = PathBuf::from(&p);
        if path.exists() {
            return Some(path);
        }
        tracing::warn!("SITESWEEP_CHROMIUM_PATH points to a missing file: {p}");
    }

    // 2. ~/.sitesweep/chromium/
    if let Some(home) = dirs::home_dir() {
        let candidates = if cfg!(target_os = "macos") {
            vec![
                home.join(".sitesweep/chromium/chrome-mac-arm64/Google Chrome for Testing.app/Contents/MacOS/Google Chrome for Testing"),
                home.join(".sitesweep/chromium/chrome-mac-x64/Google Chrome for Testing.app/Contents/MacOS/Google Chrome for Testing"),
                home.join(".sitesweep/chromium/chrome"),
            ]
        } else {
            vec![
                home.join(".sitesweep/chromium/chrome-linux64/chrome"),
                home.join(".sitesweep/chromium/chrome"),
            ]
        };
        if let Some(found) = candidates.into_iter().find(|c| c.exists()) {
            return Some(found);
        }
    }

    // 3. System PATH
    for name in ["google-chrome", "chromium", "chromium-browser"] {
        if let Ok(path) = which::which(name) {
            return Some(path);
        }
    }

    // 4. Common macOS location
    if cfg!(target_os = "macos") {
        let common =
            PathBuf::from("/Applications/Google Chrome.app/Contents/MacOS/Google Chrome");
        if common.exists() {
            return Some(common);
        }
    }

    None
}

/// Launch options for Chromium sessions.
#[derive(Debug, Clone)]
pub struct ChromiumOptions {
    pub executable: Option<PathBuf>,
    pub headless: bool,
}

impl Default for ChromiumOptions {
    fn default() -> Self {
        Self {
            executable: None,
            headless: true,
        }
    }
}

/// Chromium-based browser.
pub struct ChromiumBrowser {
    options: ChromiumOptions,
    active_count: Arc<AtomicUsize>,
}

impl ChromiumBrowser {
    pub fn new(options: ChromiumOptions) -> Self {
        Self {
            options,
            active_count: Arc::new(AtomicUsize::new(0)),
        }
    }

    fn launch_config(&self) -> BrowserResult<BrowserConfig> {
        let chrome_path = match &self.options.executable {
            Some(path) => path.clone(),
            None => find_chromium().ok_or_else(|| {
                BrowserError::Launch(
                    "Chromium not found. Set SITESWEEP_CHROMIUM_PATH or install Chrome."
                        .to_string(),
                )
            })?,
        };

        let mut builder = BrowserConfig::builder()
            .chrome_executable(chrome_path)
            .request_timeout(Duration::from_millis(CDP_REQUEST_TIMEOUT_MS))
            .arg("--disable-gpu")
            .arg("--no-sandbox")
            .arg("--disable-dev-shm-usage")
            .arg("--disable-extensions")
            .arg("--disable-blink-features=AutomationControlled");
        builder = if self.options.headless {
            builder.arg("--headless=new")
        } else {
            builder.with_head()
        };

        builder
            .build()
            .map_err(|e| BrowserError::Launch(format!("failed to build browser config: {e}")))
    }
}

#[async_trait]
impl Browser for ChromiumBrowser {
    async fn open_session(&self) -> BrowserResult<Box<dyn BrowserSession>> {
        let config = self.launch_config()?;

        let (browser, mut handler) = CdpBrowser::launch(config)
            .await
            .map_err(|e| BrowserError::Launch(format!("failed to launch Chromium: {e}")))?;

        // The CDP handler must be polled for any page call to complete.
        let handler_task = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if event.is_err() {
                    break;
                }
            }
        });

        let page = match browser.new_page("about:blank").await {
            Ok(page) => page,
            Err(e) => {
                handler_task.abort();
                return Err(BrowserError::Launch(format!("failed to create page: {e}")));
            }
        };

        self.active_count.fetch_add(1, Ordering::Relaxed);
        tracing::debug!("Chromium session opened");

        Ok(Box::new(ChromiumSession {
            browser,
            page,
            handler_task,
            active_count: Arc::clone(&self.active_count),
        }))
    }

    fn active_sessions(&self) -> usize {
        self.active_count.load(Ordering::Relaxed)
    }
}

/// A single Chromium process with one page.
pub struct ChromiumSession {
    browser: CdpBrowser,
    page: Page,
    handler_task: JoinHandle<()>,
    active_count: Arc<AtomicUsize>,
}

/// Shape returned by every element read script.
#[derive(Debug, Deserialize)]
struct ElementRead {
    #[serde(default)]
    detached: bool,
    #[serde(default)]
    value: Value,
}

fn classify(err: CdpError) -> BrowserError {
    match err {
        CdpError::Ws(_) | CdpError::ChannelSendError(_) | CdpError::NoResponse => {
            BrowserError::Disconnected(err.to_string())
        }
        // A slow page answers late; the connection itself is still up.
        CdpError::Timeout => BrowserError::Timeout {
            what: "CDP response".to_string(),
            timeout_ms: CDP_REQUEST_TIMEOUT_MS,
        },
        other => BrowserError::Script(other.to_string()),
    }
}

fn js_string(s: &str) -> String {
    Value::String(s.to_string()).to_string()
}

/// Build a script that resolves `locator` and evaluates `read` against `el`.
fn element_script(locator: &Locator, read: &str) -> String {
    let selector = js_string(&locator.selector);
    let child = locator
        .child
        .as_deref()
        .map(js_string)
        .unwrap_or_else(|| "null".to_string());
    format!(
        "(() => {{ \
           const base = document.querySelectorAll({selector})[{index}]; \
           if (!base) return {{ detached: true, value: null }}; \
           const child = {child}; \
           const el = child === null ? base : base.querySelector(child); \
           if (!el) return {{ detached: false, value: null }}; \
           return {{ detached: false, value: {read} }}; \
         }})()",
        index = locator.index,
    )
}

impl ChromiumSession {
    async fn eval_value(&self, script: &str) -> BrowserResult<Value> {
        let result = self.page.evaluate(script).await.map_err(classify)?;
        Ok(result.value().cloned().unwrap_or(Value::Null))
    }

    async fn read_element(&self, locator: &Locator, read: &str) -> BrowserResult<ElementRead> {
        let value = self.eval_value(&element_script(locator, read)).await?;
        serde_json::from_value(value)
            .map_err(|e| BrowserError::Script(format!("unexpected element read result: {e}")))
    }

    async fn read_attached(&self, locator: &Locator, read: &str) -> BrowserResult<Value> {
        let element = self.read_element(locator, read).await?;
        if element.detached {
            return Err(BrowserError::Detached {
                selector: locator.selector.clone(),
                index: locator.index,
            });
        }
        Ok(element.value)
    }
}

fn as_text(value: Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s),
        _ => None,
    }
}

#[async_trait]
impl BrowserSession for ChromiumSession {
    async fn navigate(&mut self, url: &str, timeout: Duration) -> BrowserResult<NavigationResult> {
        let start = Instant::now();
        let page = &self.page;

        let result = tokio::time::timeout(timeout, async move {
            page.goto(url).await?;
            page.wait_for_navigation().await?;
            Ok::<_, CdpError>(())
        })
        .await;

        let load_time_ms = start.elapsed().as_millis() as u64;

        match result {
            Ok(Ok(())) => {
                let final_url = self
                    .page
                    .url()
                    .await
                    .ok()
                    .flatten()
                    .map(|u| u.to_string())
                    .unwrap_or_else(|| url.to_string());
                Ok(NavigationResult {
                    final_url,
                    load_time_ms,
                })
            }
            Ok(Err(e)) => match classify(e) {
                fatal @ BrowserError::Disconnected(_) => Err(fatal),
                other => Err(BrowserError::Navigation(other.to_string())),
            },
            Err(_) => Err(BrowserError::Timeout {
                what: format!("navigation to {url}"),
                timeout_ms: timeout.as_millis() as u64,
            }),
        }
    }

    async fn wait_for(&mut self, locator: &Locator, timeout: Duration) -> BrowserResult<()> {
        let deadline = Instant::now() + timeout;
        loop {
            let read = self.read_element(locator, "true").await?;
            if !read.detached && !read.value.is_null() {
                return Ok(());
            }
            if Instant::now() >= deadline {
                return Err(BrowserError::Timeout {
                    what: format!("'{}' [{}]", locator.selector, locator.index),
                    timeout_ms: timeout.as_millis() as u64,
                });
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        }
    }

    async fn scroll(&mut self, target: &ScrollTarget) -> BrowserResult<()> {
        match target {
            ScrollTarget::Window => {
                self.eval_value("window.scrollBy(0, document.body.scrollHeight)")
                    .await?;
            }
            ScrollTarget::Element(locator) => {
                self.read_attached(locator, "(el.scrollBy(0, el.scrollHeight), true)")
                    .await?;
            }
        }
        Ok(())
    }

    async fn count(&self, selector: &str) -> BrowserResult<usize> {
        let script = format!(
            "document.querySelectorAll({}).length",
            js_string(selector)
        );
        let value = self.eval_value(&script).await?;
        value
            .as_u64()
            .map(|n| n as usize)
            .ok_or_else(|| BrowserError::Script(format!("count returned {value}")))
    }

    async fn attribute(&self, locator: &Locator, name: &str) -> BrowserResult<Option<String>> {
        let read = format!("el.getAttribute({})", js_string(name));
        Ok(as_text(self.read_attached(locator, &read).await?))
    }

    async fn text(&self, locator: &Locator) -> BrowserResult<Option<String>> {
        let read = "(el.innerText || el.textContent || '')";
        Ok(as_text(self.read_attached(locator, read).await?))
    }

    async fn click(&mut self, locator: &Locator) -> BrowserResult<()> {
        let clicked = self
            .read_attached(locator, "(el.scrollIntoView(), el.click(), true)")
            .await?;
        if clicked.is_null() {
            return Err(BrowserError::Script(format!(
                "nothing to click under '{}' [{}]",
                locator.selector, locator.index
            )));
        }
        Ok(())
    }

    async fn close(self: Box<Self>) -> BrowserResult<()> {
        let ChromiumSession {
            mut browser,
            page,
            handler_task,
            active_count,
        } = *self;

        active_count.fetch_sub(1, Ordering::Relaxed);
        let _ = page.close().await;
        let closed = browser.close().await;
        let _ = browser.wait().await;
        handler_task.abort();
        tracing::debug!("Chromium session closed");

        closed
            .map(|_| ())
            .map_err(|e| BrowserError::Disconnected(format!("failed to close browser: {e}")))
    }
}
