//! Google Maps search results.
//!
//! Results render into the second `div.m6QErb…` feed, which lazily loads
//! more `a.hfpxzc` cards as it is scrolled. Name and URL come from the card
//! itself; address and rating come from the detail pane opened by clicking
//! the card. The pane is reused between cards, so it is only read once its
//! heading names the clicked card.

use std::time::{Duration, Instant};

use async_trait::async_trait;

use crate::browser::{BrowserResult, BrowserSession, Locator, ScrollTarget};
use crate::collect::{Collector, FieldReader, PageProfile, PluginDescriptor, Timing};
use crate::error::BrowserError;
use crate::types::FieldSchema;

const FEED: &str = "div.m6QErb.DxyBCb.kA9KIf.dS8AEf.XiKgde";
const CARD: &str = "a.hfpxzc";
const DETAIL_PANE: &str = "div[role='main']";
const TITLE: &str = "h1.DUwDvf";
const ADDRESS: &str = "button[data-item-id='address']";
const RATING: &str = "span[aria-label*='stars']";

const DETAIL_TIMEOUT: Duration = Duration::from_secs(10);
const TITLE_POLL: Duration = Duration::from_millis(100);

const DESCRIPTOR: PluginDescriptor = PluginDescriptor {
    site: "google_maps",
    description: "Scrape business listings, ratings, and addresses from Google Maps.",
    schema: FieldSchema::new(&["Name", "URL", "Address", "Rating"], "N/A"),
};

pub struct GoogleMaps;

/// Wait until the detail pane heading reads `name`.
async fn wait_for_title(session: &mut dyn BrowserSession, name: &str) -> BrowserResult<()> {
    let title = Locator::first(TITLE);
    let deadline = Instant::now() + DETAIL_TIMEOUT;
    loop {
        match session.text(&title).await {
            Ok(Some(text)) if text.trim() == name => return Ok(()),
            Err(e) if e.is_fatal() => return Err(e),
            _ => {}
        }
        if Instant::now() >= deadline {
            return Err(BrowserError::Timeout {
                what: format!("detail pane for '{name}'"),
                timeout_ms: DETAIL_TIMEOUT.as_millis() as u64,
            });
        }
        tokio::time::sleep(TITLE_POLL).await;
    }
}

/// Search URL for `query`.
pub fn build_search_url(query: &str) -> String {
    let encoded: String = url::form_urlencoded::byte_serialize(query.as_bytes()).collect();
    format!("https://www.google.com/maps/search/{encoded}")
}

#[async_trait]
impl Collector for GoogleMaps {
    fn descriptor(&self) -> &PluginDescriptor {
        &DESCRIPTOR
    }

    fn search_url(&self, query: &str) -> String {
        build_search_url(query)
    }

    fn profile(&self) -> PageProfile {
        PageProfile {
            results: Locator::nth(FEED, 1),
            candidates: CARD,
            scroll: ScrollTarget::Element(Locator::nth(FEED, 1)),
            timing: Timing {
                navigation_timeout: Duration::from_secs(60),
                results_timeout: Duration::from_secs(20),
                scroll_delay: Duration::from_secs(1),
                max_rounds: 20,
            },
        }
    }

    async fn extract(
        &self,
        session: &mut dyn BrowserSession,
        fields: &mut FieldReader<'_>,
    ) -> BrowserResult<()> {
        let card = Locator::nth(CARD, fields.index());
        let label = session.attribute(&card, "aria-label").await;
        let name = match &label {
            Ok(Some(name)) if !name.trim().is_empty() => Some(name.trim().to_string()),
            _ => None,
        };
        fields.take("Name", label)?;
        fields.take("URL", session.attribute(&card, "href").await)?;

        if let Err(e) = open_detail(session, &card, name.as_deref()).await {
            return fields.absorb(&["Address", "Rating"], e);
        }

        fields.take("Address", session.text(&Locator::first(ADDRESS)).await)?;

        // The star span often has no rendered text; its aria-label carries the value.
        let rating = Locator::first(RATING);
        let read = match session.text(&rating).await {
            Ok(Some(text)) if !text.trim().is_empty() => Ok(Some(text)),
            Ok(_) => session.attribute(&rating, "aria-label").await,
            Err(e) => Err(e),
        };
        fields.take("Rating", read)
    }
}

/// Click `card` and wait for its detail pane. Without a name to match,
/// the pane container is all there is to wait on.
async fn open_detail(
    session: &mut dyn BrowserSession,
    card: &Locator,
    name: Option<&str>,
) -> BrowserResult<()> {
    session.click(card).await?;
    session
        .wait_for(&Locator::first(DETAIL_PANE), DETAIL_TIMEOUT)
        .await?;
    match name {
        Some(name) => wait_for_title(session, name).await,
        None => Ok(()),
    }
}
