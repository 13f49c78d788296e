//! IndiaMART supplier directory.
//!
//! The directory appends `.supplierInfoDiv` cards as the window scrolls.
//! Each card is read on its own so a missing phone or location never
//! shifts values between suppliers.

use std::time::Duration;

use async_trait::async_trait;

use crate::browser::{BrowserResult, BrowserSession, Locator, ScrollTarget};
use crate::collect::{Collector, FieldReader, PageProfile, PluginDescriptor, Timing};
use crate::types::FieldSchema;

const CARD: &str = ".supplierInfoDiv";
const COMPANY_LINK: &str = ".companyname a";
const LOCATION: &str = ".newLocationUi span.highlight";
const PHONE: &str = ".pns_h, .contactnumber .duet";

const DESCRIPTOR: PluginDescriptor = PluginDescriptor {
    site: "indiamart",
    description: "Scrape supplier names, locations, phone numbers, and links from IndiaMART.",
    schema: FieldSchema::new(&["Company Name", "Location", "Phone", "URL"], ""),
};

pub struct IndiaMart;

/// Search URL for `query`.
pub fn build_search_url(query: &str) -> String {
    let encoded: String = url::form_urlencoded::byte_serialize(query.as_bytes()).collect();
    format!("https://dir.indiamart.com/search.mp?ss={encoded}")
}

#[async_trait]
impl Collector for IndiaMart {
    fn descriptor(&self) -> &PluginDescriptor {
        &DESCRIPTOR
    }

    fn search_url(&self, query: &str) -> String {
        build_search_url(query)
    }

    fn profile(&self) -> PageProfile {
        PageProfile {
            results: Locator::first(CARD),
            candidates: CARD,
            scroll: ScrollTarget::Window,
            timing: Timing {
                navigation_timeout: Duration::from_secs(60),
                results_timeout: Duration::from_secs(15),
                scroll_delay: Duration::from_secs(1),
                max_rounds: 50,
            },
        }
    }

    async fn extract(
        &self,
        session: &mut dyn BrowserSession,
        fields: &mut FieldReader<'_>,
    ) -> BrowserResult<()> {
        let card = Locator::nth(CARD, fields.index());
        fields.take(
            "Company Name",
            session.text(&card.clone().child(COMPANY_LINK)).await,
        )?;
        fields.take("Location", session.text(&card.clone().child(LOCATION)).await)?;
        fields.take("Phone", session.text(&card.clone().child(PHONE)).await)?;
        fields.take(
            "URL",
            session.attribute(&card.child(COMPANY_LINK), "href").await,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_search_url_encodes_query() {
        assert_eq!(
            build_search_url("steel pipes"),
            "https://dir.indiamart.com/search.mp?ss=steel+pipes"
        );
    }

    #[test]
    fn test_profile_scrolls_window() {
        let profile = IndiaMart.profile();
        assert_eq!(profile.scroll, ScrollTarget::Window);
        assert_eq!(profile.results, Locator::first(CARD));
        assert_eq!(profile.timing.results_timeout, Duration::from_secs(15));
    }
}
