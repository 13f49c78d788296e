//! End-to-end collection runs against scripted result pages.
//!
//! Every run goes through the dispatcher with zero scroll delay, then the
//! written CSV is read back and checked.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use sitesweep::browser::scripted::{ScriptedBrowser, ScriptedElement, ScriptedPage};
use sitesweep::sink::{read_table, Table};
use sitesweep::*;

// ─────────────────────── helpers ───────────────────────

const MAPS_FEED: &str = "div.m6QErb.DxyBCb.kA9KIf.dS8AEf.XiKgde";
const MAPS_CARD: &str = "a.hfpxzc";
const MAPS_PANE: &str = "div[role='main']";
const MAPS_TITLE: &str = "h1.DUwDvf";
const MAPS_ADDRESS: &str = "button[data-item-id='address']";
const MAPS_RATING: &str = "span[aria-label*='stars']";

const MART_CARD: &str = ".supplierInfoDiv";
const MART_LINK: &str = ".companyname a";
const MART_LOCATION: &str = ".newLocationUi span.highlight";
const MART_PHONE: &str = ".pns_h, .contactnumber .duet";

fn fast() -> Overrides {
    Overrides {
        scroll_delay: Some(Duration::ZERO),
        ..Default::default()
    }
}

fn dispatcher(browser: Arc<ScriptedBrowser>) -> Dispatcher {
    Dispatcher::new(Arc::new(PluginRegistry::builtin()), browser).with_overrides(fast())
}

fn output(dir: &tempfile::TempDir, name: &str) -> PathBuf {
    dir.path().join("static").join(name)
}

fn table(path: &Path) -> Table {
    read_table(path).unwrap()
}

fn cafe(i: usize) -> ScriptedElement {
    ScriptedElement::new()
        .attr("aria-label", &format!("Cafe {i}"))
        .attr("href", &format!("https://www.google.com/maps/place/cafe-{i}"))
        .detail(MAPS_TITLE, &format!("Cafe {i}"))
        .detail(MAPS_ADDRESS, &format!("{i} MG Road, Pune"))
        .detail(MAPS_RATING, &format!("4.{i} stars"))
}

fn maps_page(count: usize) -> ScriptedPage {
    ScriptedPage::new(MAPS_CARD)
        .ready(MAPS_FEED)
        .ready(MAPS_PANE)
        .elements((0..count).map(cafe))
}

fn supplier(i: usize) -> ScriptedElement {
    ScriptedElement::new()
        .child_text(MART_LINK, &format!("Acme Steel {i}"))
        .child_attr(MART_LINK, "href", &format!("https://www.indiamart.com/acme-{i}/"))
        .child_text(MART_LOCATION, "Mumbai")
        .child_text(MART_PHONE, &format!("0800000000{i}"))
}

fn mart_page(count: usize) -> ScriptedPage {
    ScriptedPage::new(MART_CARD)
        .ready(MART_CARD)
        .elements((0..count).map(supplier))
}

// ─────────────────────── scenarios ───────────────────────

#[tokio::test]
async fn test_coffee_shops_fewer_than_limit() {
    let dir = tempfile::tempdir().unwrap();
    let browser = Arc::new(ScriptedBrowser::new(maps_page(3).reveal(3, 0)));
    let path = output(&dir, "coffee_shops.csv");

    let request = CollectionRequest::new("google_maps", "coffee shops", &path, Some(5));
    let result = dispatcher(browser.clone()).run(&request).await.unwrap();

    assert_eq!(result.record_count, 3);
    assert_eq!(result.stop, Some(StopReason::Stable));
    assert!(result.warnings.iter().any(|w| w.contains("3 of 5")));

    let t = table(&path);
    assert_eq!(t.headers, ["Name", "URL", "Address", "Rating"]);
    assert_eq!(t.rows.len(), 3);
    assert_eq!(
        t.rows[0],
        [
            "Cafe 0",
            "https://www.google.com/maps/place/cafe-0",
            "0 MG Road, Pune",
            "4.0 stars"
        ]
    );

    let log = browser.log();
    assert_eq!(
        log.visited,
        ["https://www.google.com/maps/search/coffee+shops"]
    );
    assert_eq!(log.clicks, [0, 1, 2]);
    assert!(log.closed);
    assert_eq!(browser.active_sessions(), 0);
}

#[tokio::test]
async fn test_limit_caps_records_when_more_are_available() {
    let dir = tempfile::tempdir().unwrap();
    let browser = Arc::new(ScriptedBrowser::new(mart_page(9).reveal(1, 3)));
    let path = output(&dir, "steel.csv");

    let request = CollectionRequest::new("indiamart", "steel pipes", &path, Some(2));
    let result = dispatcher(browser.clone()).run(&request).await.unwrap();

    assert_eq!(result.record_count, 2);
    assert_eq!(result.stop, Some(StopReason::LimitReached));
    assert!(result.warnings.is_empty());
    assert_eq!(browser.log().scrolls, 1);

    let t = table(&path);
    assert_eq!(t.headers, ["Company Name", "Location", "Phone", "URL"]);
    assert_eq!(
        t.rows,
        vec![
            vec![
                "Acme Steel 0",
                "Mumbai",
                "08000000000",
                "https://www.indiamart.com/acme-0/"
            ],
            vec![
                "Acme Steel 1",
                "Mumbai",
                "08000000001",
                "https://www.indiamart.com/acme-1/"
            ],
        ]
    );
}

#[tokio::test]
async fn test_unlimited_run_keeps_scrolling_until_stable() {
    let dir = tempfile::tempdir().unwrap();
    let browser = Arc::new(ScriptedBrowser::new(mart_page(7).reveal(1, 3)));
    let path = output(&dir, "all.csv");

    let request = CollectionRequest::new("indiamart", "steel pipes", &path, None);
    let result = dispatcher(browser.clone()).run(&request).await.unwrap();

    // 1 → 4 → 7 → 7
    assert_eq!(result.record_count, 7);
    assert_eq!(result.stop, Some(StopReason::Stable));
    assert_eq!(browser.log().scrolls, 3);
    assert_eq!(table(&path).rows.len(), 7);
}

#[tokio::test]
async fn test_round_cap_bounds_loading() {
    let dir = tempfile::tempdir().unwrap();
    let browser = Arc::new(ScriptedBrowser::new(mart_page(40).reveal(1, 1)));
    let path = output(&dir, "capped.csv");

    let dispatcher = Dispatcher::new(Arc::new(PluginRegistry::builtin()), browser.clone())
        .with_overrides(Overrides {
            max_rounds: Some(4),
            ..fast()
        });
    let request = CollectionRequest::new("indiamart", "bolts", &path, None);
    let result = dispatcher.run(&request).await.unwrap();

    assert_eq!(result.stop, Some(StopReason::RoundCap));
    assert_eq!(result.record_count, 5);
    assert_eq!(browser.log().scrolls, 4);
}

#[tokio::test]
async fn test_missing_results_container_is_empty_success() {
    let dir = tempfile::tempdir().unwrap();
    let page = ScriptedPage::new(MAPS_CARD).elements((0..3).map(cafe));
    let browser = Arc::new(ScriptedBrowser::new(page));
    let path = output(&dir, "nothing.csv");

    let request = CollectionRequest::new("google_maps", "zzqqxx", &path, Some(5));
    let result = dispatcher(browser.clone()).run(&request).await.unwrap();

    assert_eq!(result.record_count, 0);
    assert_eq!(result.stop, None);
    assert!(result.warnings.iter().any(|w| w.contains("no results container")));

    let t = table(&path);
    assert_eq!(t.headers, ["Name", "URL", "Address", "Rating"]);
    assert!(t.rows.is_empty());
    assert_eq!(browser.sessions_opened(), 1);
    assert_eq!(browser.active_sessions(), 0);
}

#[tokio::test]
async fn test_broken_field_gets_placeholder() {
    let dir = tempfile::tempdir().unwrap();
    let page = ScriptedPage::new(MAPS_CARD)
        .ready(MAPS_FEED)
        .ready(MAPS_PANE)
        .element(cafe(0))
        .element(cafe(1).broken("attr:href"))
        .reveal(2, 0);
    let browser = Arc::new(ScriptedBrowser::new(page));
    let path = output(&dir, "broken.csv");

    let request = CollectionRequest::new("google_maps", "coffee shops", &path, None);
    let result = dispatcher(browser).run(&request).await.unwrap();

    assert_eq!(result.record_count, 2);
    assert!(result
        .warnings
        .iter()
        .any(|w| w.contains("listing 2") && w.contains("URL")));

    let t = table(&path);
    assert_eq!(t.rows[1][0], "Cafe 1");
    assert_eq!(t.rows[1][1], "N/A");
    assert_eq!(t.rows[1][2], "1 MG Road, Pune");
}

#[tokio::test]
async fn test_missing_detail_pane_keeps_card_fields() {
    let dir = tempfile::tempdir().unwrap();
    let page = ScriptedPage::new(MAPS_CARD)
        .ready(MAPS_FEED)
        .elements((0..2).map(cafe))
        .reveal(2, 0);
    let browser = Arc::new(ScriptedBrowser::new(page));
    let path = output(&dir, "no_pane.csv");

    let request = CollectionRequest::new("google_maps", "coffee shops", &path, None);
    let result = dispatcher(browser).run(&request).await.unwrap();

    assert_eq!(result.record_count, 2);
    let t = table(&path);
    assert_eq!(t.rows[0][0], "Cafe 0");
    assert_eq!(t.rows[0][2], "N/A");
    assert_eq!(t.rows[0][3], "N/A");
}

#[tokio::test]
async fn test_absent_rating_is_placeholder() {
    let dir = tempfile::tempdir().unwrap();
    let element = ScriptedElement::new()
        .attr("aria-label", "Quiet Cafe")
        .attr("href", "https://www.google.com/maps/place/quiet")
        .detail(MAPS_TITLE, "Quiet Cafe")
        .detail(MAPS_ADDRESS, "1 Lane");
    let page = ScriptedPage::new(MAPS_CARD)
        .ready(MAPS_FEED)
        .ready(MAPS_PANE)
        .element(element)
        .reveal(1, 0);
    let browser = Arc::new(ScriptedBrowser::new(page));
    let path = output(&dir, "no_rating.csv");

    let request = CollectionRequest::new("google_maps", "quiet", &path, None);
    let result = dispatcher(browser).run(&request).await.unwrap();

    // The missing star span costs the rating only, not the listing.
    assert_eq!(result.record_count, 1);
    assert!(result
        .warnings
        .iter()
        .any(|w| w.contains("listing 1") && w.contains("Rating")));
    let t = table(&path);
    assert_eq!(t.rows[0], ["Quiet Cafe", "https://www.google.com/maps/place/quiet", "1 Lane", "N/A"]);
}

#[tokio::test]
async fn test_detail_pane_is_read_after_it_shows_the_clicked_card() {
    let dir = tempfile::tempdir().unwrap();
    let page = ScriptedPage::new(MAPS_CARD)
        .ready(MAPS_FEED)
        .ready(MAPS_PANE)
        .element(cafe(0))
        .element(cafe(1).detail_lag(2))
        .reveal(2, 0);
    let browser = Arc::new(ScriptedBrowser::new(page));
    let path = output(&dir, "late_pane.csv");

    let request = CollectionRequest::new("google_maps", "coffee shops", &path, None);
    let result = dispatcher(browser).run(&request).await.unwrap();

    assert_eq!(result.record_count, 2);
    assert!(result.warnings.is_empty());
    let t = table(&path);
    assert_eq!(t.rows[1][0], "Cafe 1");
    assert_eq!(t.rows[1][2], "1 MG Road, Pune");
    assert_eq!(t.rows[1][3], "4.1 stars");
}

#[tokio::test]
async fn test_detached_candidate_is_skipped() {
    let dir = tempfile::tempdir().unwrap();
    let page = mart_page(0)
        .element(supplier(0))
        .element(supplier(1).detached())
        .element(supplier(2))
        .reveal(3, 0);
    let browser = Arc::new(ScriptedBrowser::new(page));
    let path = output(&dir, "detached.csv");

    let request = CollectionRequest::new("indiamart", "steel", &path, None);
    let result = dispatcher(browser).run(&request).await.unwrap();

    assert_eq!(result.record_count, 2);
    assert!(result
        .warnings
        .iter()
        .any(|w| w.contains("failed to extract listing 2")));

    let t = table(&path);
    assert_eq!(t.rows[0][0], "Acme Steel 0");
    assert_eq!(t.rows[1][0], "Acme Steel 2");
}

#[tokio::test]
async fn test_disconnect_fails_and_releases_session() {
    let dir = tempfile::tempdir().unwrap();
    let page = mart_page(6).reveal(1, 1).disconnect_after_scrolls(1);
    let browser = Arc::new(ScriptedBrowser::new(page));
    let path = output(&dir, "gone.csv");

    let request = CollectionRequest::new("indiamart", "steel", &path, Some(5));
    let err = dispatcher(browser.clone()).run(&request).await.unwrap_err();

    match err {
        HarvestError::CollectionFailed { site, source } => {
            assert_eq!(site, "indiamart");
            assert!(matches!(
                source,
                CollectError::Browser(BrowserError::Disconnected(_))
            ));
        }
        other => panic!("expected CollectionFailed, got {other:?}"),
    }
    assert!(browser.log().closed);
    assert_eq!(browser.active_sessions(), 0);
    assert!(!path.exists());
}

#[tokio::test]
async fn test_non_positive_limit_never_opens_browser() {
    for limit in [0, -4] {
        let dir = tempfile::tempdir().unwrap();
        let browser = Arc::new(ScriptedBrowser::new(maps_page(3).reveal(3, 0)));
        let path = output(&dir, "zero.csv");

        let request = CollectionRequest::new("google_maps", "coffee shops", &path, Some(limit));
        let result = dispatcher(browser.clone()).run(&request).await.unwrap();

        assert_eq!(result.record_count, 0);
        assert_eq!(browser.sessions_opened(), 0);
        let t = table(&path);
        assert_eq!(t.headers, ["Name", "URL", "Address", "Rating"]);
        assert!(t.rows.is_empty());
    }
}

#[tokio::test]
async fn test_unknown_site_does_no_work() {
    let dir = tempfile::tempdir().unwrap();
    let browser = Arc::new(ScriptedBrowser::new(maps_page(3)));
    let path = output(&dir, "unknown.csv");

    let request = CollectionRequest::new("unknown", "coffee shops", &path, Some(5));
    let err = dispatcher(browser.clone()).run(&request).await.unwrap_err();

    assert!(matches!(err, HarvestError::PluginNotFound(ref s) if s == "unknown"));
    assert_eq!(browser.sessions_opened(), 0);
    assert!(!path.exists());
}

#[tokio::test]
async fn test_empty_query_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let browser = Arc::new(ScriptedBrowser::new(maps_page(3)));
    let request = CollectionRequest::new("google_maps", "   ", output(&dir, "q.csv"), None);

    let err = dispatcher(browser.clone()).run(&request).await.unwrap_err();
    assert!(matches!(err, HarvestError::InvalidRequest(_)));
    assert_eq!(browser.sessions_opened(), 0);
}

#[tokio::test]
async fn test_launch_failure_is_collection_failure() {
    let dir = tempfile::tempdir().unwrap();
    let path = output(&dir, "noop.csv");
    let dispatcher = Dispatcher::new(Arc::new(PluginRegistry::builtin()), Arc::new(NoopBrowser));

    let request = CollectionRequest::new("google_maps", "coffee shops", &path, Some(5));
    let err = dispatcher.run(&request).await.unwrap_err();

    match err {
        HarvestError::CollectionFailed { source, .. } => {
            assert!(matches!(source, CollectError::Browser(BrowserError::Launch(_))));
        }
        other => panic!("expected CollectionFailed, got {other:?}"),
    }
    assert!(!path.exists());
}

#[tokio::test]
async fn test_repeat_runs_share_a_schema() {
    let dir = tempfile::tempdir().unwrap();
    let registry = Arc::new(PluginRegistry::builtin());

    let mut headers = Vec::new();
    for (i, count) in [0usize, 2, 5].into_iter().enumerate() {
        let browser = Arc::new(ScriptedBrowser::new(mart_page(count).reveal(count, 0)));
        let path = output(&dir, &format!("run_{i}.csv"));
        let dispatcher = Dispatcher::new(registry.clone(), browser).with_overrides(fast());
        let request = CollectionRequest::new("indiamart", "steel", &path, None);

        let result = dispatcher.run(&request).await.unwrap();
        assert_eq!(result.record_count, count);
        headers.push(table(&path).headers);
    }
    assert!(headers.windows(2).all(|w| w[0] == w[1]));
}
