//! Listing-page link discovery.
//!
//! A listing page enumerates service entries for one (port, year, month);
//! each entry's anchor carries the URL of an AJAX modal in a `data-url`
//! attribute.

use std::time::Duration;

use anyhow::Result;
use scraper::{Html, Selector};
use tracing::{info, warn};

use super::browser::BrowserSession;

/// Anchors that open a service-entry modal.
const SERVICE_LINK_SELECTOR: &str = "a.dataLayanan";

/// Collect the modal target URL of every service entry on a listing page.
/// A wait timeout yields an empty list: no links means no data this period.
pub async fn discover_service_links(
    session: &BrowserSession,
    url: &str,
    wait: Duration,
) -> Result<Vec<String>> {
    info!("Loading listing page: {}", url);
    let Some(html) = session
        .goto_and_wait(url, SERVICE_LINK_SELECTOR, wait)
        .await?
    else {
        warn!("No service links rendered at {}", url);
        return Ok(Vec::new());
    };

    let links = parse_service_links(&html);
    info!("Found {} service links", links.len());
    Ok(links)
}

/// Pull the `data-url` modal target from every service anchor, in document
/// order. Anchors without the attribute are skipped.
pub fn parse_service_links(html: &str) -> Vec<String> {
    let document = Html::parse_document(html);
    let selector = Selector::parse(SERVICE_LINK_SELECTOR).unwrap();
    document
        .select(&selector)
        .filter_map(|el| el.value().attr("data-url"))
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_data_url_in_document_order() {
        let html = r#"
            <div>
                <a class="dataLayanan" data-url="/modal/1">first</a>
                <a class="other" data-url="/modal/x">not a service link</a>
                <a class="dataLayanan" data-url="/modal/2">second</a>
            </div>
        "#;
        assert_eq!(parse_service_links(html), vec!["/modal/1", "/modal/2"]);
    }

    #[test]
    fn skips_anchors_without_data_url() {
        let html = r#"<a class="dataLayanan">no target</a>"#;
        assert!(parse_service_links(html).is_empty());
    }

    #[test]
    fn empty_page_yields_no_links() {
        assert!(parse_service_links("<html><body></body></html>").is_empty());
    }
}
