//! Scraper components: retrying fetcher, browser session and page extractors.

pub mod browser;
pub mod detail;
pub mod http_client;
pub mod listing;
pub mod modal;

pub use browser::BrowserSession;
pub use detail::{parse_detail, DetailScraper};
pub use http_client::{FetchError, HttpClient};
pub use listing::discover_service_links;
pub use modal::extract_product_numbers;
