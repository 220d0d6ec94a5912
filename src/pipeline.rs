//! Scrape orchestration across ports and periods.
//!
//! One cell is a (port, year, month) listing page. The batch variant hands
//! cells to a fixed worker pool where every worker owns its own browser
//! session; the HTTP-triggered variant walks cells sequentially with an
//! inter-cell pause. Per-cell failure never aborts a run.

use std::collections::VecDeque;
use std::sync::Arc;

use tokio::sync::{mpsc, Mutex};
use tracing::{error, info};

use crate::config::Settings;
use crate::models::{load_ports, Port, VesselCall};
use crate::scrapers::{
    discover_service_links, extract_product_numbers, BrowserSession, DetailScraper, HttpClient,
};

/// One (port, year, month) listing page to scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cell {
    pub port_code: String,
    pub year: String,
    pub month: String,
}

/// Outcome of a full run.
#[derive(Debug, Default)]
pub struct ScrapeReport {
    pub records: Vec<VesselCall>,
    pub ports: usize,
    pub cells_processed: usize,
    pub cells_failed: usize,
}

struct CellOutcome {
    records: Vec<VesselCall>,
    failed: bool,
}

/// Listing URL for one cell.
pub fn listing_url(settings: &Settings, cell: &Cell) -> String {
    format!(
        "{}/{}/{}/{}/{}/{}",
        settings.base_url,
        cell.port_code,
        settings.source,
        settings.source_code,
        cell.year,
        cell.month
    )
}

/// Retain only identifiers carrying the domestic-route marker.
pub fn filter_domestic(ids: Vec<String>, marker: &str) -> Vec<String> {
    ids.into_iter().filter(|id| id.contains(marker)).collect()
}

/// Cross product of ports x years x months, in iteration order.
pub fn build_cells(ports: &[Port], years: &[String], months: &[String]) -> Vec<Cell> {
    let mut cells = Vec::with_capacity(ports.len() * years.len() * months.len());
    for port in ports {
        for year in years {
            for month in months {
                cells.push(Cell {
                    port_code: port.code.clone(),
                    year: year.clone(),
                    month: month.clone(),
                });
            }
        }
    }
    cells
}

/// Scrape one cell: discover service links, collect PKK numbers from every
/// modal, filter to the domestic subset and fetch their details once as a
/// merged list. Duplicate identifiers across cells are not deduplicated.
pub async fn process_cell(
    session: &BrowserSession,
    detail: &DetailScraper,
    settings: &Settings,
    cell: &Cell,
) -> anyhow::Result<Vec<VesselCall>> {
    let url = listing_url(settings, cell);
    info!(
        "Processing {} - {}/{}",
        cell.port_code, cell.year, cell.month
    );

    let links = discover_service_links(session, &url, settings.wait_timeout()).await?;

    let mut ids = Vec::new();
    for link in links {
        let numbers = extract_product_numbers(session, &link, settings.wait_timeout()).await?;
        ids.extend(filter_domestic(numbers, &settings.domestic_marker));
    }

    if ids.is_empty() {
        info!(
            "No domestic PKK for {}-{}/{}",
            cell.port_code, cell.month, cell.year
        );
        return Ok(Vec::new());
    }

    Ok(detail.scrape(&ids).await)
}

fn detail_scraper(settings: &Settings) -> DetailScraper {
    let client = HttpClient::new(
        settings.request_timeout(),
        settings.max_retries,
        settings.initial_delay(),
    );
    DetailScraper::new(
        client,
        settings.detail_url.clone(),
        settings.throttle_min_secs,
        settings.throttle_max_secs,
    )
}

/// Batch run: a fixed-size worker pool drains a shared cell queue. Every
/// worker launches its own browser session; results merge in completion
/// order.
pub async fn run(settings: &Settings, workers: usize) -> anyhow::Result<ScrapeReport> {
    let ports = load_ports(&settings.ports_file)?;
    let cells = build_cells(&ports, &settings.years, &settings.months);
    info!(
        "Scraping {} cells ({} ports) with {} workers",
        cells.len(),
        ports.len(),
        workers
    );

    let mut report = ScrapeReport {
        ports: ports.len(),
        ..ScrapeReport::default()
    };
    if cells.is_empty() {
        info!("No cells to scrape");
        return Ok(report);
    }

    let queue = Arc::new(Mutex::new(VecDeque::from(cells)));
    let (tx, mut rx) = mpsc::channel::<CellOutcome>(workers.max(1));

    let mut handles = Vec::with_capacity(workers);
    for worker_id in 0..workers.max(1) {
        let queue = queue.clone();
        let tx = tx.clone();
        let settings = settings.clone();

        handles.push(tokio::spawn(async move {
            let session = match BrowserSession::launch().await {
                Ok(session) => session,
                Err(e) => {
                    error!("Worker {} could not start a browser session: {}", worker_id, e);
                    return false;
                }
            };
            let detail = detail_scraper(&settings);

            loop {
                let cell = { queue.lock().await.pop_front() };
                let Some(cell) = cell else { break };

                let outcome = match process_cell(&session, &detail, &settings, &cell).await {
                    Ok(records) => CellOutcome {
                        records,
                        failed: false,
                    },
                    Err(e) => {
                        error!("Failed to process {}: {}", listing_url(&settings, &cell), e);
                        CellOutcome {
                            records: Vec::new(),
                            failed: true,
                        }
                    }
                };
                if tx.send(outcome).await.is_err() {
                    break;
                }
            }

            session.close().await;
            true
        }));
    }
    drop(tx);

    while let Some(outcome) = rx.recv().await {
        report.cells_processed += 1;
        if outcome.failed {
            report.cells_failed += 1;
        }
        report.records.extend(outcome.records);
    }

    let mut sessions_started = 0usize;
    for handle in handles {
        if matches!(handle.await, Ok(true)) {
            sessions_started += 1;
        }
    }
    if sessions_started == 0 {
        let unclaimed = queue.lock().await.len();
        anyhow::bail!(
            "no worker could start a browser session; {} cells left unprocessed",
            unclaimed
        );
    }

    info!(
        "Run complete: {} records from {} cells ({} failed)",
        report.records.len(),
        report.cells_processed,
        report.cells_failed
    );
    Ok(report)
}

/// Sequential run for the HTTP-triggered variant: one session, iteration
/// order, an explicit pause between cells.
pub async fn run_sequential(settings: &Settings) -> anyhow::Result<ScrapeReport> {
    let ports = load_ports(&settings.ports_file)?;
    let cells = build_cells(&ports, &settings.years, &settings.months);
    info!("Scraping {} cells sequentially", cells.len());

    let session = BrowserSession::launch().await?;
    let detail = detail_scraper(settings);

    let mut report = ScrapeReport {
        ports: ports.len(),
        ..ScrapeReport::default()
    };
    for cell in &cells {
        match process_cell(&session, &detail, settings, cell).await {
            Ok(records) => report.records.extend(records),
            Err(e) => {
                error!("Failed to process {}: {}", listing_url(settings, cell), e);
                report.cells_failed += 1;
            }
        }
        report.cells_processed += 1;
        tokio::time::sleep(settings.cell_delay()).await;
    }

    session.close().await;
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn port(code: &str) -> Port {
        Port {
            code: code.into(),
            name: code.into(),
        }
    }

    #[test]
    fn domestic_filter_keeps_marked_identifiers_only() {
        let ids = vec!["A.DN.001".to_string(), "B.LN.002".to_string()];
        assert_eq!(filter_domestic(ids, ".DN."), vec!["A.DN.001"]);
    }

    #[test]
    fn domestic_filter_does_not_deduplicate() {
        let ids = vec!["A.DN.001".to_string(), "A.DN.001".to_string()];
        assert_eq!(filter_domestic(ids, ".DN.").len(), 2);
    }

    #[test]
    fn cells_are_the_full_cross_product_in_iteration_order() {
        let cells = build_cells(
            &[port("IDSUB"), port("IDJKT")],
            &["2024".to_string()],
            &["1".to_string(), "2".to_string()],
        );
        assert_eq!(cells.len(), 4);
        assert_eq!(cells[0].port_code, "IDSUB");
        assert_eq!(cells[0].month, "1");
        assert_eq!(cells[1].month, "2");
        assert_eq!(cells[2].port_code, "IDJKT");
    }

    #[test]
    fn listing_url_follows_the_fixed_template() {
        let mut settings = Settings::default();
        settings.base_url = "https://example.test/layanan".into();
        settings.source = "kapal".into();
        settings.source_code = "7".into();
        let cell = Cell {
            port_code: "IDSUB".into(),
            year: "2024".into(),
            month: "5".into(),
        };
        assert_eq!(
            listing_url(&settings, &cell),
            "https://example.test/layanan/IDSUB/kapal/7/2024/5"
        );
    }

    /// Two modals with three identifiers each, one non-domestic per modal,
    /// merge to four detail fetches.
    #[test]
    fn merged_cell_identifiers_follow_per_modal_filtering() {
        let modal_a = vec![
            "A.DN.001".to_string(),
            "A.DN.002".to_string(),
            "A.LN.003".to_string(),
        ];
        let modal_b = vec![
            "B.DN.001".to_string(),
            "B.LN.002".to_string(),
            "B.DN.003".to_string(),
        ];
        let mut merged = Vec::new();
        merged.extend(filter_domestic(modal_a, ".DN."));
        merged.extend(filter_domestic(modal_b, ".DN."));
        assert_eq!(merged.len(), 4);
    }

    fn settings_with_ports(dir: &tempfile::TempDir) -> Settings {
        let path = dir.path().join("ports.csv");
        std::fs::write(&path, "code,name\nIDSUB,Tanjung Perak\n").unwrap();
        let mut settings = Settings::default();
        settings.ports_file = path;
        settings
    }

    #[tokio::test]
    async fn empty_cell_set_short_circuits_without_a_browser() {
        let dir = tempfile::tempdir().unwrap();
        let mut settings = settings_with_ports(&dir);
        settings.years.clear();

        let report = run(&settings, 2).await.unwrap();
        assert_eq!(report.ports, 1);
        assert_eq!(report.cells_processed, 0);
        assert_eq!(report.cells_failed, 0);
        assert!(report.records.is_empty());
    }

    #[cfg(not(feature = "browser"))]
    #[tokio::test]
    async fn run_errors_when_no_worker_can_start_a_session() {
        let dir = tempfile::tempdir().unwrap();
        let mut settings = settings_with_ports(&dir);
        settings.years = vec!["2024".to_string()];
        settings.months = vec!["1".to_string()];

        let err = run(&settings, 2).await.unwrap_err();
        assert!(err.to_string().contains("browser session"));
    }
}
