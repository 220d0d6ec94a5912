//! Detail-page parsing into normalized vessel-call records.
//!
//! A detail page has a header block (`"<code> - <name>(<type>)"` plus a
//! master badge) and two labeled sections rendered as side-by-side
//! label/value tables. Extraction is allow-listed: only known labels are
//! kept, everything else is dropped, and missing values degrade to empty
//! strings so the record schema stays total.

use std::collections::HashMap;
use std::time::Duration;

use chrono::Local;
use indicatif::{ProgressBar, ProgressStyle};
use rand::Rng;
use scraper::{ElementRef, Html, Selector};
use tracing::warn;

use crate::models::VesselCall;

use super::http_client::HttpClient;

const VESSEL_SECTION_TITLE: &str = "INFORMASI KAPAL DAN KEAGENAN";
const ITINERARY_SECTION_TITLE: &str = "INFORMASI KEDATANGAN DAN KEBERANGKATAN";

/// Qualifier suffixes disambiguating itinerary labels shared between the
/// arrival (left pair) and departure (right pair) columns.
const ARRIVAL_QUALIFIER: &str = "Kedatangan";
const DEPARTURE_QUALIFIER: &str = "Keberangkatan";

/// Known labels of the vessel/agency section.
const VESSEL_LABELS: &[&str] = &[
    "Nama Perusahaan",
    "Bendera / Call Sign / IMO",
    "Tanda Pendaftaran Kapal",
    "GT / DWT",
    "Draft Depan / Belakang / Max",
    "Panjang / Lebar",
    "AAIC",
];

/// Known labels of the itinerary section, qualified where arrival and
/// departure share a label name.
const ITINERARY_LABELS: &[&str] = &[
    "Jenis Trayek (Kedatangan)",
    "Nomor Trayek (Kedatangan)",
    "ETA",
    "Sebelum Asal",
    "Asal",
    "No. SSM (Kedatangan)",
    "Single Billing (Kedatangan)",
    "Jenis Trayek (Keberangkatan)",
    "Nomor Trayek (Keberangkatan)",
    "ETD",
    "Singgah",
    "Tujuan",
    "No. SSM (Keberangkatan)",
    "Single Billing (Keberangkatan)",
];

/// Fetches detail pages and turns them into records, throttling between
/// identifiers.
pub struct DetailScraper {
    client: HttpClient,
    detail_url: String,
    throttle_min: f64,
    throttle_max: f64,
}

impl DetailScraper {
    pub fn new(
        client: HttpClient,
        detail_url: String,
        throttle_min: f64,
        throttle_max: f64,
    ) -> Self {
        Self {
            client,
            detail_url,
            throttle_min,
            throttle_max,
        }
    }

    /// Fetch and parse every identifier. Identifiers whose fetch exhausts
    /// its retries are skipped; the batch never aborts.
    pub async fn scrape(&self, ids: &[String]) -> Vec<VesselCall> {
        let bar = ProgressBar::new(ids.len() as u64);
        bar.set_style(
            ProgressStyle::with_template(
                "{spinner} Scraping PKK details [{bar:30}] {pos}/{len}",
            )
            .unwrap()
            .progress_chars("=> "),
        );

        let mut records = Vec::new();
        for id in ids {
            let url = format!("{}{}", self.detail_url, id);
            let body = match self.client.get_with_retry(&url).await {
                Ok(body) => body,
                Err(e) => {
                    warn!("Skipping {}: {}", id, e);
                    bar.inc(1);
                    continue;
                }
            };

            let scraped_at = Local::now().format("%Y-%m-%dT%H:%M:%S%.6f").to_string();
            records.push(parse_detail(&body, id, &scraped_at));
            bar.inc(1);

            // Deliberate request throttling, not an incidental pause
            self.throttle().await;
        }
        bar.finish_and_clear();
        records
    }

    async fn throttle(&self) {
        tokio::time::sleep(self.throttle_delay()).await;
    }

    /// Randomized per-identifier delay. Equal or inverted bounds collapse to
    /// a fixed delay instead of sampling an empty range.
    fn throttle_delay(&self) -> Duration {
        let secs = if self.throttle_min < self.throttle_max {
            rand::thread_rng().gen_range(self.throttle_min..self.throttle_max)
        } else {
            self.throttle_min
        };
        Duration::from_secs_f64(secs)
    }
}

/// Parse one detail page. Total and panic-free: any missing section, header
/// separator or label degrades to empty-string fields. When the header code
/// is absent the raw identifier stands in for `nomor_pkk`.
pub fn parse_detail(html: &str, fallback_id: &str, scraped_at: &str) -> VesselCall {
    let document = Html::parse_document(html);

    let header_selector = Selector::parse("div.card-header h6.card-title b").unwrap();
    let header_text = document
        .select(&header_selector)
        .next()
        .map(|el| element_text(&el))
        .unwrap_or_default();
    let (kode_pkk, nama_kapal, tipe_kapal) = split_header(&header_text);

    let badge_selector = Selector::parse("div.card-header .badge.bg-blue").unwrap();
    let nakhoda = document
        .select(&badge_selector)
        .next()
        .map(|el| element_text(&el).replace("NAKHODA :", "").trim().to_string())
        .unwrap_or_default();

    let mut vessel = seed_fields(VESSEL_LABELS);
    if let Some(table) = section_table(&document, VESSEL_SECTION_TITLE) {
        fill_labelled_pairs(table, &mut vessel, None);
    }

    let mut itinerary = seed_fields(ITINERARY_LABELS);
    if let Some(table) = section_table(&document, ITINERARY_SECTION_TITLE) {
        fill_labelled_pairs(
            table,
            &mut itinerary,
            Some((ARRIVAL_QUALIFIER, DEPARTURE_QUALIFIER)),
        );
    }

    VesselCall {
        nomor_pkk: if kode_pkk.is_empty() {
            fallback_id.to_string()
        } else {
            kode_pkk
        },
        nama_kapal,
        tipe_kapal,
        nakhoda,
        nama_perusahaan: take(&mut vessel, "Nama Perusahaan"),
        bendera_callsign_imo: take(&mut vessel, "Bendera / Call Sign / IMO"),
        tanda_pendaftaran_kapal: take(&mut vessel, "Tanda Pendaftaran Kapal"),
        gt_dwt: take(&mut vessel, "GT / DWT"),
        draft_depan_belakang_max: take(&mut vessel, "Draft Depan / Belakang / Max"),
        panjang_lebar: take(&mut vessel, "Panjang / Lebar"),
        aaic: take(&mut vessel, "AAIC"),
        jenis_trayek_kedatangan: take(&mut itinerary, "Jenis Trayek (Kedatangan)"),
        nomor_trayek_kedatangan: take(&mut itinerary, "Nomor Trayek (Kedatangan)"),
        eta: take(&mut itinerary, "ETA"),
        sebelum_asal: take(&mut itinerary, "Sebelum Asal"),
        asal: take(&mut itinerary, "Asal"),
        no_ssm_kedatangan: take(&mut itinerary, "No. SSM (Kedatangan)"),
        single_billing_kedatangan: take(&mut itinerary, "Single Billing (Kedatangan)"),
        jenis_trayek_keberangkatan: take(&mut itinerary, "Jenis Trayek (Keberangkatan)"),
        nomor_trayek_keberangkatan: take(&mut itinerary, "Nomor Trayek (Keberangkatan)"),
        etd: take(&mut itinerary, "ETD"),
        singgah: take(&mut itinerary, "Singgah"),
        tujuan: take(&mut itinerary, "Tujuan"),
        no_ssm_keberangkatan: take(&mut itinerary, "No. SSM (Keberangkatan)"),
        single_billing_keberangkatan: take(&mut itinerary, "Single Billing (Keberangkatan)"),
        scraped_at: scraped_at.to_string(),
    }
}

/// Split `"<code> - <name>(<type>)"`. No separator means no code; no
/// parentheses means no type.
fn split_header(text: &str) -> (String, String, String) {
    let Some((code, vessel_info)) = text.split_once(" - ") else {
        return (String::new(), String::new(), String::new());
    };
    let code = code.trim().to_string();
    let vessel_info = vessel_info.trim();

    if vessel_info.contains('(') {
        let name = vessel_info
            .split('(')
            .next()
            .unwrap_or("")
            .trim()
            .to_string();
        let kind = vessel_info
            .rsplit('(')
            .next()
            .unwrap_or("")
            .replace(')', "")
            .trim()
            .to_string();
        (code, name, kind)
    } else {
        (code, vessel_info.to_string(), String::new())
    }
}

/// Locate a labeled section: the `div.card-body` whose bold heading contains
/// `title`, then its first table.
fn section_table<'a>(document: &'a Html, title: &str) -> Option<ElementRef<'a>> {
    let body_selector = Selector::parse("div.card-body").unwrap();
    let heading_selector = Selector::parse("b").unwrap();
    let table_selector = Selector::parse("table").unwrap();

    document
        .select(&body_selector)
        .find(|body| {
            body.select(&heading_selector)
                .any(|b| element_text(&b).contains(title))
        })
        .and_then(|body| body.select(&table_selector).next())
}

/// Read each body row as two side-by-side label/value pairs: columns 0,2 and
/// 3,5 (columns 1 and 4 are separators). Rows with fewer than six cells are
/// skipped.
fn fill_labelled_pairs(
    table: ElementRef<'_>,
    known: &mut HashMap<String, String>,
    qualifiers: Option<(&str, &str)>,
) {
    let row_selector = Selector::parse("tbody tr").unwrap();
    let cell_selector = Selector::parse("td").unwrap();

    for row in table.select(&row_selector) {
        let cols: Vec<String> = row
            .select(&cell_selector)
            .map(|c| element_text(&c))
            .collect();
        if cols.len() < 6 {
            continue;
        }
        assign(known, &cols[0], &cols[2], qualifiers.map(|q| q.0));
        assign(known, &cols[3], &cols[5], qualifiers.map(|q| q.1));
    }
}

/// Allow-list assignment: the qualified label (`"<label> (<qualifier>)"`) is
/// tried first, then the bare label. Unknown labels are dropped.
fn assign(
    known: &mut HashMap<String, String>,
    label: &str,
    value: &str,
    qualifier: Option<&str>,
) {
    let label = label.trim();
    if label.is_empty() {
        return;
    }
    let value = value.trim().to_string();

    if let Some(qualifier) = qualifier {
        let qualified = format!("{} ({})", label, qualifier);
        if let Some(slot) = known.get_mut(&qualified) {
            *slot = value;
            return;
        }
    }
    if let Some(slot) = known.get_mut(label) {
        *slot = value;
    }
}

fn seed_fields(labels: &[&str]) -> HashMap<String, String> {
    labels
        .iter()
        .map(|label| (label.to_string(), String::new()))
        .collect()
}

fn take(fields: &mut HashMap<String, String>, key: &str) -> String {
    fields.remove(key).unwrap_or_default()
}

/// Element text with whitespace collapsed, text nodes joined by single
/// spaces.
fn element_text(el: &ElementRef<'_>) -> String {
    el.text()
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}
