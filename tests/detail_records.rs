//! End-to-end extraction tests against a captured detail page.

use pkkacquire::models::VesselCall;
use pkkacquire::pipeline::filter_domestic;
use pkkacquire::scrapers::listing::parse_service_links;
use pkkacquire::scrapers::modal::parse_product_numbers;
use pkkacquire::scrapers::parse_detail;

const DETAIL_PAGE: &str = include_str!("fixtures/detail_page.html");

#[test]
fn detail_page_yields_a_fully_populated_record() {
    let record = parse_detail(DETAIL_PAGE, "PKK.DN.IDN.2024.000123", "2024-05-17T00:00:00");

    assert_eq!(record.nomor_pkk, "PKK.DN.IDN.2024.000123");
    assert_eq!(record.nama_kapal, "KM BAHARI INDAH");
    assert_eq!(record.tipe_kapal, "General Cargo");
    assert_eq!(record.nakhoda, "AGUS WIBOWO");

    assert_eq!(record.nama_perusahaan, "PT Samudera Nusantara");
    assert_eq!(record.bendera_callsign_imo, "INDONESIA / YCXY / 9123456");
    assert_eq!(record.tanda_pendaftaran_kapal, "2019 Ka No.1234/L");
    assert_eq!(record.gt_dwt, "2500 / 3900");
    assert_eq!(record.draft_depan_belakang_max, "4.2 / 4.8 / 5.1");
    assert_eq!(record.panjang_lebar, "89.5 / 15.6");
    assert_eq!(record.aaic, "ID-0042");

    assert_eq!(record.jenis_trayek_kedatangan, "LINER");
    assert_eq!(record.nomor_trayek_kedatangan, "RT-2024-11");
    assert_eq!(record.eta, "2024-05-14 06:30");
    assert_eq!(record.sebelum_asal, "BELAWAN");
    assert_eq!(record.asal, "TANJUNG PRIOK");
    assert_eq!(record.no_ssm_kedatangan, "SSM-889001");

    assert_eq!(record.jenis_trayek_keberangkatan, "LINER");
    assert_eq!(record.nomor_trayek_keberangkatan, "RT-2024-12");
    assert_eq!(record.etd, "2024-05-16 18:00");
    assert_eq!(record.singgah, "SEMARANG");
    assert_eq!(record.tujuan, "MAKASSAR");
    assert_eq!(record.no_ssm_keberangkatan, "SSM-889002");

    assert_eq!(record.scraped_at, "2024-05-17T00:00:00");
}

#[test]
fn record_schema_is_total_even_when_fields_are_absent() {
    let record = parse_detail(DETAIL_PAGE, "X", "t");
    let value = serde_json::to_value(&record).unwrap();
    let map = value.as_object().unwrap();
    assert_eq!(map.len(), VesselCall::FIELD_COUNT);
    // Single Billing rows are not in the fixture; the fields still exist
    assert_eq!(map["single_billing_kedatangan"], "");
    assert_eq!(map["single_billing_keberangkatan"], "");
}

#[test]
fn reparsing_with_fixed_timestamp_is_byte_identical() {
    let first = parse_detail(DETAIL_PAGE, "X", "fixed");
    let second = parse_detail(DETAIL_PAGE, "X", "fixed");
    assert_eq!(
        serde_json::to_string(&first).unwrap(),
        serde_json::to_string(&second).unwrap()
    );
}

/// Listing page with two service entries, each modal listing three PKK
/// numbers of which one is non-domestic: the merged, filtered set for the
/// cell is exactly four identifiers.
#[test]
fn listing_and_modal_extraction_merge_per_cell() {
    let listing = r#"
        <a class="dataLayanan" data-url="https://portal.test/modal/1">entry 1</a>
        <a class="dataLayanan" data-url="https://portal.test/modal/2">entry 2</a>
    "#;
    let modal_one = r#"
        <table><tbody>
            <tr><td>1</td><td>PKK.DN.2024.0001</td></tr>
            <tr><td>2</td><td>PKK.DN.2024.0002</td></tr>
            <tr><td>3</td><td>PKK.LN.2024.0003</td></tr>
        </tbody></table>
    "#;
    let modal_two = r#"
        <table><tbody>
            <tr><td>1</td><td>PKK.DN.2024.0004</td></tr>
            <tr><td>2</td><td>PKK.LN.2024.0005</td></tr>
            <tr><td>3</td><td>PKK.DN.2024.0006</td></tr>
        </tbody></table>
    "#;

    let links = parse_service_links(listing);
    assert_eq!(links.len(), 2);

    let modals = [modal_one, modal_two];
    let mut merged = Vec::new();
    for (link, modal_html) in links.iter().zip(modals) {
        assert!(link.starts_with("https://portal.test/modal/"));
        merged.extend(filter_domestic(parse_product_numbers(modal_html), ".DN."));
    }

    assert_eq!(
        merged,
        vec![
            "PKK.DN.2024.0001",
            "PKK.DN.2024.0002",
            "PKK.DN.2024.0004",
            "PKK.DN.2024.0006",
        ]
    );
}
