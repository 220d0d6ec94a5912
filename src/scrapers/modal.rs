//! Product-number extraction from service-entry modals.

use std::time::Duration;

use anyhow::Result;
use scraper::{Html, Selector};
use tracing::{info, warn};

use super::browser::BrowserSession;

/// Result rows inside the modal table.
const RESULT_ROW_SELECTOR: &str = "table tbody tr";

/// Collect every PKK number listed in one modal's result table.
/// A wait timeout (modal never rendered, or table empty) yields an empty
/// list and is not an error.
pub async fn extract_product_numbers(
    session: &BrowserSession,
    url: &str,
    wait: Duration,
) -> Result<Vec<String>> {
    info!("Opening AJAX modal: {}", url);
    let Some(html) = session.goto_and_wait(url, RESULT_ROW_SELECTOR, wait).await? else {
        warn!("Timeout: modal table never rendered at {}", url);
        return Ok(Vec::new());
    };

    let numbers = parse_product_numbers(&html);
    info!("Found {} PKK numbers", numbers.len());
    Ok(numbers)
}

/// The PKK number sits in the second column of each result row. Rows with
/// fewer than two cells are skipped silently.
pub fn parse_product_numbers(html: &str) -> Vec<String> {
    let document = Html::parse_document(html);
    let row_selector = Selector::parse(RESULT_ROW_SELECTOR).unwrap();
    let cell_selector = Selector::parse("td").unwrap();

    document
        .select(&row_selector)
        .filter_map(|row| {
            let cells: Vec<_> = row.select(&cell_selector).collect();
            if cells.len() < 2 {
                return None;
            }
            Some(
                cells[1]
                    .text()
                    .collect::<String>()
                    .trim()
                    .to_string(),
            )
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn takes_second_column_of_each_row() {
        let html = r#"
            <table><tbody>
                <tr><td>1</td><td> PKK.DN.001 </td><td>x</td></tr>
                <tr><td>2</td><td>PKK.LN.002</td></tr>
            </tbody></table>
        "#;
        assert_eq!(
            parse_product_numbers(html),
            vec!["PKK.DN.001", "PKK.LN.002"]
        );
    }

    #[test]
    fn skips_rows_with_fewer_than_two_cells() {
        let html = r#"
            <table><tbody>
                <tr><td>only one</td></tr>
                <tr><td>1</td><td>PKK.DN.003</td></tr>
            </tbody></table>
        "#;
        assert_eq!(parse_product_numbers(html), vec!["PKK.DN.003"]);
    }

    #[test]
    fn empty_table_yields_nothing() {
        assert!(parse_product_numbers("<table><tbody></tbody></table>").is_empty());
    }
}
