//! Rating history rows from a detail page

use std::sync::LazyLock;

use regex::Regex;
use scraper::{Html, Selector};

use crate::extract::{cell_text, row_cells};
use crate::record::{HistoryRow, parse_rating};

static ROW: LazyLock<Selector> = LazyLock::new(|| Selector::parse("tr").expect("valid selector"));
static TRAILING_YEAR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d{4})\s*$").expect("valid regex"));

/// Year a period date ends with, e.g. `2019` for `"March 4, 2019"`
pub fn trailing_year(date: &str) -> Option<i32> {
    TRAILING_YEAR
        .captures(date)
        .and_then(|c| c[1].parse().ok())
}

/// Collect history rows from every table on the page.
///
/// A row qualifies with at least five cells laid out as period id, date,
/// province, gender, rating, and a date whose trailing year is after
/// `cutoff_year`. An optional sixth cell holds the last-played date.
pub fn extract_history(html: &str, cutoff_year: i32, max_rating: u32) -> Vec<HistoryRow> {
    let doc = Html::parse_document(html);
    doc.select(&ROW)
        .filter_map(|row| {
            let cells: Vec<String> = row_cells(row, false).into_iter().map(cell_text).collect();
            if cells.len() < 5 {
                return None;
            }
            let period_id = cells[0].parse::<u32>().ok()?;
            let date = &cells[1];
            if date.chars().count() <= 5 {
                return None;
            }
            let rating = parse_rating(&cells[4], max_rating)?;
            if trailing_year(date)? <= cutoff_year {
                return None;
            }
            let last_played = match cells.get(5) {
                Some(c) if !c.is_empty() => c.clone(),
                _ => date.clone(),
            };
            Some(HistoryRow {
                period_id,
                date: date.clone(),
                rating,
                last_played,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page(rows: &str) -> String {
        format!(
            "<html><body><table>\
             <tr><th>Period</th><th>Date</th><th>Prov</th><th>Sex</th><th>Rating</th></tr>\
             {rows}</table></body></html>"
        )
    }

    #[test]
    fn cutoff_is_exclusive() {
        let html = page(
            "<tr><td>100</td><td>March 4, 2009</td><td>ON</td><td>F</td><td>1200</td></tr>\
             <tr><td>150</td><td>May 1, 2010</td><td>ON</td><td>F</td><td>1250</td></tr>\
             <tr><td>200</td><td>March 4, 2019</td><td>ON</td><td>F</td><td>1400</td></tr>",
        );
        let rows = extract_history(&html, 2010, 4000);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].period_id, 200);
        assert_eq!(rows[0].date, "March 4, 2019");
        assert_eq!(rows[0].rating, 1400);
        assert_eq!(rows[0].last_played, "March 4, 2019");
    }

    #[test]
    fn sixth_column_is_last_played() {
        let html = page(
            "<tr><td>300</td><td>Jan 9, 2021</td><td>QC</td><td>M</td><td>1800</td><td>Dec 12, 2020</td></tr>\
             <tr><td>301</td><td>Feb 9, 2021</td><td>QC</td><td>M</td><td>1810</td><td></td></tr>",
        );
        let rows = extract_history(&html, 2010, 4000);
        assert_eq!(rows[0].last_played, "Dec 12, 2020");
        assert_eq!(rows[1].last_played, "Feb 9, 2021");
    }

    #[test]
    fn malformed_rows_skipped() {
        let html = page(
            "<tr><td>abc</td><td>Jan 9, 2021</td><td>QC</td><td>M</td><td>1800</td></tr>\
             <tr><td>1</td><td>2021</td><td>QC</td><td>M</td><td>1800</td></tr>\
             <tr><td>2</td><td>Jan 9, 2021</td><td>QC</td><td>M</td><td>n/a</td></tr>\
             <tr><td>3</td><td>Jan 9, 2021</td><td>QC</td><td>M</td><td>5000</td></tr>\
             <tr><td>4</td><td>sometime soon</td><td>QC</td><td>M</td><td>1800</td></tr>\
             <tr><td>5</td><td>Jan 9, 2021</td><td>QC</td><td>M</td></tr>",
        );
        assert!(extract_history(&html, 2010, 4000).is_empty());
    }

    #[test]
    fn rows_from_every_table() {
        let html = "<html><body>\
            <table><tr><td>6</td><td>June 1, 2014</td><td>BC</td><td>F</td><td>880</td></tr></table>\
            <p>Club results</p>\
            <table><tr><td>7</td><td>June 1, 2015</td><td>BC</td><td>F</td><td>900</td></tr></table>\
            </body></html>";
        let ids: Vec<u32> = extract_history(html, 2010, 4000)
            .iter()
            .map(|r| r.period_id)
            .collect();
        assert_eq!(ids, vec![6, 7]);
    }

    #[test]
    fn trailing_year_parsing() {
        assert_eq!(trailing_year("March 4, 2019 "), Some(2019));
        assert_eq!(trailing_year("2019-03-04"), None);
        assert_eq!(trailing_year("n/a"), None);
    }
}
