//! Listing page extraction
//!
//! The listing is a `table.resultTable` whose first row is a header. Data
//! rows carry at least seven cells: rank, name (linking to the player's
//! detail page), province, gender, rating, period, last played.

use std::sync::LazyLock;

use reqwest::Url;
use scraper::{ElementRef, Html, Selector};

use crate::record::{Candidate, Record};

static RESULT_TABLE: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("table.resultTable").expect("valid selector"));
static ROW: LazyLock<Selector> = LazyLock::new(|| Selector::parse("tr").expect("valid selector"));
static LINK: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("a[href]").expect("valid selector"));

/// Cells a data row needs before it is considered at all
pub const MIN_CELLS: usize = 7;

/// Outcome of parsing one listing page
#[derive(Debug, Default)]
pub struct ListingPage {
    pub records: Vec<Record>,
    /// Rows skipped for having fewer than [`MIN_CELLS`] cells
    pub short_rows: usize,
    /// Rows with enough cells that failed validation
    pub invalid_rows: usize,
    pub table_found: bool,
}

impl ListingPage {
    /// A page without valid records ends the partition
    pub fn is_exhausted(&self) -> bool {
        self.records.is_empty()
    }
}

/// Text of an element with every text node trimmed and concatenated
pub fn cell_text(el: ElementRef<'_>) -> String {
    el.text().map(str::trim).collect()
}

/// Direct `td`/`th` children of a row
pub fn row_cells<'a>(row: ElementRef<'a>, with_th: bool) -> Vec<ElementRef<'a>> {
    row.children()
        .filter_map(ElementRef::wrap)
        .filter(|c| {
            let name = c.value().name();
            name == "td" || (with_th && name == "th")
        })
        .collect()
}

/// Resolve a detail link against the listing URL.
///
/// `/x` resolves against the origin, absolute links are kept, anything else
/// is relative to the listing's directory.
pub fn resolve_link(base_url: &str, href: &str) -> Option<String> {
    let href = href.trim();
    if href.is_empty() {
        return None;
    }
    match Url::parse(base_url) {
        Ok(base) => base.join(href).ok().map(String::from),
        Err(_) => Url::parse(href).ok().map(String::from),
    }
}

/// Rows of the result table with enough cells, before validation.
///
/// `None` when the page has no result table.
pub fn scan_listing(html: &str, base_url: &str) -> Option<(Vec<Candidate>, usize)> {
    let doc = Html::parse_document(html);
    let table = doc.select(&RESULT_TABLE).next()?;

    let mut candidates = Vec::new();
    let mut short_rows = 0;
    for row in table.select(&ROW).skip(1) {
        let cells = row_cells(row, false);
        if cells.len() < MIN_CELLS {
            short_rows += 1;
            continue;
        }
        let detail_link = cells[1]
            .select(&LINK)
            .next()
            .and_then(|a| a.value().attr("href"))
            .and_then(|href| resolve_link(base_url, href));
        candidates.push(Candidate {
            name: cell_text(cells[1]),
            province: cell_text(cells[2]),
            gender: cell_text(cells[3]),
            rating: cell_text(cells[4]),
            period: cell_text(cells[5]),
            last_played: cell_text(cells[6]),
            detail_link,
        });
    }
    Some((candidates, short_rows))
}

/// Parse one listing page into validated records.
///
/// A missing table and a header-only table both yield an empty page.
pub fn parse_listing(html: &str, base_url: &str, max_rating: u32) -> ListingPage {
    let Some((candidates, short_rows)) = scan_listing(html, base_url) else {
        return ListingPage::default();
    };

    let mut page = ListingPage {
        short_rows,
        table_found: true,
        ..ListingPage::default()
    };
    for candidate in candidates {
        match Record::from_candidate(candidate.clone(), max_rating) {
            Some(record) => page.records.push(record),
            None => {
                log::warn!("invalid player row: {candidate:?}");
                page.invalid_rows += 1;
            }
        }
    }
    page
}
