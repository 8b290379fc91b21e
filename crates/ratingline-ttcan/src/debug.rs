//! Player lookup for inspecting detail page layouts

use std::sync::LazyLock;

use chrono::NaiveDate;
use ratingline_core::FetchError;
use scraper::{Html, Selector};

use crate::age::extract_age;
use crate::config::HarvestConfig;
use crate::extract::{cell_text, row_cells, scan_listing};
use crate::history::extract_history;
use crate::source::PageSource;

static TABLE: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("table").expect("valid selector"));
static ROW: LazyLock<Selector> = LazyLock::new(|| Selector::parse("tr").expect("valid selector"));

/// Rows shown per table
const SAMPLE_ROWS: usize = 5;

#[derive(Debug)]
pub struct TableSample {
    pub rows: usize,
    /// First rows, as cell texts
    pub sample: Vec<Vec<String>>,
}

/// Structure of a player's detail page and what the extractors make of it
#[derive(Debug)]
pub struct PlayerPage {
    pub name: String,
    pub link: String,
    pub tables: Vec<TableSample>,
    pub age: Option<String>,
    pub history_rows: usize,
}

pub fn sample_tables(html: &str) -> Vec<TableSample> {
    let doc = Html::parse_document(html);
    doc.select(&TABLE)
        .map(|table| {
            let rows: Vec<_> = table.select(&ROW).collect();
            let sample = rows
                .iter()
                .take(SAMPLE_ROWS)
                .map(|row| row_cells(*row, true).into_iter().map(cell_text).collect())
                .collect();
            TableSample {
                rows: rows.len(),
                sample,
            }
        })
        .collect()
}

/// Search the all-gender listing for a name (case-insensitive substring)
/// and fetch the first match's detail page.
///
/// Returns `Ok(None)` if no linked player matches within `max_pages`.
pub fn find_player(
    source: &dyn PageSource,
    config: &HarvestConfig,
    needle: &str,
    max_pages: u32,
    today: NaiveDate,
) -> Result<Option<PlayerPage>, FetchError> {
    let needle = needle.to_uppercase();
    for page in 1..=max_pages {
        let html = source.listing("", page)?;
        let Some((candidates, _)) = scan_listing(&html, &config.base_url) else {
            log::info!("no result table on page {page}, stopping search");
            break;
        };
        for candidate in candidates {
            if !candidate.name.to_uppercase().contains(&needle) {
                continue;
            }
            let Some(link) = candidate.detail_link else {
                log::info!("found {} on page {page}, but without a link", candidate.name);
                continue;
            };
            log::info!("found {} on page {page}: {link}", candidate.name);
            let detail = source.detail(&link)?;
            return Ok(Some(PlayerPage {
                name: candidate.name,
                link,
                tables: sample_tables(&detail),
                age: extract_age(&detail, today),
                history_rows: extract_history(
                    &detail,
                    config.history_cutoff_year,
                    config.max_rating,
                )
                .len(),
            }));
        }
    }
    Ok(None)
}
