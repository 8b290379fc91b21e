//! Detail page enrichment: age and rating history per player

use chrono::NaiveDate;
use ratingline_core::{FetchError, fan_out};

use crate::age::extract_age;
use crate::config::HarvestConfig;
use crate::history::extract_history;
use crate::record::{HistoryEntry, HistoryRow, Record};
use crate::source::PageSource;

/// What one detail page contributed
#[derive(Debug, Default)]
struct Detail {
    age: Option<String>,
    history: Vec<HistoryRow>,
}

/// Records of one page after enrichment
#[derive(Debug, Default)]
pub struct EnrichedPage {
    pub records: Vec<Record>,
    pub history: Vec<HistoryEntry>,
    /// Detail pages that could not be fetched
    pub failures: usize,
}

/// Fetches detail pages on a bounded pool and folds the results back into
/// the page's records.
pub struct DetailEnricher<'a> {
    source: &'a dyn PageSource,
    config: &'a HarvestConfig,
    today: NaiveDate,
}

impl<'a> DetailEnricher<'a> {
    pub fn new(source: &'a dyn PageSource, config: &'a HarvestConfig, today: NaiveDate) -> Self {
        Self {
            source,
            config,
            today,
        }
    }

    fn parse_detail(&self, html: &str) -> Detail {
        let history = if self.config.with_history {
            extract_history(html, self.config.history_cutoff_year, self.config.max_rating)
        } else {
            Vec::new()
        };
        Detail {
            age: extract_age(html, self.today),
            history,
        }
    }

    /// Enrich `records` in place and collect their history entries.
    ///
    /// A failed detail fetch leaves that record without age or history.
    /// Returns once every started fetch has finished.
    pub fn enrich_page(&self, mut records: Vec<Record>) -> EnrichedPage {
        if !self.config.fetch_details {
            return EnrichedPage {
                records,
                ..EnrichedPage::default()
            };
        }

        let jobs: Vec<(usize, String)> = records
            .iter()
            .enumerate()
            .filter_map(|(i, r)| r.detail_link.clone().map(|link| (i, link)))
            .collect();

        let mut results: Vec<(usize, Result<Detail, FetchError>)> =
            fan_out(jobs, self.config.workers(), |(i, link)| {
                let detail = self.source.detail(link).map(|html| self.parse_detail(&html));
                (*i, detail)
            });
        results.sort_by_key(|(i, _)| *i);

        let mut history = Vec::new();
        let mut failures = 0;
        for (i, detail) in results {
            let record = &mut records[i];
            match detail {
                Ok(detail) => {
                    record.age = detail.age;
                    history.extend(
                        detail
                            .history
                            .into_iter()
                            .map(|row| HistoryEntry::new(row, record)),
                    );
                }
                Err(e) => {
                    failures += 1;
                    log::warn!("{}: detail page unavailable: {e}", record.name);
                }
            }
        }

        EnrichedPage {
            records,
            history,
            failures,
        }
    }
}
