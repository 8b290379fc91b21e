//! Shared fakes for pipeline tests

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use anyhow::Result;
use chrono::NaiveDate;
use ratingline_core::FetchError;
use ratingline_store::{Checkpoint, DurableStore, MemoryStore};
use ratingline_ttcan::{HarvestConfig, PageSource, Record};

pub const BASE: &str = "http://ratings.test/ratingSystem/list.asp";

pub fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 7, 6).unwrap()
}

pub fn config() -> HarvestConfig {
    HarvestConfig {
        base_url: BASE.to_string(),
        page_delay: Duration::ZERO,
        checkpoint_interval: 2,
        ..HarvestConfig::default()
    }
}

/// One listing row: (name, rating, province)
pub type Player = (&'static str, u32, &'static str);

pub fn listing_html(players: &[Player]) -> String {
    let mut html = String::from(
        r#"<html><body><table class="resultTable"><tr><th>#</th><th>Name</th><th>Prov</th><th>Sex</th><th>Rating</th><th>Period</th><th>Last</th></tr>"#,
    );
    for (i, (name, rating, province)) in players.iter().enumerate() {
        html.push_str(&format!(
            r#"<tr><td>{i}</td><td><a href="player.asp?name={name}">{name}</a></td><td>{province}</td><td>F</td><td>{rating}</td><td>July 6, 2025</td><td>2025-06-14</td></tr>"#
        ));
    }
    html.push_str("</table></body></html>");
    html
}

/// `pages` pages of `per_page` distinct players each
pub fn numbered_pages(prefix: &str, pages: u32, per_page: u32) -> Vec<String> {
    (1..=pages)
        .map(|p| {
            let rows: Vec<String> = (0..per_page)
                .map(|i| {
                    format!(
                        r#"<tr><td>{i}</td><td><a href="player.asp?name={prefix}{p}_{i}">{prefix}{p}_{i}</a></td><td>ON</td><td>F</td><td>{}</td><td>July 6, 2025</td><td>2025-06-14</td></tr>"#,
                        1000 + p * 10 + i
                    )
                })
                .collect();
            format!(
                r#"<table class="resultTable"><tr><th>h</th></tr>{}</table>"#,
                rows.concat()
            )
        })
        .collect()
}

/// Fake rating site: listing pages per partition, canned detail pages,
/// and an optional listing page that always fails.
#[derive(Default)]
pub struct FakeSite {
    pub partitions: HashMap<String, Vec<String>>,
    pub details: HashMap<String, String>,
    pub fail_at: Mutex<Option<(String, u32)>>,
    pub listing_calls: Mutex<Vec<(String, u32)>>,
}

impl FakeSite {
    pub fn with_partition(mut self, partition: &str, pages: Vec<String>) -> Self {
        self.partitions.insert(partition.to_string(), pages);
        self
    }

    pub fn with_detail(mut self, name: &str, html: &str) -> Self {
        self.details.insert(
            format!("http://ratings.test/ratingSystem/player.asp?name={name}"),
            html.to_string(),
        );
        self
    }

    pub fn fail_at(&self, partition: &str, page: u32) {
        *self.fail_at.lock().unwrap() = Some((partition.to_string(), page));
    }

    pub fn heal(&self) {
        *self.fail_at.lock().unwrap() = None;
    }

    pub fn calls(&self) -> Vec<(String, u32)> {
        self.listing_calls.lock().unwrap().clone()
    }
}

impl PageSource for FakeSite {
    fn listing(&self, partition: &str, page: u32) -> Result<String, FetchError> {
        self.listing_calls
            .lock()
            .unwrap()
            .push((partition.to_string(), page));
        if let Some((p, n)) = self.fail_at.lock().unwrap().as_ref() {
            if p == partition && *n == page {
                return Err(FetchError::Timeout("listing timed out".into()));
            }
        }
        let pages = self.partitions.get(partition);
        Ok(pages
            .and_then(|ps| ps.get(page as usize - 1))
            .cloned()
            .unwrap_or_else(|| listing_html(&[])))
    }

    fn detail(&self, link: &str) -> Result<String, FetchError> {
        self.details.get(link).cloned().ok_or(FetchError::Http {
            status: 404,
            message: "Not Found".into(),
        })
    }
}

/// Memory store that remembers every checkpoint written, together with the
/// size of the records snapshot at that moment.
#[derive(Default)]
pub struct RecordingStore {
    inner: MemoryStore,
    pub checkpoints: Mutex<Vec<(Checkpoint, usize)>>,
}

impl RecordingStore {
    pub fn history(&self) -> Vec<(Checkpoint, usize)> {
        self.checkpoints.lock().unwrap().clone()
    }
}

impl DurableStore for RecordingStore {
    fn put(&self, session: &str, kind: &str, bytes: &[u8]) -> Result<()> {
        if kind == "checkpoint" {
            let cp: Checkpoint = serde_json::from_slice(bytes)?;
            let snapshot: Vec<Record> = match self.inner.get(session, "records")? {
                Some(b) => serde_json::from_slice(&b)?,
                None => Vec::new(),
            };
            self.checkpoints.lock().unwrap().push((cp, snapshot.len()));
        }
        self.inner.put(session, kind, bytes)
    }

    fn get(&self, session: &str, kind: &str) -> Result<Option<Vec<u8>>> {
        self.inner.get(session, kind)
    }

    fn remove(&self, session: &str, kind: &str) -> Result<()> {
        self.inner.remove(session, kind)
    }

    fn sessions(&self) -> Result<Vec<String>> {
        self.inner.sessions()
    }

    fn purge(&self, session: &str) -> Result<()> {
        self.inner.purge(session)
    }
}
