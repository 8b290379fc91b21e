//! Harvest configuration

use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "http://www.ttcan.ca/ratingSystem/ctta_ratings2.asp";

/// Everything the harvest needs to know about the upstream site and pacing
#[derive(Debug, Clone)]
pub struct HarvestConfig {
    pub base_url: String,
    pub category_code: String,
    pub period_issued: String,
    /// Values of the `Sex` query parameter, harvested in order
    pub partitions: Vec<String>,
    /// Ratings at or above this are rejected
    pub max_rating: u32,
    /// History rows dated in or before this year are dropped
    pub history_cutoff_year: i32,
    pub with_history: bool,
    /// Fetch detail pages for age (and history, if enabled)
    pub fetch_details: bool,
    /// Persist every N pages
    pub checkpoint_interval: u32,
    /// Politeness delay between listing pages
    pub page_delay: Duration,
    /// Last page to fetch per partition
    pub max_pages: Option<u32>,
    pub workers_with_history: usize,
    pub workers_plain: usize,
    pub listing_timeout: Duration,
    pub detail_timeout: Duration,
}

impl Default for HarvestConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            category_code: "1".to_string(),
            period_issued: "412".to_string(),
            partitions: vec!["F".to_string()],
            max_rating: 3500,
            history_cutoff_year: 2010,
            with_history: false,
            fetch_details: true,
            checkpoint_interval: 5,
            page_delay: Duration::from_secs(1),
            max_pages: None,
            workers_with_history: 3,
            workers_plain: 8,
            listing_timeout: Duration::from_secs(30),
            detail_timeout: Duration::from_secs(15),
        }
    }
}

impl HarvestConfig {
    /// Detail-page worker count for the current mode
    pub fn workers(&self) -> usize {
        if self.with_history {
            self.workers_with_history
        } else {
            self.workers_plain
        }
    }
}
