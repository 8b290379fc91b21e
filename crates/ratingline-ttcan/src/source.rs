//! Page sources: where listing and detail HTML comes from

use ratingline_core::{FetchError, RetryingFetcher, Transport};

use crate::config::HarvestConfig;

/// Listing and detail pages of the rating site.
///
/// `Sync` because detail pages are fetched from worker threads.
pub trait PageSource: Sync {
    /// Listing page `page` (1-based) of `partition`
    fn listing(&self, partition: &str, page: u32) -> Result<String, FetchError>;
    /// Detail page behind a resolved link
    fn detail(&self, link: &str) -> Result<String, FetchError>;
}

/// Live TTCAN site over a retrying transport
pub struct TtcanSource<'a, T: Transport> {
    fetcher: RetryingFetcher<'a, T>,
    config: &'a HarvestConfig,
}

impl<'a, T: Transport> TtcanSource<'a, T> {
    pub fn new(fetcher: RetryingFetcher<'a, T>, config: &'a HarvestConfig) -> Self {
        Self { fetcher, config }
    }
}

impl<T: Transport> PageSource for TtcanSource<'_, T> {
    fn listing(&self, partition: &str, page: u32) -> Result<String, FetchError> {
        let params = [
            ("Category_code", self.config.category_code.clone()),
            ("Period_Issued", self.config.period_issued.clone()),
            ("Sex", partition.to_string()),
            ("Formv_ctta_ratings_Page", page.to_string()),
        ];
        self.fetcher
            .fetch(&self.config.base_url, &params, self.config.listing_timeout)
    }

    fn detail(&self, link: &str) -> Result<String, FetchError> {
        self.fetcher.fetch(link, &[], self.config.detail_timeout)
    }
}
