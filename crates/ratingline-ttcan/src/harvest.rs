//! Page-by-page harvest with periodic checkpoints
//!
//! One coordinating thread walks each partition's listing pages in order.
//! Each page is fetched, extracted and enriched before its records are
//! accumulated; a page interrupted mid-enrichment is discarded whole.
//! Snapshots are always written before the checkpoint that describes them.

use anyhow::Result;
use chrono::Utc;
use ratingline_core::{ProgressContext, fmt_num, is_shutdown_requested};
use ratingline_store::{Artifact, Checkpoint, CheckpointStatus, SessionStore};

use crate::config::HarvestConfig;
use crate::enrich::DetailEnricher;
use crate::extract::parse_listing;
use crate::record::{HistoryEntry, Record};
use crate::source::PageSource;

/// How a harvest run ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HarvestOutcome {
    /// Every partition ran to its last page
    Completed,
    /// Shutdown requested; state persisted for resume
    Interrupted,
    /// A listing page could not be fetched
    Failed { partition: String, page: u32, error: String },
}

/// Accumulated data and checkpoint of one session
#[derive(Debug)]
pub struct HarvestState {
    pub checkpoint: Checkpoint,
    pub records: Vec<Record>,
    pub history: Vec<HistoryEntry>,
    /// Records or history changed since the snapshots were last written
    dirty: bool,
}

impl HarvestState {
    pub fn new(checkpoint: Checkpoint) -> Self {
        Self::resumed(checkpoint, Vec::new(), Vec::new())
    }

    /// State rebuilt from a checkpoint and the snapshots written with it
    pub fn resumed(checkpoint: Checkpoint, records: Vec<Record>, history: Vec<HistoryEntry>) -> Self {
        Self {
            checkpoint,
            records,
            history,
            dirty: false,
        }
    }

    /// Load checkpoint and snapshots of an existing session
    pub fn load(session: &SessionStore<'_>) -> Result<Option<Self>> {
        let Some(checkpoint) = session.load_checkpoint()? else {
            return Ok(None);
        };
        let records = session.load_snapshot(Artifact::Records)?;
        let history = session.load_snapshot(Artifact::History)?;
        Ok(Some(Self::resumed(checkpoint, records, history)))
    }
}

fn partition_label(partition: &str) -> &str {
    if partition.is_empty() { "all" } else { partition }
}

/// Drives listing pagination, enrichment and checkpointing
pub struct HarvestLoop<'a> {
    source: &'a dyn PageSource,
    session: &'a SessionStore<'a>,
    config: &'a HarvestConfig,
    enricher: DetailEnricher<'a>,
    progress: &'a ProgressContext,
}

impl<'a> HarvestLoop<'a> {
    pub fn new(
        source: &'a dyn PageSource,
        session: &'a SessionStore<'a>,
        config: &'a HarvestConfig,
        today: chrono::NaiveDate,
        progress: &'a ProgressContext,
    ) -> Self {
        Self {
            source,
            session,
            config,
            enricher: DetailEnricher::new(source, config, today),
            progress,
        }
    }

    /// Write snapshots (if changed), then the checkpoint with `status`
    fn persist(&self, state: &mut HarvestState, status: CheckpointStatus) -> Result<()> {
        if state.dirty {
            self.session.save_snapshot(Artifact::Records, &state.records)?;
            self.session.save_snapshot(Artifact::History, &state.history)?;
            state.dirty = false;
        }
        let cp = &mut state.checkpoint;
        cp.players_count = state.records.len();
        cp.history_count = state.history.len();
        cp.status = status;
        cp.timestamp = Utc::now();
        self.session.save_checkpoint(cp)
    }

    /// Harvest every configured partition not yet completed.
    ///
    /// Store failures are errors; fetch failures and interrupts are
    /// outcomes, reported after the state has been persisted.
    pub fn run(&self, state: &mut HarvestState) -> Result<HarvestOutcome> {
        if !self.config.with_history {
            self.session.discard_snapshot(Artifact::History)?;
            state.history.clear();
        }

        let mut pages_this_run = 0u32;
        let mut fetched_any = false;

        for partition in &self.config.partitions {
            let label = partition_label(partition);
            if state.checkpoint.is_partition_done(partition) {
                log::info!("partition {label}: already harvested, skipping");
                continue;
            }

            let mut page = state.checkpoint.resume_page(partition);
            if state.checkpoint.partition != *partition {
                state.checkpoint.partition = partition.clone();
                state.checkpoint.last_completed_page = 0;
            }
            if page > 1 {
                log::info!("partition {label}: resuming at page {page}");
            }
            let line = self.progress.partition_line(label);

            loop {
                if self.config.max_pages.is_some_and(|max| page > max) {
                    log::info!("partition {label}: reached page limit");
                    break;
                }
                if is_shutdown_requested() {
                    log::warn!("shutdown requested, stopping before {label} page {page}");
                    self.persist(state, CheckpointStatus::Interrupted)?;
                    line.finish_and_clear();
                    return Ok(HarvestOutcome::Interrupted);
                }
                if fetched_any {
                    std::thread::sleep(self.config.page_delay);
                }
                fetched_any = true;

                line.set_message(format!("page {page}: fetching"));
                let html = match self.source.listing(partition, page) {
                    Ok(html) => html,
                    Err(e) => {
                        log::error!("partition {label}: page {page} failed: {e}");
                        self.persist(state, CheckpointStatus::Failed)?;
                        line.abandon_with_message(format!("failed at page {page}"));
                        return Ok(HarvestOutcome::Failed {
                            partition: partition.clone(),
                            page,
                            error: e.to_string(),
                        });
                    }
                };

                let listing = parse_listing(&html, &self.config.base_url, self.config.max_rating);
                if listing.is_exhausted() {
                    log::info!(
                        "partition {label}: page {page} has no valid players, partition done"
                    );
                    break;
                }

                line.set_message(format!(
                    "page {page}: {} detail pages",
                    listing.records.len()
                ));
                let enriched = self.enricher.enrich_page(listing.records);
                if is_shutdown_requested() {
                    log::warn!("shutdown requested, discarding {label} page {page}");
                    self.persist(state, CheckpointStatus::Interrupted)?;
                    line.finish_and_clear();
                    return Ok(HarvestOutcome::Interrupted);
                }

                let found = enriched.records.len();
                state.records.extend(enriched.records);
                state.history.extend(enriched.history);
                state.dirty = true;
                state.checkpoint.last_completed_page = page;
                pages_this_run += 1;

                log::info!(
                    "partition {label}: page {page}: {found} players ({} total, {} history)",
                    fmt_num(state.records.len()),
                    fmt_num(state.history.len())
                );
                line.set_message(format!(
                    "page {page}: {} players",
                    fmt_num(state.records.len())
                ));

                if pages_this_run % self.config.checkpoint_interval.max(1) == 0 {
                    self.persist(state, CheckpointStatus::Scraping)?;
                }
                page += 1;
            }

            state.checkpoint.completed_partitions.push(partition.clone());
            self.persist(state, CheckpointStatus::Scraping)?;
            line.finish_with_message(format!(
                "done, {} players",
                fmt_num(state.records.len())
            ));
        }

        self.persist(state, CheckpointStatus::Scraped)?;
        log::info!(
            "harvest complete: {} players, {} history entries",
            fmt_num(state.records.len()),
            fmt_num(state.history.len())
        );
        Ok(HarvestOutcome::Completed)
    }
}
