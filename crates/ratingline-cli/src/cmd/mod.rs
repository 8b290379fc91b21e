//! Subcommands

pub mod debug;
pub mod harvest;
pub mod status;
pub mod upload;

use std::path::Path;
use std::process::ExitCode;

use anyhow::{Context, Result};
use ratingline_core::{
    HttpTransport, JsonlTable, ProgressContext, RetryPolicy, RetryingFetcher, SheetsTable,
};
use ratingline_store::FileStore;
use ratingline_ttcan::{HarvestConfig, RunContext, RunOptions, RunOutcome, TtcanSource, run};

use crate::config::Config;

/// Wire transport, store, source and sink, then run the pipeline.
///
/// `dry_run` replaces the spreadsheet with JSON-lines files in that directory.
pub fn execute(
    config: &Config,
    harvest: &HarvestConfig,
    retry: RetryPolicy,
    options: &RunOptions,
    dry_run: Option<&Path>,
    progress: &ProgressContext,
) -> Result<ExitCode> {
    let http = HttpTransport::new().context("Failed to start HTTP runtime")?;
    let store = FileStore::new(&config.storage.dir)?;
    let source = TtcanSource::new(RetryingFetcher::new(&http, retry), harvest);
    let destinations = config.destinations();
    let ctx = RunContext {
        source: &source,
        store: &store,
        config: harvest,
        policy: config.upload_policy(),
        destinations: &destinations,
        progress,
        today: chrono::Local::now().date_naive(),
    };

    let outcome = match dry_run {
        Some(dir) => {
            let mut table = JsonlTable::new(dir)
                .with_context(|| format!("Cannot create dry-run directory: {}", dir.display()))?;
            log::info!("dry run: writing tables to {}", dir.display());
            run(&ctx, &mut table, options)?
        }
        None => {
            // required before any page is fetched
            let (id, token) = config.sheets.credentials()?;
            let mut table = SheetsTable::new(&http, id, token);
            run(&ctx, &mut table, options)?
        }
    };

    report(&outcome);
    Ok(outcome.exit_code())
}

fn report(outcome: &RunOutcome) {
    match outcome {
        RunOutcome::Completed {
            records,
            history,
            duplicates,
        } => log::info!(
            "done: {} players ({} duplicates dropped), {} history entries",
            ratingline_core::fmt_num(*records),
            duplicates,
            ratingline_core::fmt_num(*history)
        ),
        RunOutcome::NothingToUpload => log::warn!("no players found to upload"),
        RunOutcome::Interrupted => log::warn!("interrupted; progress saved"),
        RunOutcome::ScrapeFailed => log::error!("harvest failed; progress saved"),
        RunOutcome::UploadFailed => log::error!("upload failed; harvested data kept"),
    }
}
