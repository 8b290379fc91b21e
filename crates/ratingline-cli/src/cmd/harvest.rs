//! Harvest subcommand - scrape, checkpoint and upload

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::Args;
use ratingline_core::{ProgressContext, RetryPolicy};
use ratingline_ttcan::{Mode, RunOptions};

use crate::config::Config;

#[derive(Args, Debug)]
pub struct HarvestArgs {
    /// Session id (default: timestamp for fresh runs, latest session with --resume)
    #[arg(short, long)]
    pub session: Option<String>,

    /// Continue an interrupted or failed session
    #[arg(short, long)]
    pub resume: bool,

    /// Also collect rating history from detail pages
    #[arg(long)]
    pub history: bool,

    /// Skip detail pages (no ages, no history)
    #[arg(long, conflicts_with = "history")]
    pub no_details: bool,

    /// Last listing page to fetch per partition
    #[arg(short, long)]
    pub max_pages: Option<u32>,

    /// Gender partitions to harvest, e.g. `F,M` (overrides config)
    #[arg(long, value_delimiter = ',')]
    pub partitions: Option<Vec<String>>,

    /// Write JSON-lines tables to this directory instead of the spreadsheet
    #[arg(long, value_name = "DIR")]
    pub dry_run: Option<PathBuf>,
}

pub fn run(
    args: HarvestArgs,
    config: &Config,
    retry: RetryPolicy,
    progress: &ProgressContext,
) -> Result<ExitCode> {
    let mut harvest = config.harvest_config();
    harvest.max_pages = args.max_pages;
    if args.history {
        harvest.with_history = true;
    }
    if args.no_details {
        harvest.fetch_details = false;
    }
    if let Some(partitions) = args.partitions {
        harvest.partitions = partitions;
    }

    log::info!(
        "harvest: period {}, partitions {:?}, history {}, {} detail workers",
        harvest.period_issued,
        harvest.partitions,
        if harvest.with_history { "on" } else { "off" },
        harvest.workers()
    );

    let options = RunOptions {
        mode: if args.resume { Mode::Resume } else { Mode::Fresh },
        session_id: args.session,
    };
    super::execute(
        config,
        &harvest,
        retry,
        &options,
        args.dry_run.as_deref(),
        progress,
    )
}
