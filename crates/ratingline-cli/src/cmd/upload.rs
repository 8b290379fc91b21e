//! Upload subcommand - push a harvested session without scraping

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::Args;
use ratingline_core::{ProgressContext, RetryPolicy};
use ratingline_ttcan::{Mode, RunOptions};

use crate::config::Config;

#[derive(Args, Debug)]
pub struct UploadArgs {
    /// Session to upload (default: latest)
    #[arg(short, long)]
    pub session: Option<String>,

    /// Write JSON-lines tables to this directory instead of the spreadsheet
    #[arg(long, value_name = "DIR")]
    pub dry_run: Option<PathBuf>,
}

pub fn run(
    args: UploadArgs,
    config: &Config,
    retry: RetryPolicy,
    progress: &ProgressContext,
) -> Result<ExitCode> {
    let options = RunOptions {
        mode: Mode::Cached,
        session_id: args.session,
    };
    super::execute(
        config,
        &config.harvest_config(),
        retry,
        &options,
        args.dry_run.as_deref(),
        progress,
    )
}
