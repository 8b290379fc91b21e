//! Debug-player subcommand - inspect a player's detail page

use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Args;
use ratingline_core::{HttpTransport, RetryPolicy, RetryingFetcher};
use ratingline_ttcan::TtcanSource;
use ratingline_ttcan::debug::find_player;

use crate::config::Config;

#[derive(Args, Debug)]
pub struct DebugArgs {
    /// Player name, or part of it (case-insensitive)
    pub name: String,

    /// Listing pages to search
    #[arg(short, long, default_value_t = 50)]
    pub pages: u32,
}

pub fn run(args: DebugArgs, config: &Config, retry: RetryPolicy) -> Result<ExitCode> {
    let http = HttpTransport::new().context("Failed to start HTTP runtime")?;
    let harvest = config.harvest_config();
    let source = TtcanSource::new(RetryingFetcher::new(&http, retry), &harvest);

    log::info!("searching {} listing pages for {:?}", args.pages, args.name);
    let found = find_player(
        &source,
        &harvest,
        &args.name,
        args.pages,
        chrono::Local::now().date_naive(),
    )
    .context("Failed to fetch player pages")?;

    let Some(player) = found else {
        println!("Player {} not found", args.name);
        return Ok(ExitCode::from(1));
    };

    println!("Player: {}", player.name);
    println!("Detail page: {}", player.link);
    println!("Found {} tables on the page", player.tables.len());
    for (i, table) in player.tables.iter().enumerate() {
        println!("\n=== TABLE {} ===", i + 1);
        println!("Table has {} rows", table.rows);
        for (j, row) in table.sample.iter().enumerate() {
            println!("Row {} ({} cols): {:?}", j + 1, row.len(), row);
        }
    }
    println!();
    println!("Age: {}", player.age.as_deref().unwrap_or("not found"));
    println!(
        "History rows after {}: {}",
        harvest.history_cutoff_year, player.history_rows
    );
    Ok(ExitCode::SUCCESS)
}
