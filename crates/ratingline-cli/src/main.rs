//! ratingline - TTCAN rating harvester
//!
//! Scrapes the TTCAN table tennis rating lists, checkpoints progress so
//! long runs can resume, and uploads the result to Google Sheets.

use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

mod cmd;
mod config;

use config::Config;

#[derive(Parser)]
#[command(name = "ratingline")]
#[command(about = "Harvest TTCAN player ratings into a spreadsheet")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Enable debug logging
    #[arg(long, global = true)]
    debug: bool,

    /// Config file path (default: ./ratingline.toml or ~/.config/ratingline/config.toml)
    #[arg(short, long, global = true)]
    config: Option<std::path::PathBuf>,

    /// Maximum attempts per page fetch, including the first
    #[arg(long, global = true)]
    max_retries: Option<u32>,
}

#[derive(Subcommand)]
enum Command {
    /// Scrape ratings (fresh or resumed session) and upload them
    Harvest(cmd::harvest::HarvestArgs),
    /// Upload an already harvested session
    Upload(cmd::upload::UploadArgs),
    /// Show saved sessions and their checkpoints
    Status(cmd::status::StatusArgs),
    /// Find a player and dump the structure of their detail page
    DebugPlayer(cmd::debug::DebugArgs),
    /// Show current configuration
    Config,
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    // Load configuration (file, then environment; CLI flags below)
    let config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };

    // Progress context (TTY auto-detect)
    let progress = ratingline_core::ProgressContext::new();

    // Logging:
    //   TTY:     info above the progress bars, debug with --debug
    //   non-TTY: plain lines on stderr
    let multi = if progress.is_tty() {
        Some(progress.multi())
    } else {
        None
    };
    ratingline_core::init_logging(false, cli.debug, multi, config.storage.log_file.as_deref())
        .context("Failed to initialize logging")?;
    match &config.origin {
        Some(path) => log::debug!("Loaded config from {}", path.display()),
        None => log::debug!("No config file found, using defaults"),
    }

    ratingline_core::install_signal_handlers().context("Failed to install signal handlers")?;

    let mut retry = config.retry_policy();
    if let Some(n) = cli.max_retries {
        retry.max_attempts = n;
    }

    match cli.command {
        Command::Harvest(args) => cmd::harvest::run(args, &config, retry, &progress),
        Command::Upload(args) => cmd::upload::run(args, &config, retry, &progress),
        Command::Status(args) => cmd::status::run(args, &config).map(|()| ExitCode::SUCCESS),
        Command::DebugPlayer(args) => cmd::debug::run(args, &config, retry),
        Command::Config => {
            use comfy_table::{
                Cell, Color, Table, modifiers::UTF8_ROUND_CORNERS, presets::UTF8_FULL,
            };

            let harvest = config.harvest_config();
            let upload = config.upload_policy();

            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .apply_modifier(UTF8_ROUND_CORNERS)
                .set_header(vec![
                    Cell::new("Setting").fg(Color::Cyan),
                    Cell::new("Value").fg(Color::Cyan),
                ]);

            table.add_row(vec![
                "Config file",
                &config
                    .origin
                    .as_ref()
                    .map_or("(defaults)".to_string(), |p| p.display().to_string()),
            ]);
            table.add_row(vec!["Base URL", &harvest.base_url]);
            table.add_row(vec![
                "Category / period",
                &format!("{} / {}", harvest.category_code, harvest.period_issued),
            ]);
            table.add_row(vec!["Partitions", &format!("{:?}", harvest.partitions)]);
            table.add_row(vec!["Max rating", &harvest.max_rating.to_string()]);
            table.add_row(vec![
                "History",
                &format!(
                    "{} (after {})",
                    if harvest.with_history { "on" } else { "off" },
                    harvest.history_cutoff_year
                ),
            ]);
            table.add_row(vec![
                "Detail workers",
                &format!(
                    "{} with history, {} without",
                    harvest.workers_with_history, harvest.workers_plain
                ),
            ]);
            table.add_row(vec![
                "Checkpoint interval",
                &format!("{} pages", harvest.checkpoint_interval),
            ]);
            table.add_row(vec![
                "Timeouts",
                &format!(
                    "listing {}s, detail {}s",
                    harvest.listing_timeout.as_secs(),
                    harvest.detail_timeout.as_secs()
                ),
            ]);
            table.add_row(vec![
                "Retries",
                &format!("{} attempts, base {:?}", retry.max_attempts, retry.base_delay),
            ]);
            table.add_row(vec![
                "Upload batches",
                &format!("{} rows, {:?} apart", upload.batch_size, upload.batch_delay),
            ]);
            table.add_row(vec![
                "Spreadsheet",
                config.sheets.spreadsheet_id.as_deref().unwrap_or("not set"),
            ]);
            table.add_row(vec![
                "Access token",
                if config.sheets.access_token.is_some() {
                    "configured"
                } else {
                    "not set"
                },
            ]);
            table.add_row(vec![
                "Sheets",
                &format!(
                    "{} / {}",
                    config.sheets.records_sheet, config.sheets.history_sheet
                ),
            ]);
            table.add_row(vec![
                "Session dir",
                &config.storage.dir.display().to_string(),
            ]);

            eprintln!("\n{table}");
            Ok(ExitCode::SUCCESS)
        }
    }
}
