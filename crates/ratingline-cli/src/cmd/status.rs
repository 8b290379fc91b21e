//! Status subcommand - report saved sessions

use anyhow::Result;
use clap::Args;
use comfy_table::{Cell, Color, Table, modifiers::UTF8_ROUND_CORNERS, presets::UTF8_FULL};
use ratingline_store::{Checkpoint, CheckpointStatus, FileStore};

use crate::config::Config;

#[derive(Args, Debug)]
pub struct StatusArgs {
    /// Only show this session
    #[arg(short, long)]
    pub session: Option<String>,
}

fn status_color(status: CheckpointStatus) -> Color {
    match status {
        CheckpointStatus::Scraped => Color::Green,
        CheckpointStatus::Scraping | CheckpointStatus::Uploading => Color::Yellow,
        CheckpointStatus::Interrupted => Color::Magenta,
        CheckpointStatus::Failed | CheckpointStatus::UploadFailed => Color::Red,
    }
}

/// `records 2/3, history done`
fn upload_summary(cp: &Checkpoint) -> String {
    if cp.upload_state.is_empty() {
        return "-".to_string();
    }
    cp.upload_state
        .iter()
        .map(|(dest, p)| {
            if p.completed {
                format!("{dest} done")
            } else {
                format!("{dest} {}/{}", p.batches_done, p.total_batches)
            }
        })
        .collect::<Vec<_>>()
        .join(", ")
}

fn partition_summary(cp: &Checkpoint) -> String {
    let current = if cp.partition.is_empty() { "all" } else { &cp.partition };
    if cp.completed_partitions.is_empty() {
        current.to_string()
    } else {
        format!("{current} (done: {})", cp.completed_partitions.join(","))
    }
}

pub fn run(args: StatusArgs, config: &Config) -> Result<()> {
    let store = FileStore::new(&config.storage.dir)?;
    let sessions: Vec<Checkpoint> = ratingline_ttcan::list_sessions(&store)?
        .into_iter()
        .filter(|cp| args.session.as_ref().map_or(true, |id| *id == cp.session_id))
        .collect();

    if sessions.is_empty() {
        match &args.session {
            Some(id) => eprintln!("No checkpoint for session {id}"),
            None => eprintln!("No saved sessions in {}", config.storage.dir.display()),
        }
        return Ok(());
    }

    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_header(vec![
            Cell::new("Session").fg(Color::Cyan),
            Cell::new("Status").fg(Color::Cyan),
            Cell::new("Partition").fg(Color::Cyan),
            Cell::new("Page").fg(Color::Cyan),
            Cell::new("Players").fg(Color::Cyan),
            Cell::new("History").fg(Color::Cyan),
            Cell::new("Upload").fg(Color::Cyan),
            Cell::new("Updated").fg(Color::Cyan),
        ]);

    for cp in &sessions {
        table.add_row(vec![
            Cell::new(&cp.session_id),
            Cell::new(cp.status).fg(status_color(cp.status)),
            Cell::new(partition_summary(cp)),
            Cell::new(cp.last_completed_page),
            Cell::new(ratingline_core::fmt_num(cp.players_count)),
            Cell::new(if cp.with_history {
                ratingline_core::fmt_num(cp.history_count)
            } else {
                "-".to_string()
            }),
            Cell::new(upload_summary(cp)),
            Cell::new(
                cp.timestamp
                    .with_timezone(&chrono::Local)
                    .format("%Y-%m-%d %H:%M:%S"),
            ),
        ]);
    }

    eprintln!("\n{table}");
    Ok(())
}
