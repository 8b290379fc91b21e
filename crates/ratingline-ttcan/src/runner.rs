//! Session orchestration: fresh, resumed and cached runs

use std::process::ExitCode;

use anyhow::{Context, Result, bail};
use chrono::NaiveDate;
use ratingline_core::{ProgressContext, Tabular, UploadPolicy, fmt_num};
use ratingline_store::{
    Checkpoint, DurableStore, SessionStore, latest_session, new_session_id,
};

use crate::config::HarvestConfig;
use crate::dedup::dedupe;
use crate::harvest::{HarvestLoop, HarvestOutcome, HarvestState};
use crate::source::PageSource;
use crate::upload::{Destinations, Uploader};

/// How a run picks its session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// New session, harvest from page 1
    Fresh,
    /// Continue the given (or latest) session where it stopped
    Resume,
    /// Upload a fully harvested session without fetching anything
    Cached,
}

#[derive(Debug, Clone)]
pub struct RunOptions {
    pub mode: Mode,
    pub session_id: Option<String>,
}

/// Final state of a run
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    /// Uploaded and cleaned up
    Completed {
        records: usize,
        history: usize,
        duplicates: usize,
    },
    /// Harvest produced no records
    NothingToUpload,
    Interrupted,
    ScrapeFailed,
    UploadFailed,
}

impl RunOutcome {
    /// Process exit status: 0 success, 1 failure, 130 interrupted
    pub fn code(&self) -> u8 {
        match self {
            Self::Completed { .. } | Self::NothingToUpload => 0,
            Self::Interrupted => 130,
            Self::ScrapeFailed | Self::UploadFailed => 1,
        }
    }

    pub fn exit_code(&self) -> ExitCode {
        ExitCode::from(self.code())
    }
}

/// Collaborators shared by every run
pub struct RunContext<'a> {
    pub source: &'a dyn PageSource,
    pub store: &'a dyn DurableStore,
    pub config: &'a HarvestConfig,
    pub policy: UploadPolicy,
    pub destinations: &'a Destinations,
    pub progress: &'a ProgressContext,
    /// Reference date for ages
    pub today: NaiveDate,
}

fn pick_session(store: &dyn DurableStore, requested: Option<&str>) -> Result<String> {
    match requested {
        Some(id) => Ok(id.to_string()),
        None => latest_session(store)?.context("no saved session found"),
    }
}

fn load_state(session: &SessionStore<'_>) -> Result<HarvestState> {
    HarvestState::load(session)?
        .with_context(|| format!("session {} has no checkpoint", session.session_id()))
}

/// Run the pipeline in `options.mode`, uploading into `table`.
pub fn run<T: Tabular>(ctx: &RunContext<'_>, table: &mut T, options: &RunOptions) -> Result<RunOutcome> {
    let (session_id, mut state) = match options.mode {
        Mode::Fresh => {
            let id = options.session_id.clone().unwrap_or_else(new_session_id);
            let session = SessionStore::new(ctx.store, &id);
            if session.load_checkpoint()?.is_some() {
                bail!("session {id} already exists; use --resume to continue it");
            }
            let mut checkpoint = Checkpoint::new(&id);
            checkpoint.with_history = ctx.config.with_history;
            session.save_checkpoint(&checkpoint)?;
            log::info!("session {id}: starting fresh harvest");
            (id, HarvestState::new(checkpoint))
        }
        Mode::Resume | Mode::Cached => {
            let id = pick_session(ctx.store, options.session_id.as_deref())?;
            let state = load_state(&SessionStore::new(ctx.store, &id))?;
            let cp = &state.checkpoint;
            if options.mode == Mode::Cached && !cp.status.harvest_complete() {
                bail!(
                    "session {id} has not finished harvesting (status {}); resume it first",
                    cp.status
                );
            }
            log::info!(
                "session {id}: {} at page {} of {}, {} players cached",
                cp.status,
                cp.last_completed_page,
                if cp.partition.is_empty() { "all" } else { cp.partition.as_str() },
                fmt_num(state.records.len())
            );
            (id, state)
        }
    };
    let session = SessionStore::new(ctx.store, &session_id);

    if !state.checkpoint.status.harvest_complete() {
        // the session's history mode wins over the current configuration
        let mut config = ctx.config.clone();
        if config.with_history != state.checkpoint.with_history {
            log::warn!(
                "session {session_id} was started with history {}; keeping that",
                if state.checkpoint.with_history { "on" } else { "off" }
            );
            config.with_history = state.checkpoint.with_history;
        }
        let harvest = HarvestLoop::new(ctx.source, &session, &config, ctx.today, ctx.progress);
        match harvest.run(&mut state)? {
            HarvestOutcome::Completed => {}
            HarvestOutcome::Interrupted => {
                log::warn!("session {session_id}: interrupted, resume with --resume");
                return Ok(RunOutcome::Interrupted);
            }
            HarvestOutcome::Failed {
                partition,
                page,
                error,
            } => {
                log::error!(
                    "session {session_id}: harvest failed on {partition:?} page {page}: {error}"
                );
                return Ok(RunOutcome::ScrapeFailed);
            }
        }
    } else if options.mode == Mode::Resume {
        log::info!("session {session_id}: harvest already complete, uploading cached data");
    }

    if state.records.is_empty() {
        log::warn!("session {session_id}: no players harvested, nothing to upload");
        return Ok(RunOutcome::NothingToUpload);
    }

    let HarvestState {
        mut checkpoint,
        records,
        history,
        ..
    } = state;
    let (records, duplicates) = dedupe(records);

    let ok = Uploader::new(
        &session,
        table,
        ctx.policy.clone(),
        ctx.destinations,
        ctx.progress,
    )
    .upload(&mut checkpoint, &records, &history)?;
    if !ok {
        log::error!("session {session_id}: upload failed; retry with the upload command");
        return Ok(RunOutcome::UploadFailed);
    }

    session.purge()?;
    let history = if checkpoint.with_history { history.len() } else { 0 };
    log::info!(
        "session {session_id}: uploaded {} players and {} history entries",
        fmt_num(records.len()),
        fmt_num(history)
    );
    Ok(RunOutcome::Completed {
        records: records.len(),
        history,
        duplicates,
    })
}

/// Checkpoints of every saved session, oldest first
pub fn list_sessions(store: &dyn DurableStore) -> Result<Vec<Checkpoint>> {
    let mut out = Vec::new();
    for id in store.sessions()? {
        if let Some(cp) = SessionStore::new(store, &id).load_checkpoint()? {
            out.push(cp);
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_codes() {
        let done = RunOutcome::Completed {
            records: 1,
            history: 0,
            duplicates: 0,
        };
        assert_eq!(done.code(), 0);
        assert_eq!(RunOutcome::NothingToUpload.code(), 0);
        assert_eq!(RunOutcome::Interrupted.code(), 130);
        assert_eq!(RunOutcome::ScrapeFailed.code(), 1);
        assert_eq!(RunOutcome::UploadFailed.code(), 1);
    }
}
