//! Upload of a harvested session to a tabular sink

use anyhow::Result;
use chrono::Utc;
use ratingline_core::{ProgressContext, SheetSink, Tabular, UploadPolicy};
use ratingline_store::{Artifact, Checkpoint, CheckpointStatus, DestinationProgress, SessionStore};

use crate::record::{HISTORY_HEADER, HistoryEntry, RECORD_HEADER, Record};

/// Names of the sink destinations
#[derive(Debug, Clone)]
pub struct Destinations {
    pub records: String,
    pub history: String,
}

impl Default for Destinations {
    fn default() -> Self {
        Self {
            records: "Sheet1".to_string(),
            history: "History".to_string(),
        }
    }
}

fn save(session: &SessionStore<'_>, checkpoint: &mut Checkpoint) {
    checkpoint.timestamp = Utc::now();
    if let Err(e) = session.save_checkpoint(checkpoint) {
        log::warn!("could not record upload progress: {e:#}");
    }
}

/// Uploads records and history, tracking per-destination progress in the
/// checkpoint.
pub struct Uploader<'a, T: Tabular> {
    session: &'a SessionStore<'a>,
    table: &'a mut T,
    policy: UploadPolicy,
    destinations: &'a Destinations,
    progress: &'a ProgressContext,
}

impl<'a, T: Tabular> Uploader<'a, T> {
    pub fn new(
        session: &'a SessionStore<'a>,
        table: &'a mut T,
        policy: UploadPolicy,
        destinations: &'a Destinations,
        progress: &'a ProgressContext,
    ) -> Self {
        Self {
            session,
            table,
            policy,
            destinations,
            progress,
        }
    }

    /// Upload every destination not already completed by an earlier attempt.
    ///
    /// History is uploaded only for sessions harvested with history. Returns
    /// `false` once any destination gives up; the checkpoint is then marked
    /// `upload_failed` and the snapshots stay untouched.
    pub fn upload(
        &mut self,
        checkpoint: &mut Checkpoint,
        records: &[Record],
        history: &[HistoryEntry],
    ) -> Result<bool> {
        checkpoint.status = CheckpointStatus::Uploading;
        checkpoint.timestamp = Utc::now();
        self.session.save_checkpoint(checkpoint)?;

        let dests = self.destinations;
        let record_rows: Vec<Vec<String>> = records.iter().map(Record::to_row).collect();
        if !self.write(
            checkpoint,
            Artifact::Records,
            &dests.records,
            &RECORD_HEADER,
            &record_rows,
        ) {
            return self.fail(checkpoint);
        }

        if checkpoint.with_history {
            let history_rows: Vec<Vec<String>> =
                history.iter().map(HistoryEntry::to_row).collect();
            if !self.write(
                checkpoint,
                Artifact::History,
                &dests.history,
                &HISTORY_HEADER,
                &history_rows,
            ) {
                return self.fail(checkpoint);
            }
        }
        Ok(true)
    }

    fn fail(&self, checkpoint: &mut Checkpoint) -> Result<bool> {
        checkpoint.status = CheckpointStatus::UploadFailed;
        checkpoint.timestamp = Utc::now();
        self.session.save_checkpoint(checkpoint)?;
        Ok(false)
    }

    fn write(
        &mut self,
        checkpoint: &mut Checkpoint,
        artifact: Artifact,
        dest: &str,
        header: &[&str],
        rows: &[Vec<String>],
    ) -> bool {
        let kind = artifact.key();
        if checkpoint.is_uploaded(kind) {
            log::info!("{dest}: uploaded by an earlier attempt, skipping");
            return true;
        }

        let total = rows.len().div_ceil(self.policy.batch_size.max(1));
        checkpoint.upload_state.insert(
            kind.to_string(),
            DestinationProgress {
                batches_done: 0,
                total_batches: total,
                completed: false,
            },
        );
        save(self.session, checkpoint);

        log::info!("{dest}: uploading {} rows", rows.len());
        let bar = self.progress.upload_bar(dest, total as u64);
        let session = self.session;
        let ok = SheetSink::new(&mut *self.table, self.policy.clone()).write(
            dest,
            header,
            rows,
            |done, total| {
                bar.set_position(done as u64);
                if let Some(p) = checkpoint.upload_state.get_mut(kind) {
                    p.batches_done = done;
                    p.total_batches = total;
                }
                save(session, checkpoint);
            },
        );

        if ok {
            if let Some(p) = checkpoint.upload_state.get_mut(kind) {
                p.completed = true;
            }
            save(session, checkpoint);
            bar.finish();
        } else {
            bar.abandon();
        }
        ok
    }
}
