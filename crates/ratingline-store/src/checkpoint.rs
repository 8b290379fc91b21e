//! Checkpoint: durable record of harvest progress and upload sub-state

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Where a session stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckpointStatus {
    /// Harvest in progress (periodic checkpoint)
    Scraping,
    /// Harvest stopped on an unrecoverable fetch/extract error
    Failed,
    /// Harvest stopped by a shutdown request
    Interrupted,
    /// Harvest finished; snapshots hold the full data set
    Scraped,
    /// Upload in progress
    Uploading,
    /// Upload gave up; snapshots are intact for a cached retry
    UploadFailed,
}

impl CheckpointStatus {
    /// True once every partition has been harvested
    pub fn harvest_complete(self) -> bool {
        matches!(self, Self::Scraped | Self::Uploading | Self::UploadFailed)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Scraping => "scraping",
            Self::Failed => "failed",
            Self::Interrupted => "interrupted",
            Self::Scraped => "scraped",
            Self::Uploading => "uploading",
            Self::UploadFailed => "upload_failed",
        }
    }
}

impl fmt::Display for CheckpointStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Upload progress for one destination.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DestinationProgress {
    pub batches_done: usize,
    pub total_batches: usize,
    /// Every batch of the last attempt was accepted
    pub completed: bool,
}

/// Per-destination upload progress, keyed by destination kind (`records`, `history`).
pub type UploadState = BTreeMap<String, DestinationProgress>;

/// Persisted as `checkpoint.json` in the session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Checkpoint {
    pub session_id: String,
    /// Last page of `partition` whose records are in the snapshots (0 = none)
    pub last_completed_page: u32,
    pub timestamp: DateTime<Utc>,
    pub players_count: usize,
    pub history_count: usize,
    pub status: CheckpointStatus,
    #[serde(default)]
    pub upload_state: UploadState,
    /// Partition key being harvested when the checkpoint was written
    #[serde(default)]
    pub partition: String,
    /// Partition keys fully harvested, in order
    #[serde(default)]
    pub completed_partitions: Vec<String>,
    /// Whether the session also collects rating history
    #[serde(default)]
    pub with_history: bool,
}

impl Checkpoint {
    pub fn new(session_id: &str) -> Self {
        Self {
            session_id: session_id.to_string(),
            last_completed_page: 0,
            timestamp: Utc::now(),
            players_count: 0,
            history_count: 0,
            status: CheckpointStatus::Scraping,
            upload_state: UploadState::new(),
            partition: String::new(),
            completed_partitions: Vec::new(),
            with_history: false,
        }
    }

    /// Page to start `partition` from when resuming
    pub fn resume_page(&self, partition: &str) -> u32 {
        if self.partition == partition {
            self.last_completed_page + 1
        } else {
            1
        }
    }

    pub fn is_partition_done(&self, partition: &str) -> bool {
        self.completed_partitions.iter().any(|p| p == partition)
    }

    /// Whether the upload of `dest` finished in an earlier attempt
    pub fn is_uploaded(&self, dest: &str) -> bool {
        self.upload_state.get(dest).is_some_and(|p| p.completed)
    }
}
