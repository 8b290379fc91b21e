//! Session-scoped access to checkpoints and data snapshots

use anyhow::{Context, Result};
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::checkpoint::Checkpoint;
use crate::store::DurableStore;

/// Artifacts kept per session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Artifact {
    Checkpoint,
    Records,
    History,
}

impl Artifact {
    pub fn key(self) -> &'static str {
        match self {
            Self::Checkpoint => "checkpoint",
            Self::Records => "records",
            Self::History => "history",
        }
    }
}

/// Timestamp-derived session id, e.g. `20250706_142501`
pub fn new_session_id() -> String {
    chrono::Local::now().format("%Y%m%d_%H%M%S").to_string()
}

/// Most recent session that has a checkpoint
pub fn latest_session(store: &dyn DurableStore) -> Result<Option<String>> {
    Ok(store.sessions()?.pop())
}

/// Checkpoint and snapshot I/O for one session.
///
/// Single writer: callers never share a session between threads.
pub struct SessionStore<'a> {
    store: &'a dyn DurableStore,
    session_id: String,
}

impl std::fmt::Debug for SessionStore<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionStore")
            .field("session_id", &self.session_id)
            .finish_non_exhaustive()
    }
}

impl<'a> SessionStore<'a> {
    pub fn new(store: &'a dyn DurableStore, session_id: &str) -> Self {
        Self {
            store,
            session_id: session_id.to_string(),
        }
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn load_checkpoint(&self) -> Result<Option<Checkpoint>> {
        let Some(bytes) = self.store.get(&self.session_id, Artifact::Checkpoint.key())? else {
            return Ok(None);
        };
        let cp = serde_json::from_slice(&bytes)
            .with_context(|| format!("corrupt checkpoint for session {}", self.session_id))?;
        Ok(Some(cp))
    }

    pub fn save_checkpoint(&self, checkpoint: &Checkpoint) -> Result<()> {
        let json = serde_json::to_vec_pretty(checkpoint).context("failed to serialize checkpoint")?;
        self.store
            .put(&self.session_id, Artifact::Checkpoint.key(), &json)?;
        log::debug!(
            "checkpoint {}: page {} ({}), {} players, {} history",
            self.session_id,
            checkpoint.last_completed_page,
            checkpoint.status,
            checkpoint.players_count,
            checkpoint.history_count
        );
        Ok(())
    }

    /// Overwrite the snapshot of `artifact` with `items`
    pub fn save_snapshot<T: Serialize>(&self, artifact: Artifact, items: &[T]) -> Result<()> {
        let json = serde_json::to_vec(items)
            .with_context(|| format!("failed to serialize {} snapshot", artifact.key()))?;
        self.store.put(&self.session_id, artifact.key(), &json)
    }

    /// Load the snapshot of `artifact`; a missing snapshot is empty
    pub fn load_snapshot<T: DeserializeOwned>(&self, artifact: Artifact) -> Result<Vec<T>> {
        match self.store.get(&self.session_id, artifact.key())? {
            Some(bytes) => serde_json::from_slice(&bytes).with_context(|| {
                format!(
                    "corrupt {} snapshot for session {}",
                    artifact.key(),
                    self.session_id
                )
            }),
            None => Ok(Vec::new()),
        }
    }

    /// Drop a single snapshot; missing snapshots are fine
    pub fn discard_snapshot(&self, artifact: Artifact) -> Result<()> {
        self.store.remove(&self.session_id, artifact.key())
    }

    /// Delete every artifact of the session
    pub fn purge(&self) -> Result<()> {
        self.store.purge(&self.session_id)?;
        log::info!("session {}: artifacts removed", self.session_id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checkpoint::CheckpointStatus;
    use crate::store::{FileStore, MemoryStore};

    #[test]
    fn missing_checkpoint_is_none() {
        let store = MemoryStore::default();
        let session = SessionStore::new(&store, "s");
        assert!(session.load_checkpoint().unwrap().is_none());
    }

    #[test]
    fn checkpoint_roundtrip_through_files() {
        let tmp = tempfile::tempdir().unwrap();
        let store = FileStore::new(tmp.path()).unwrap();
        let session = SessionStore::new(&store, "20250706_120000");

        let mut cp = Checkpoint::new("20250706_120000");
        cp.last_completed_page = 12;
        cp.players_count = 240;
        cp.status = CheckpointStatus::Interrupted;
        session.save_checkpoint(&cp).unwrap();

        assert_eq!(session.load_checkpoint().unwrap(), Some(cp));
        assert_eq!(
            latest_session(&store).unwrap(),
            Some("20250706_120000".to_string())
        );
    }

    #[test]
    fn snapshot_missing_is_empty() {
        let store = MemoryStore::default();
        let session = SessionStore::new(&store, "s");
        let v: Vec<String> = session.load_snapshot(Artifact::History).unwrap();
        assert!(v.is_empty());
    }

    #[test]
    fn snapshot_overwrites() {
        let store = MemoryStore::default();
        let session = SessionStore::new(&store, "s");
        session.save_snapshot(Artifact::Records, &[1, 2, 3]).unwrap();
        session.save_snapshot(Artifact::Records, &[4]).unwrap();
        let v: Vec<i32> = session.load_snapshot(Artifact::Records).unwrap();
        assert_eq!(v, vec![4]);
    }

    #[test]
    fn discard_snapshot_keeps_checkpoint() {
        let store = MemoryStore::default();
        let session = SessionStore::new(&store, "s");
        session.save_checkpoint(&Checkpoint::new("s")).unwrap();
        session.save_snapshot(Artifact::History, &[1]).unwrap();
        session.discard_snapshot(Artifact::History).unwrap();
        let v: Vec<i32> = session.load_snapshot(Artifact::History).unwrap();
        assert!(v.is_empty());
        assert!(session.load_checkpoint().unwrap().is_some());
    }

    #[test]
    fn corrupt_checkpoint_is_an_error() {
        let store = MemoryStore::default();
        store.put("s", "checkpoint", b"not json").unwrap();
        let session = SessionStore::new(&store, "s");
        assert!(session.load_checkpoint().is_err());
    }

    #[test]
    fn latest_session_picks_newest() {
        let store = MemoryStore::default();
        for id in ["20250101_000000", "20250301_000000", "20250201_000000"] {
            SessionStore::new(&store, id)
                .save_checkpoint(&Checkpoint::new(id))
                .unwrap();
        }
        assert_eq!(
            latest_session(&store).unwrap(),
            Some("20250301_000000".to_string())
        );
    }
}
