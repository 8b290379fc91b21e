//! Durable key-value store for session artifacts
//!
//! Keys are `(session, kind)` pairs. Directory layout of [`FileStore`]:
//! ```text
//! {base}/
//! └── {session}/
//!     ├── checkpoint.json
//!     ├── records.json
//!     └── history.json
//! ```

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::{Context, Result};

/// Pluggable persistence for checkpoints and snapshots.
///
/// Implementations must make `put` atomic per key: a reader sees either the
/// previous value or the new one, never a torn write.
pub trait DurableStore {
    fn put(&self, session: &str, kind: &str, bytes: &[u8]) -> Result<()>;
    fn get(&self, session: &str, kind: &str) -> Result<Option<Vec<u8>>>;
    /// Delete one artifact; a missing key is not an error
    fn remove(&self, session: &str, kind: &str) -> Result<()>;
    /// Known session ids, sorted ascending
    fn sessions(&self) -> Result<Vec<String>>;
    /// Remove every artifact of a session
    fn purge(&self, session: &str) -> Result<()>;
}

/// Filesystem store: one directory per session, one file per kind.
#[derive(Debug)]
pub struct FileStore {
    base: PathBuf,
}

impl FileStore {
    /// Create a new store rooted at `base`.
    pub fn new(base: &Path) -> Result<Self> {
        fs::create_dir_all(base)
            .with_context(|| format!("failed to create store dir: {}", base.display()))?;
        Ok(Self {
            base: base.to_path_buf(),
        })
    }

    pub fn base(&self) -> &Path {
        &self.base
    }

    fn session_dir(&self, session: &str) -> PathBuf {
        self.base.join(session)
    }

    fn path(&self, session: &str, kind: &str) -> PathBuf {
        self.session_dir(session).join(format!("{kind}.json"))
    }
}

impl DurableStore for FileStore {
    /// Write to `{kind}.json.tmp`, then rename over the final file.
    fn put(&self, session: &str, kind: &str, bytes: &[u8]) -> Result<()> {
        let dir = self.session_dir(session);
        fs::create_dir_all(&dir)
            .with_context(|| format!("failed to create session dir: {}", dir.display()))?;
        let path = self.path(session, kind);
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, bytes).with_context(|| format!("failed to write {}", tmp.display()))?;
        fs::rename(&tmp, &path).with_context(|| {
            format!("failed to rename {} to {}", tmp.display(), path.display())
        })?;
        Ok(())
    }

    fn get(&self, session: &str, kind: &str) -> Result<Option<Vec<u8>>> {
        let path = self.path(session, kind);
        match fs::read(&path) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e).with_context(|| format!("failed to read {}", path.display())),
        }
    }

    fn remove(&self, session: &str, kind: &str) -> Result<()> {
        let path = self.path(session, kind);
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e).with_context(|| format!("failed to remove {}", path.display())),
        }
    }

    fn sessions(&self) -> Result<Vec<String>> {
        let pattern = self.base.join("*").join("checkpoint.json");
        let pattern_str = pattern.to_string_lossy();
        let mut ids: Vec<String> = glob::glob(&pattern_str)
            .context("invalid glob pattern")?
            .filter_map(|e| e.ok())
            .filter_map(|p| {
                p.parent()
                    .and_then(|d| d.file_name())
                    .map(|n| n.to_string_lossy().into_owned())
            })
            .collect();
        ids.sort();
        Ok(ids)
    }

    fn purge(&self, session: &str) -> Result<()> {
        let dir = self.session_dir(session);
        if dir.exists() {
            fs::remove_dir_all(&dir)
                .with_context(|| format!("failed to remove {}", dir.display()))?;
        }
        Ok(())
    }
}

/// In-process store, for tests and dry runs.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<BTreeMap<(String, String), Vec<u8>>>,
}

impl MemoryStore {
    fn lock(&self) -> std::sync::MutexGuard<'_, BTreeMap<(String, String), Vec<u8>>> {
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl DurableStore for MemoryStore {
    fn put(&self, session: &str, kind: &str, bytes: &[u8]) -> Result<()> {
        self.lock()
            .insert((session.to_string(), kind.to_string()), bytes.to_vec());
        Ok(())
    }

    fn get(&self, session: &str, kind: &str) -> Result<Option<Vec<u8>>> {
        Ok(self
            .lock()
            .get(&(session.to_string(), kind.to_string()))
            .cloned())
    }

    fn remove(&self, session: &str, kind: &str) -> Result<()> {
        self.lock().remove(&(session.to_string(), kind.to_string()));
        Ok(())
    }

    fn sessions(&self) -> Result<Vec<String>> {
        let mut ids: Vec<String> = self
            .lock()
            .keys()
            .filter(|(_, kind)| kind == "checkpoint")
            .map(|(s, _)| s.clone())
            .collect();
        ids.dedup();
        Ok(ids)
    }

    fn purge(&self, session: &str) -> Result<()> {
        self.lock().retain(|(s, _), _| s != session);
        Ok(())
    }
}
