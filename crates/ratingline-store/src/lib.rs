//! ratingline-store: Durable session state for harvest runs
//!
//! A session owns one checkpoint and one snapshot per data kind. The
//! backing store is pluggable: files on disk or memory.

pub mod checkpoint;
pub mod session;
pub mod store;

pub use checkpoint::{Checkpoint, CheckpointStatus, DestinationProgress, UploadState};
pub use session::{Artifact, SessionStore, latest_session, new_session_id};
pub use store::{DurableStore, FileStore, MemoryStore};
