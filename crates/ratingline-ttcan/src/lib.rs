//! Ratingline TTCAN - table tennis rating harvest
//!
//! Walks the TTCAN rating listing page by page, enriches players from their
//! detail pages, checkpoints progress and uploads the result to a tabular sink.

pub mod age;
pub mod config;
pub mod debug;
pub mod dedup;
pub mod enrich;
pub mod extract;
pub mod harvest;
pub mod history;
pub mod record;
pub mod runner;
pub mod source;
pub mod upload;

// Re-exports
pub use config::{DEFAULT_BASE_URL, HarvestConfig};
pub use dedup::dedupe;
pub use enrich::{DetailEnricher, EnrichedPage};
pub use extract::{ListingPage, parse_listing};
pub use harvest::{HarvestLoop, HarvestOutcome, HarvestState};
pub use record::{HISTORY_HEADER, HistoryEntry, RECORD_HEADER, Record};
pub use runner::{Mode, RunContext, RunOptions, RunOutcome, list_sessions, run};
pub use source::{PageSource, TtcanSource};
pub use upload::{Destinations, Uploader};
