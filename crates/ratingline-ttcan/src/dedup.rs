//! Collapse records sharing a natural key

use rustc_hash::FxHashSet;

use crate::record::Record;

/// Keep the first record of every `(name, rating, province)`.
///
/// Returns the unique records in their original order and how many were dropped.
pub fn dedupe(records: Vec<Record>) -> (Vec<Record>, usize) {
    let total = records.len();
    let mut seen: FxHashSet<(String, u32, String)> = FxHashSet::default();
    let unique: Vec<Record> = records
        .into_iter()
        .filter(|r| seen.insert((r.name.clone(), r.rating, r.province.clone())))
        .collect();
    let dropped = total - unique.len();
    if dropped > 0 {
        log::info!("removed {dropped} duplicate records ({} unique)", unique.len());
    }
    (unique, dropped)
}
