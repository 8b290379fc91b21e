//! Player rating records and history entries

use serde::{Deserialize, Serialize};

/// Header of the "current ratings" destination
pub const RECORD_HEADER: [&str; 7] = [
    "Name",
    "Province",
    "Gender",
    "Rating",
    "Period",
    "Last Played",
    "Age",
];

/// Header of the "rating history" destination
pub const HISTORY_HEADER: [&str; 6] = [
    "PlayerName",
    "Period",
    "Rating",
    "LastPlayed",
    "Gender",
    "Province",
];

/// Raw cell text of one listing row, before validation
#[derive(Debug, Clone, Default)]
pub struct Candidate {
    pub name: String,
    pub province: String,
    pub gender: String,
    pub rating: String,
    pub period: String,
    pub last_played: String,
    pub detail_link: Option<String>,
}

/// A current player rating.
///
/// Identity is the natural key `(name, rating, province)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    pub name: String,
    pub province: String,
    /// Present but possibly empty
    pub gender: String,
    pub rating: u32,
    pub period: String,
    pub last_played: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub age: Option<String>,
    /// Only meaningful during enrichment; never persisted
    #[serde(skip)]
    pub detail_link: Option<String>,
}

/// Parse a rating cell: an integer strictly below `max_rating`
pub fn parse_rating(text: &str, max_rating: u32) -> Option<u32> {
    text.trim().parse::<u32>().ok().filter(|r| *r < max_rating)
}

impl Record {
    /// Validate a candidate row; `None` if any required field is empty or
    /// the rating is not an integer below `max_rating`.
    pub fn from_candidate(c: Candidate, max_rating: u32) -> Option<Self> {
        let required = [&c.name, &c.province, &c.period, &c.last_played];
        if required.iter().any(|f| f.trim().is_empty()) {
            return None;
        }
        let rating = parse_rating(&c.rating, max_rating)?;
        Some(Self {
            name: c.name.trim().to_string(),
            province: c.province.trim().to_string(),
            gender: c.gender.trim().to_string(),
            rating,
            period: c.period.trim().to_string(),
            last_played: c.last_played.trim().to_string(),
            age: None,
            detail_link: c.detail_link,
        })
    }

    pub fn natural_key(&self) -> (&str, u32, &str) {
        (&self.name, self.rating, &self.province)
    }

    /// Cells in [`RECORD_HEADER`] order
    pub fn to_row(&self) -> Vec<String> {
        vec![
            self.name.clone(),
            self.province.clone(),
            self.gender.clone(),
            self.rating.to_string(),
            self.period.clone(),
            self.last_played.clone(),
            self.age.clone().unwrap_or_default(),
        ]
    }
}

/// One row of a player's rating history, as found on the detail page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryRow {
    pub period_id: u32,
    pub date: String,
    pub rating: u32,
    pub last_played: String,
}

/// A historical rating of a player, with gender/province taken from the
/// player's current record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub player_name: String,
    pub period: String,
    pub rating: u32,
    pub last_played: String,
    pub gender: String,
    pub province: String,
}

impl HistoryEntry {
    pub fn new(row: HistoryRow, current: &Record) -> Self {
        Self {
            player_name: current.name.clone(),
            period: row.date,
            rating: row.rating,
            last_played: row.last_played,
            gender: current.gender.clone(),
            province: current.province.clone(),
        }
    }

    /// Cells in [`HISTORY_HEADER`] order
    pub fn to_row(&self) -> Vec<String> {
        vec![
            self.player_name.clone(),
            self.period.clone(),
            self.rating.to_string(),
            self.last_played.clone(),
            self.gender.clone(),
            self.province.clone(),
        ]
    }
}
