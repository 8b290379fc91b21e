//! Player age from a detail page

use std::sync::LazyLock;

use chrono::{Datelike, NaiveDate};
use regex::Regex;
use scraper::{Html, Selector};

use crate::extract::{cell_text, row_cells};

/// Labels tried in order; the first one with a usable value wins
const LABELS: &[&str] = &["Age", "DOB", "Date of Birth", "Born", "Year of Birth"];

const MAX_AGE: i32 = 120;

static LABEL_PATTERNS: LazyLock<Vec<(&'static str, Regex)>> = LazyLock::new(|| {
    LABELS
        .iter()
        .map(|label| {
            let re = Regex::new(&format!(
                r"(?i)\b{}:\s*(\d{{4}}-\d{{2}}-\d{{2}}|\d{{1,4}})\b",
                regex::escape(label)
            ))
            .expect("valid label regex");
            (*label, re)
        })
        .collect()
});

static CELL_LABEL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b(age|birth|born|dob)\b").expect("valid regex"));

static ROW: LazyLock<Selector> = LazyLock::new(|| Selector::parse("tr").expect("valid selector"));

/// Interpret a labelled value as an age on `today`.
///
/// ISO dates and four-digit years are birth dates; shorter numbers are a
/// direct age and only accepted under an age label.
fn age_from_value(value: &str, direct_allowed: bool, today: NaiveDate) -> Option<i32> {
    let age = if let Ok(born) = NaiveDate::parse_from_str(value, "%Y-%m-%d") {
        let mut age = today.year() - born.year();
        if (today.month(), today.day()) < (born.month(), born.day()) {
            age -= 1;
        }
        age
    } else if value.len() == 4 {
        today.year() - value.parse::<i32>().ok()?
    } else if direct_allowed && value.len() <= 3 {
        value.parse::<i32>().ok()?
    } else {
        return None;
    };
    (0..=MAX_AGE).contains(&age).then_some(age)
}

fn is_age_label(label: &str) -> bool {
    label.eq_ignore_ascii_case("age")
}

/// Extract the player's age, rendered as a decimal string.
pub fn extract_age(html: &str, today: NaiveDate) -> Option<String> {
    let doc = Html::parse_document(html);
    let text = doc.root_element().text().collect::<Vec<_>>().join(" ");

    for (label, re) in LABEL_PATTERNS.iter() {
        for caps in re.captures_iter(&text) {
            if let Some(age) = age_from_value(&caps[1], is_age_label(label), today) {
                return Some(age.to_string());
            }
        }
    }

    // fallback: a label cell immediately followed by a numeric cell
    for row in doc.select(&ROW) {
        let cells: Vec<String> = row_cells(row, true).into_iter().map(cell_text).collect();
        for pair in cells.windows(2) {
            let (label, value) = (pair[0].trim_end_matches(':'), pair[1].as_str());
            if value.is_empty() || !value.bytes().all(|b| b.is_ascii_digit()) {
                continue;
            }
            let Some(m) = CELL_LABEL.find(label) else {
                continue;
            };
            let direct = m.as_str().eq_ignore_ascii_case("age");
            if let Some(age) = age_from_value(value, direct, today) {
                return Some(age.to_string());
            }
        }
    }
    None
}
