//! Field normalization helpers shared by region adapters.
//!
//! Roster sites print dates and sentence terms in loosely consistent
//! formats ("07/2001", "12/21/1991", "04 Years, 002 Months, 000 Days",
//! "LIFE Years, 999 Months, 999 Days"). These helpers turn them into
//! typed values, returning `None` for the common unparsable placeholders
//! (NONE, LIFE, blank) rather than erroring.

use crate::types::SentenceDuration;
use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

/// Parse a scraped date string.
///
/// Accepts `MM/DD/YYYY`, `MM/DD/YY` and month-only `MM/YYYY` (forced to
/// the first of the month, matching how the sites round these values).
#[must_use]
pub fn parse_date_string(date_string: &str) -> Option<NaiveDate> {
    let trimmed = date_string.trim();
    if trimmed.is_empty() {
        return None;
    }

    let parsed = NaiveDate::parse_from_str(trimmed, "%m/%d/%Y")
        .or_else(|_| NaiveDate::parse_from_str(trimmed, "%m/%d/%y"))
        .or_else(|_| {
            // Month-only form: pin to the first of the month
            NaiveDate::parse_from_str(&format!("{trimmed}/01"), "%m/%Y/%d")
        });

    match parsed {
        Ok(date) => Some(date),
        Err(_) => {
            debug!(date_string = trimmed, "couldn't parse date string");
            None
        }
    }
}

/// Parse a scraped sentence-duration string.
///
/// Strings starting with `LIFE` are life sentences; otherwise the first
/// three numbers are years, months, days. Returns `None` for blank or
/// unparsable strings.
#[must_use]
pub fn parse_sentence_duration(term_string: &str) -> Option<SentenceDuration> {
    static NUMBERS: Lazy<Regex> = Lazy::new(|| Regex::new(r"\d+").expect("valid regex"));

    let trimmed = term_string.trim();
    if trimmed.is_empty() {
        return None;
    }

    if trimmed.starts_with("LIFE") {
        return Some(SentenceDuration {
            life: true,
            years: 0,
            months: 0,
            days: 0,
        });
    }

    let nums: Vec<u32> = NUMBERS
        .find_iter(trimmed)
        .filter_map(|m| m.as_str().parse().ok())
        .collect();

    if nums.len() < 3 {
        debug!(term_string = trimmed, "couldn't parse sentence duration");
        return None;
    }

    Some(SentenceDuration {
        life: false,
        years: nums[0],
        months: nums[1],
        days: nums[2],
    })
}

/// Collapse internal runs of whitespace and trim, the way scraped table
/// cells need before comparison.
#[must_use]
pub fn normalize_whitespace(raw: &str) -> String {
    raw.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Normalize a scraped key/value table row.
#[must_use]
pub fn normalize_key_value(key: &str, value: &str) -> (String, String) {
    (normalize_whitespace(key), normalize_whitespace(value))
}
