//! Page and record types exchanged between adapters and the crawl engine.

use rollcall_core::RecordId;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Opaque form state scraped from a page.
///
/// Roster sites validate each POST against hidden tokens embedded in the
/// previous page's form. Adapters extract whatever fields their site
/// needs; the engine carries the map through task payloads untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormTokens {
    /// Hidden field name → value, plus the form's action URL under the
    /// adapter's chosen key
    pub fields: HashMap<String, String>,
}

impl FormTokens {
    /// Build tokens from an iterator of key/value pairs.
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            fields: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    /// Look up a field value.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.fields.get(key).map(String::as_str)
    }
}

/// Raw body of a fetched results page.
#[derive(Debug, Clone)]
pub struct ResultsPage(pub String);

/// Raw body of a fetched detail (or disambiguation) page.
#[derive(Debug, Clone)]
pub struct DetailPage(pub String);

/// One listing row on a results page, with the form state needed to
/// follow it to the detail page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetailRef {
    /// Form state to POST when following this row
    pub form: FormTokens,
}

/// A parsed page of search results.
#[derive(Debug, Clone)]
pub struct ResultsListing {
    /// Listing rows, each leading to a detail page
    pub rows: Vec<DetailRef>,
    /// Form state for the "next page" link, if one was found
    pub next_page: Option<FormTokens>,
    /// First name/identifier seen on this page, recorded as the session
    /// cursor for resumption
    pub cursor_hint: String,
}

/// A single charge on a record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Offense {
    /// Charge description as printed by the site
    pub description: String,
    /// Charge class/severity, if listed
    pub class: String,
}

/// Sentence duration as reported by a roster site.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SentenceDuration {
    /// Whether this is a life sentence
    pub life: bool,
    /// Years component
    pub years: u32,
    /// Months component
    pub months: u32,
    /// Days component
    pub days: u32,
}

/// Canonical record schema produced by `parse_detail`.
///
/// Region-specific attributes that have no canonical column go into
/// `extra_fields` rather than into per-region record types.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StructuredRecord {
    /// Site-provided record identifier (region-scoped)
    pub record_id: RecordId,
    /// Surname as printed
    pub surname: String,
    /// Given names as printed (may be empty)
    pub given_names: String,
    /// Date of birth, if listed
    pub birthdate: Option<chrono::NaiveDate>,
    /// Sex as printed, lowercased
    pub sex: Option<String>,
    /// Race/ethnicity as printed, lowercased
    pub race: Option<String>,
    /// Charges on this record
    pub offenses: Vec<Offense>,
    /// Aggregate minimum sentence
    pub min_sentence: Option<SentenceDuration>,
    /// Aggregate maximum sentence
    pub max_sentence: Option<SentenceDuration>,
    /// Original custody date
    pub custody_date: Option<chrono::NaiveDate>,
    /// Custody status as printed
    pub custody_status: Option<String>,
    /// Whether the person has been released from this sentence
    pub is_released: bool,
    /// Most recent release date, if released
    pub latest_release_date: Option<chrono::NaiveDate>,
    /// Reason for the most recent release, if released
    pub latest_release_type: Option<String>,
    /// Housing/releasing facility at scrape time
    pub facility: Option<String>,
    /// Region-specific attributes with no canonical column
    pub extra_fields: HashMap<String, String>,
}

impl StructuredRecord {
    /// Minimal record with only the required identity fields set.
    #[must_use]
    pub fn new(record_id: RecordId, surname: impl Into<String>) -> Self {
        Self {
            record_id,
            surname: surname.into(),
            given_names: String::new(),
            birthdate: None,
            sex: None,
            race: None,
            offenses: Vec::new(),
            min_sentence: None,
            max_sentence: None,
            custody_date: None,
            custody_status: None,
            is_released: false,
            latest_release_date: None,
            latest_release_type: None,
            facility: None,
            extra_fields: HashMap::new(),
        }
    }
}

/// One entry on a disambiguation page.
///
/// Disambiguation pages render decoy rows that look like real entries but
/// carry an empty submit value and lead back to the search results; those
/// must be skipped, and `record_id()` returns `None` for them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisambiguationEntry {
    /// Value of the row's submit element; doubles as the record id and is
    /// empty for decoy rows
    pub submit_value: String,
    /// Form state to POST when following this entry
    pub form: FormTokens,
}

impl DisambiguationEntry {
    /// The record id this entry leads to, or `None` for a decoy row.
    #[must_use]
    pub fn record_id(&self) -> Option<RecordId> {
        RecordId::new(self.submit_value.clone()).ok()
    }
}

/// What a detail-page fetch turned out to be.
#[derive(Debug, Clone)]
pub enum DetailOutcome {
    /// A flat record page; ready to link and store
    Record(Box<StructuredRecord>),
    /// A disambiguation listing of multiple incarceration events for what
    /// may be the same person
    Disambiguation(Vec<DisambiguationEntry>),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_form_tokens_from_pairs() {
        let tokens = FormTokens::from_pairs([("K01", "abc"), ("DFH_STATE_TOKEN", "xyz")]);
        assert_eq!(tokens.get("K01"), Some("abc"));
        assert_eq!(tokens.get("missing"), None);
    }

    #[test]
    fn test_decoy_entry_has_no_record_id() {
        let decoy = DisambiguationEntry {
            submit_value: String::new(),
            form: FormTokens::default(),
        };
        assert!(decoy.record_id().is_none());

        let real = DisambiguationEntry {
            submit_value: "05A1234".to_string(),
            form: FormTokens::default(),
        };
        assert_eq!(real.record_id().expect("record id").as_str(), "05A1234");
    }

    #[test]
    fn test_structured_record_defaults() {
        let record = StructuredRecord::new(RecordId::new("05A1234").expect("id"), "DOE");
        assert!(!record.is_released);
        assert!(record.offenses.is_empty());
        assert!(record.extra_fields.is_empty());
    }
}
