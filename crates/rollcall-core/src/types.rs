//! Shared types used across the Rollcall engine.
//!
//! This module defines common newtypes that provide type safety and clear
//! domain modeling for region codes and the various identifiers flowing
//! through the crawl pipeline.

use crate::error::RollcallError;
use once_cell::sync::Lazy;
use rand::distributions::Alphanumeric;
use rand::Rng;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Length of internally minted (fuzzy) identifiers.
const FUZZY_ID_LEN: usize = 10;

/// Newtype for region codes with validation.
///
/// Region codes follow the `us_ny` convention: lowercase alphanumeric
/// segments joined by underscores, 2-50 characters.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RegionId(String);

impl RegionId {
    /// Create a new `RegionId` from a string.
    ///
    /// # Errors
    /// Returns error if the code doesn't match the required format.
    pub fn new(code: impl Into<String>) -> Result<Self, RollcallError> {
        let code = code.into();
        Self::validate(&code)?;
        Ok(Self(code))
    }

    /// Get the inner string value.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    fn validate(code: &str) -> Result<(), RollcallError> {
        static REGION_REGEX: Lazy<Regex> =
            Lazy::new(|| Regex::new(r"^[a-z0-9]+(_[a-z0-9]+)*$").expect("valid regex"));

        if code.len() < 2 || code.len() > 50 {
            return Err(RollcallError::Validation(format!(
                "invalid region code: must be 2-50 characters, got {} characters",
                code.len()
            )));
        }

        if REGION_REGEX.is_match(code) {
            Ok(())
        } else {
            Err(RollcallError::Validation(format!(
                "invalid region code: must be lowercase alphanumeric with underscores, got '{code}'"
            )))
        }
    }
}

impl fmt::Display for RegionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A site-provided record identifier (a DIN in NY DOCCS terms).
///
/// Record ids are only unique within a region; the persistence layer
/// always scopes them by region code.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RecordId(String);

impl RecordId {
    /// Create a new `RecordId`. The id is opaque; only emptiness is rejected.
    pub fn new(id: impl Into<String>) -> Result<Self, RollcallError> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err(RollcallError::Validation(
                "record id must not be empty".to_string(),
            ));
        }
        Ok(Self(id))
    }

    /// Get the inner string value.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Stable internal person identifier.
///
/// When a source site provides no person-level id (the common case), we
/// mint a fuzzy 10-character alphanumeric id and flag it as such.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PersonId(String);

impl PersonId {
    /// Wrap an existing person id.
    #[must_use]
    pub fn from_string(id: String) -> Self {
        Self(id)
    }

    /// Mint a new random (fuzzy) person id.
    #[must_use]
    pub fn generate() -> Self {
        Self(random_alphanumeric(FUZZY_ID_LEN))
    }

    /// Get the inner string value.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PersonId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier minted for all entries discovered together on one
/// disambiguation page, so records later found to belong to the same
/// person can be tied together before any of them matched a prior record.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GroupId(String);

impl GroupId {
    /// Mint a new random group id.
    #[must_use]
    pub fn generate() -> Self {
        Self(random_alphanumeric(FUZZY_ID_LEN))
    }

    /// Wrap an existing group id (e.g. echoed through a task payload).
    #[must_use]
    pub fn from_string(id: String) -> Self {
        Self(id)
    }

    /// Get the inner string value.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Promote the group id to a person id.
    ///
    /// Used when no entry in a disambiguation group matched a previously
    /// stored record and the group id becomes the person identity.
    #[must_use]
    pub fn into_person_id(self) -> PersonId {
        PersonId::from_string(self.0)
    }
}

impl fmt::Display for GroupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A name search query driving one crawl.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NameQuery {
    /// Surname (required by every known source site)
    pub surname: String,
    /// Given names (empty string for surname-only search)
    pub given_names: String,
}

impl NameQuery {
    /// Create a query from surname and given names.
    #[must_use]
    pub fn new(surname: impl Into<String>, given_names: impl Into<String>) -> Self {
        Self {
            surname: surname.into(),
            given_names: given_names.into(),
        }
    }

    /// Parse a stored cursor value of the form `"Surname, Given Names"`.
    ///
    /// Cursors are stored exactly as the listing page shows names, so a
    /// missing comma means a surname-only entry.
    #[must_use]
    pub fn from_cursor(cursor: &str) -> Self {
        match cursor.split_once(", ") {
            Some((surname, given)) => Self::new(surname, given),
            None => Self::new(cursor, ""),
        }
    }
}

impl fmt::Display for NameQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.given_names.is_empty() {
            write!(f, "{}", self.surname)
        } else {
            write!(f, "{}, {}", self.surname, self.given_names)
        }
    }
}

/// Generate a random alphanumeric string of the given length.
fn random_alphanumeric(len: usize) -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(len)
        .map(char::from)
        .collect()
}
