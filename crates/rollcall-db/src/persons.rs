//! Person identity operations.
//!
//! A person row is the stable internal identity that records link to.
//! Identifiers are either a site-derived group id or a minted fuzzy id;
//! `id_is_fuzzy` records which, so downstream consumers know the linkage
//! is probabilistic.

use crate::parse_naive_date;
use chrono::NaiveDate;
use sqlx::{Pool, Row, Sqlite};

/// The identity a record is linked to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersonIdentity {
    /// Internal person identifier
    pub person_id: String,
    /// Whether the identifier was minted rather than site-derived
    pub id_is_fuzzy: bool,
}

/// A stored person with demographics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Person {
    /// Internal person identifier
    pub person_id: String,
    /// Region the person was first seen in
    pub region: String,
    /// Whether the identifier was minted rather than site-derived
    pub id_is_fuzzy: bool,
    /// Surname as scraped
    pub surname: String,
    /// Given names as scraped
    pub given_names: String,
    /// Date of birth, if listed
    pub birthdate: Option<NaiveDate>,
    /// Sex as scraped
    pub sex: Option<String>,
    /// Race/ethnicity as scraped
    pub race: Option<String>,
}

impl Person {
    /// The identity portion of this person.
    #[must_use]
    pub fn identity(&self) -> PersonIdentity {
        PersonIdentity {
            person_id: self.person_id.clone(),
            id_is_fuzzy: self.id_is_fuzzy,
        }
    }

    fn from_row(row: &sqlx::sqlite::SqliteRow) -> Result<Self, sqlx::Error> {
        let birthdate: Option<String> = row.try_get("birthdate")?;
        Ok(Self {
            person_id: row.try_get("person_id")?,
            region: row.try_get("region")?,
            id_is_fuzzy: row.try_get::<i64, _>("id_is_fuzzy")? != 0,
            surname: row.try_get("surname")?,
            given_names: row.try_get("given_names")?,
            birthdate: birthdate.as_deref().map(parse_naive_date).transpose()?,
            sex: row.try_get("sex")?,
            race: row.try_get("race")?,
        })
    }
}

/// Insert or update a person.
///
/// Upserting by `person_id` refreshes demographics from the latest
/// scrape, so redelivered tasks are safe.
///
/// # Errors
/// Returns `sqlx::Error` if the write fails.
pub async fn upsert_person(pool: &Pool<Sqlite>, person: &Person) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO persons (person_id, region, id_is_fuzzy, surname, given_names, birthdate, sex, race)
         VALUES (?, ?, ?, ?, ?, ?, ?, ?)
         ON CONFLICT(person_id) DO UPDATE SET
             surname = excluded.surname,
             given_names = excluded.given_names,
             birthdate = excluded.birthdate,
             sex = excluded.sex,
             race = excluded.race",
    )
    .bind(&person.person_id)
    .bind(&person.region)
    .bind(i64::from(person.id_is_fuzzy))
    .bind(&person.surname)
    .bind(&person.given_names)
    .bind(person.birthdate.map(|d| d.to_string()))
    .bind(&person.sex)
    .bind(&person.race)
    .execute(pool)
    .await?;

    Ok(())
}

/// Get a person by internal identifier.
///
/// # Errors
/// Returns `sqlx::Error` if the query fails.
pub async fn get_person(
    pool: &Pool<Sqlite>,
    person_id: &str,
) -> Result<Option<Person>, sqlx::Error> {
    let row = sqlx::query(
        "SELECT person_id, region, id_is_fuzzy, surname, given_names, birthdate, sex, race
         FROM persons WHERE person_id = ?",
    )
    .bind(person_id)
    .fetch_optional(pool)
    .await?;

    row.as_ref().map(Person::from_row).transpose()
}
