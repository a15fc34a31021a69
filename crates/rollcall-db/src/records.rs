//! Canonical record operations.
//!
//! Records are keyed by `(region, record_id)` and upserts overwrite, so a
//! redelivered store is a no-op beyond refreshing `last_seen`. Offense
//! lists, sentence durations, and region-specific extra fields are stored
//! as JSON TEXT.

use crate::parse_naive_date;
use crate::persons::PersonIdentity;
use chrono::{NaiveDate, Utc};
use rollcall_region::{Offense, SentenceDuration, StructuredRecord};
use sqlx::{Pool, Row, Sqlite};
use std::collections::HashMap;

/// Storage key of a record.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RecordKey {
    /// Region the record belongs to
    pub region: String,
    /// Site-provided record identifier
    pub record_id: String,
}

/// A stored record together with its owning person.
#[derive(Debug, Clone)]
pub struct StoredRecord {
    /// Internal identifier of the owning person
    pub person_id: String,
    /// The canonical record fields
    pub record: StructuredRecord,
}

fn encode_json<T: serde::Serialize>(value: &T) -> Result<String, sqlx::Error> {
    serde_json::to_string(value).map_err(|e| sqlx::Error::Encode(e.into()))
}

fn decode_json<T: serde::de::DeserializeOwned>(raw: &str) -> Result<T, sqlx::Error> {
    serde_json::from_str(raw).map_err(|e| sqlx::Error::Decode(e.into()))
}

/// Insert or update a record, linking it to a person.
///
/// # Errors
/// Returns `sqlx::Error` if the write fails or a JSON field cannot be
/// encoded.
pub async fn upsert_record(
    pool: &Pool<Sqlite>,
    region: &str,
    record: &StructuredRecord,
    person_id: &str,
) -> Result<RecordKey, sqlx::Error> {
    sqlx::query(
        "INSERT INTO records (region, record_id, person_id, offenses, min_sentence, max_sentence,
                              custody_date, custody_status, is_released, latest_release_date,
                              latest_release_type, extra_fields, last_seen)
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
         ON CONFLICT(region, record_id) DO UPDATE SET
             person_id = excluded.person_id,
             offenses = excluded.offenses,
             min_sentence = excluded.min_sentence,
             max_sentence = excluded.max_sentence,
             custody_date = excluded.custody_date,
             custody_status = excluded.custody_status,
             is_released = excluded.is_released,
             latest_release_date = excluded.latest_release_date,
             latest_release_type = excluded.latest_release_type,
             extra_fields = excluded.extra_fields,
             last_seen = excluded.last_seen",
    )
    .bind(region)
    .bind(record.record_id.as_str())
    .bind(person_id)
    .bind(encode_json(&record.offenses)?)
    .bind(record.min_sentence.map(|s| encode_json(&s)).transpose()?)
    .bind(record.max_sentence.map(|s| encode_json(&s)).transpose()?)
    .bind(record.custody_date.map(|d| d.to_string()))
    .bind(&record.custody_status)
    .bind(i64::from(record.is_released))
    .bind(record.latest_release_date.map(|d| d.to_string()))
    .bind(&record.latest_release_type)
    .bind(encode_json(&record.extra_fields)?)
    .bind(Utc::now().to_rfc3339())
    .execute(pool)
    .await?;

    Ok(RecordKey {
        region: region.to_string(),
        record_id: record.record_id.to_string(),
    })
}

/// Look up a record's key by its site identifier.
///
/// # Errors
/// Returns `sqlx::Error` if the query fails.
pub async fn find_record_by_id(
    pool: &Pool<Sqlite>,
    region: &str,
    record_id: &str,
) -> Result<Option<RecordKey>, sqlx::Error> {
    let found: Option<String> =
        sqlx::query_scalar("SELECT record_id FROM records WHERE region = ? AND record_id = ?")
            .bind(region)
            .bind(record_id)
            .fetch_optional(pool)
            .await?;

    Ok(found.map(|record_id| RecordKey {
        region: region.to_string(),
        record_id,
    }))
}

/// Get the person identity that owns a record.
///
/// # Errors
/// Returns `sqlx::Error` if the query fails.
pub async fn get_owning_person(
    pool: &Pool<Sqlite>,
    key: &RecordKey,
) -> Result<Option<PersonIdentity>, sqlx::Error> {
    let row = sqlx::query(
        "SELECT p.person_id, p.id_is_fuzzy FROM records r
         JOIN persons p ON p.person_id = r.person_id
         WHERE r.region = ? AND r.record_id = ?",
    )
    .bind(&key.region)
    .bind(&key.record_id)
    .fetch_optional(pool)
    .await?;

    row.map(|r| {
        Ok(PersonIdentity {
            person_id: r.try_get("person_id")?,
            id_is_fuzzy: r.try_get::<i64, _>("id_is_fuzzy")? != 0,
        })
    })
    .transpose()
}

/// Get a stored record with its canonical fields.
///
/// Name and demographic fields live on the owning person and are joined
/// back in.
///
/// # Errors
/// Returns `sqlx::Error` if the query fails or a stored JSON field is
/// malformed.
pub async fn get_record(
    pool: &Pool<Sqlite>,
    region: &str,
    record_id: &str,
) -> Result<Option<StoredRecord>, sqlx::Error> {
    let row = sqlx::query(
        "SELECT r.record_id, r.person_id, r.offenses, r.min_sentence, r.max_sentence,
                r.custody_date, r.custody_status, r.is_released, r.latest_release_date,
                r.latest_release_type, r.extra_fields,
                p.surname, p.given_names, p.birthdate, p.sex, p.race
         FROM records r
         JOIN persons p ON p.person_id = r.person_id
         WHERE r.region = ? AND r.record_id = ?",
    )
    .bind(region)
    .bind(record_id)
    .fetch_optional(pool)
    .await?;

    let Some(row) = row else {
        return Ok(None);
    };

    let record_id: String = row.try_get("record_id")?;
    let record_id = rollcall_core::RecordId::new(record_id)
        .map_err(|e| sqlx::Error::Decode(e.to_string().into()))?;

    let offenses: Vec<Offense> = decode_json(&row.try_get::<String, _>("offenses")?)?;
    let min_sentence: Option<SentenceDuration> = row
        .try_get::<Option<String>, _>("min_sentence")?
        .as_deref()
        .map(decode_json)
        .transpose()?;
    let max_sentence: Option<SentenceDuration> = row
        .try_get::<Option<String>, _>("max_sentence")?
        .as_deref()
        .map(decode_json)
        .transpose()?;
    let extra_fields: HashMap<String, String> =
        decode_json(&row.try_get::<String, _>("extra_fields")?)?;

    let custody_date: Option<NaiveDate> = row
        .try_get::<Option<String>, _>("custody_date")?
        .as_deref()
        .map(parse_naive_date)
        .transpose()?;
    let latest_release_date: Option<NaiveDate> = row
        .try_get::<Option<String>, _>("latest_release_date")?
        .as_deref()
        .map(parse_naive_date)
        .transpose()?;
    let birthdate: Option<NaiveDate> = row
        .try_get::<Option<String>, _>("birthdate")?
        .as_deref()
        .map(parse_naive_date)
        .transpose()?;

    Ok(Some(StoredRecord {
        person_id: row.try_get("person_id")?,
        record: StructuredRecord {
            record_id,
            surname: row.try_get("surname")?,
            given_names: row.try_get("given_names")?,
            birthdate,
            sex: row.try_get("sex")?,
            race: row.try_get("race")?,
            offenses,
            min_sentence,
            max_sentence,
            custody_date,
            custody_status: row.try_get("custody_status")?,
            is_released: row.try_get::<i64, _>("is_released")? != 0,
            latest_release_date,
            latest_release_type: row.try_get("latest_release_type")?,
            facility: None,
            extra_fields,
        },
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persons::{upsert_person, Person};
    use crate::Database;
    use rollcall_core::RecordId;

    async fn setup_test_db() -> Database {
        let db = Database::in_memory().await.expect("create database");
        db.run_migrations().await.expect("run migrations");
        db
    }

    async fn insert_test_person(db: &Database, person_id: &str) {
        let person = Person {
            person_id: person_id.to_string(),
            region: "us_ny".to_string(),
            id_is_fuzzy: false,
            surname: "BOUVIER".to_string(),
            given_names: "SELMA".to_string(),
            birthdate: None,
            sex: None,
            race: None,
        };
        upsert_person(db.pool(), &person).await.expect("person");
    }

    fn sample_record(record_id: &str) -> StructuredRecord {
        let mut record =
            StructuredRecord::new(RecordId::new(record_id).expect("valid id"), "BOUVIER");
        record.offenses = vec![Offense {
            description: "GRAND LARCENY".to_string(),
            class: "D".to_string(),
        }];
        record.min_sentence = Some(SentenceDuration {
            life: false,
            years: 2,
            months: 0,
            days: 0,
        });
        record
            .extra_fields
            .insert("aggregated_sentence".to_string(), "2-4 years".to_string());
        record
    }

    #[tokio::test]
    async fn test_upsert_is_idempotent() {
        let db = setup_test_db().await;
        insert_test_person(&db, "person-1").await;
        let record = sample_record("1234567a");

        let key1 = upsert_record(db.pool(), "us_ny", &record, "person-1")
            .await
            .expect("first upsert");
        let key2 = upsert_record(db.pool(), "us_ny", &record, "person-1")
            .await
            .expect("second upsert");
        assert_eq!(key1, key2);

        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM records")
            .fetch_one(db.pool())
            .await
            .expect("count");
        assert_eq!(count, 1);
    }

    #[tokio::test]
    async fn test_round_trips_json_fields() {
        let db = setup_test_db().await;
        insert_test_person(&db, "person-1").await;
        let record = sample_record("1234567a");

        upsert_record(db.pool(), "us_ny", &record, "person-1")
            .await
            .expect("upsert");

        let stored = get_record(db.pool(), "us_ny", "1234567a")
            .await
            .expect("query")
            .expect("record exists");

        assert_eq!(stored.person_id, "person-1");
        assert_eq!(stored.record.offenses, record.offenses);
        assert_eq!(stored.record.min_sentence, record.min_sentence);
        assert_eq!(
            stored.record.extra_fields.get("aggregated_sentence"),
            Some(&"2-4 years".to_string())
        );
    }

    #[tokio::test]
    async fn test_find_and_owning_person() {
        let db = setup_test_db().await;
        insert_test_person(&db, "person-1").await;
        let record = sample_record("1234567a");

        upsert_record(db.pool(), "us_ny", &record, "person-1")
            .await
            .expect("upsert");

        let key = find_record_by_id(db.pool(), "us_ny", "1234567a")
            .await
            .expect("query")
            .expect("record found");
        assert_eq!(key.record_id, "1234567a");

        let owner = get_owning_person(db.pool(), &key)
            .await
            .expect("query")
            .expect("owner exists");
        assert_eq!(owner.person_id, "person-1");
        assert!(!owner.id_is_fuzzy);

        assert!(find_record_by_id(db.pool(), "us_fl", "1234567a")
            .await
            .expect("query")
            .is_none());
    }
}
