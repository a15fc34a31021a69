//! Record-to-person linking.

use crate::error::Result;
use rollcall_core::RecordId;
use rollcall_db::{records, Database, PersonIdentity};

/// Links freshly scraped records to existing person identities.
///
/// Linking is deliberately simple: the candidate ids are checked in
/// encounter order and the first one already stored decides the person.
/// Later matches are ignored even if they point at a different person;
/// resolving conflicting identities is out of scope here.
#[derive(Debug, Clone)]
pub struct RecordLinker {
    db: Database,
}

impl RecordLinker {
    /// Create a linker over the application database.
    #[must_use]
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Find the person owning any of the candidate records.
    ///
    /// Returns `None` when no candidate is stored yet; the caller then
    /// mints a new identity.
    ///
    /// # Errors
    /// Returns `EngineError` if a lookup fails.
    pub async fn link_person(
        &self,
        region: &str,
        candidates: &[RecordId],
    ) -> Result<Option<PersonIdentity>> {
        for candidate in candidates {
            let Some(key) =
                records::find_record_by_id(self.db.pool(), region, candidate.as_str()).await?
            else {
                continue;
            };

            if let Some(identity) = records::get_owning_person(self.db.pool(), &key).await? {
                tracing::debug!(
                    region,
                    record_id = candidate.as_str(),
                    person_id = %identity.person_id,
                    "linked record to existing person"
                );
                return Ok(Some(identity));
            }
        }

        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rollcall_db::persons::{upsert_person, Person};
    use rollcall_db::records::upsert_record;
    use rollcall_region::StructuredRecord;

    async fn setup_test_db() -> Database {
        let db = Database::in_memory().await.expect("create database");
        db.run_migrations().await.expect("run migrations");
        db
    }

    async fn store(db: &Database, record_id: &str, person_id: &str) {
        let person = Person {
            person_id: person_id.to_string(),
            region: "us_ny".to_string(),
            id_is_fuzzy: true,
            surname: "FLANDERS".to_string(),
            given_names: "NED".to_string(),
            birthdate: None,
            sex: None,
            race: None,
        };
        upsert_person(db.pool(), &person).await.expect("person");

        let record =
            StructuredRecord::new(RecordId::new(record_id).expect("valid id"), "FLANDERS");
        upsert_record(db.pool(), "us_ny", &record, person_id)
            .await
            .expect("record");
    }

    fn ids(raw: &[&str]) -> Vec<RecordId> {
        raw.iter()
            .map(|r| RecordId::new((*r).to_string()).expect("valid id"))
            .collect()
    }

    #[tokio::test]
    async fn test_no_candidates_stored() {
        let db = setup_test_db().await;
        let linker = RecordLinker::new(db);

        let linked = linker
            .link_person("us_ny", &ids(&["1111111a", "2222222b"]))
            .await
            .expect("link");
        assert!(linked.is_none());
    }

    #[tokio::test]
    async fn test_first_match_in_encounter_order_wins() {
        let db = setup_test_db().await;
        store(&db, "2222222b", "person-b").await;
        store(&db, "3333333c", "person-c").await;
        let linker = RecordLinker::new(db);

        // 1111111a is unknown; 2222222b is the first stored candidate
        let linked = linker
            .link_person("us_ny", &ids(&["1111111a", "2222222b", "3333333c"]))
            .await
            .expect("link")
            .expect("a match");
        assert_eq!(linked.person_id, "person-b");
    }

    #[tokio::test]
    async fn test_linking_is_deterministic() {
        let db = setup_test_db().await;
        store(&db, "2222222b", "person-b").await;
        store(&db, "3333333c", "person-c").await;
        let linker = RecordLinker::new(db);

        let candidates = ids(&["2222222b", "3333333c"]);
        for _ in 0..5 {
            let linked = linker
                .link_person("us_ny", &candidates)
                .await
                .expect("link")
                .expect("a match");
            assert_eq!(linked.person_id, "person-b");
        }
    }

    #[tokio::test]
    async fn test_region_scoping() {
        let db = setup_test_db().await;
        store(&db, "2222222b", "person-b").await;
        let linker = RecordLinker::new(db);

        let linked = linker
            .link_person("us_fl", &ids(&["2222222b"]))
            .await
            .expect("link");
        assert!(linked.is_none());
    }
}
