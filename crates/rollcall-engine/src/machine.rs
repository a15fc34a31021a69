//! The crawl state machine.
//!
//! Each crawl step runs as a queued task and enqueues its successor;
//! nothing loops in-process, so progress survives restarts. Handlers are
//! idempotent under redelivery: records upsert, markers claim, snapshots
//! only append on change.
//!
//! Error disposition rules:
//! - transient adapter errors (network, missing form fields) fail the
//!   task so the queue redelivers it with backoff
//! - permanent adapter errors (page shape mismatch) are logged with the
//!   page body and dropped
//! - repeated results-page failures run the end-of-roster/lost-session
//!   classification in [`CrawlStateMachine::results_failure`]

use crate::error::{EngineError, Result};
use crate::failures::{FailCounter, MAX_RESULTS_FAILURES};
use crate::linker::RecordLinker;
use crate::proxy::ProxyCredentialProvider;
use rollcall_core::{AppConfig, GroupId, NameQuery, PersonId, RecordId, RegionConfig, RegionId};
use rollcall_db::persons::{self, Person, PersonIdentity};
use rollcall_db::{markers, records, sessions, snapshots, Database};
use rollcall_queue::{Task, TaskPayload, TaskQueue, TaskType};
use rollcall_region::{
    DetailOutcome, DetailRef, DisambiguationEntry, ErrorKind, FetchClient, FormTokens,
    RegionAdapter, RegionError, RegionRegistry, StructuredRecord,
};
use std::sync::Arc;

/// What the worker should do with the task after handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// Ack the task; it is finished (including deliberate drops).
    Complete,
    /// Fail the task so the queue redelivers it.
    Retry,
}

/// Drives crawl tasks through fetch, parse, fan-out, and storage.
pub struct CrawlStateMachine {
    db: Database,
    queue: Arc<dyn TaskQueue>,
    registry: RegionRegistry,
    linker: RecordLinker,
    failures: FailCounter,
    proxy: ProxyCredentialProvider,
    config: AppConfig,
}

impl CrawlStateMachine {
    /// Create a state machine over the shared database, queue, and
    /// adapter registry.
    #[must_use]
    pub fn new(
        db: Database,
        queue: Arc<dyn TaskQueue>,
        registry: RegionRegistry,
        config: AppConfig,
    ) -> Self {
        let linker = RecordLinker::new(db.clone());
        let proxy = ProxyCredentialProvider::new(config.proxy.clone());
        Self {
            db,
            queue,
            registry,
            linker,
            failures: FailCounter::new(),
            proxy,
            config,
        }
    }

    /// The shared task queue.
    #[must_use]
    pub fn queue(&self) -> &Arc<dyn TaskQueue> {
        &self.queue
    }

    /// The shared database.
    #[must_use]
    pub fn db(&self) -> &Database {
        &self.db
    }

    pub(crate) fn region_config(&self, region: &RegionId) -> Result<&RegionConfig> {
        self.config
            .region(region.as_str())
            .map_err(|_| EngineError::NotConfigured {
                region: region.to_string(),
            })
    }

    fn adapter(&self, region: &RegionId) -> Result<Arc<dyn RegionAdapter>> {
        self.registry
            .get(region)
            .ok_or_else(|| EngineError::NoAdapter {
                region: region.to_string(),
            })
    }

    fn fetch_client(&self) -> Result<FetchClient> {
        Ok(self.proxy.fetch_client(&self.config.scraping)?)
    }

    /// Enqueue the opening search task for a query.
    pub async fn submit_search(&self, region: &RegionId, query: &NameQuery) -> Result<()> {
        let payload = TaskPayload {
            surname: Some(query.surname.clone()),
            given_names: Some(query.given_names.clone()),
            first_page: true,
            ..TaskPayload::default()
        };

        self.queue
            .enqueue(Task::new(region.clone(), TaskType::SearchPage, payload))
            .await?;

        tracing::info!(region = %region, query = %query, "search submitted");

        Ok(())
    }

    /// Dispatch a leased task to its handler.
    pub async fn handle_task(&self, task: &Task) -> Result<Disposition> {
        match task.task_type {
            TaskType::SearchPage => self.handle_search_page(task).await,
            TaskType::ResultsPage => self.handle_results_page(task).await,
            TaskType::DetailPage | TaskType::Disambiguation => {
                self.handle_detail_page(task).await
            }
        }
    }

    /// Fetch the search form and hand its tokens to a results task.
    async fn handle_search_page(&self, task: &Task) -> Result<Disposition> {
        let adapter = self.adapter(&task.region)?;
        let client = self.fetch_client()?;

        let tokens = match adapter.fetch_search_form(&client).await {
            Ok(tokens) => tokens,
            Err(err) => return Ok(self.dispose_region_error(&task.region, "search form", &err)),
        };

        let payload = TaskPayload {
            form: tokens.fields,
            first_page: true,
            ..task.payload.clone()
        };
        self.queue
            .enqueue(Task::new(
                task.region.clone(),
                TaskType::ResultsPage,
                payload,
            ))
            .await?;

        Ok(Disposition::Complete)
    }

    /// Submit or continue a search, fan out over its rows, and advance
    /// the cursor.
    async fn handle_results_page(&self, task: &Task) -> Result<Disposition> {
        let adapter = self.adapter(&task.region)?;
        let client = self.fetch_client()?;
        let region = task.region.as_str();

        // A results page landing after stop() closed the session is
        // stale work; discard it without side effects.
        let Some(session) =
            sessions::get_open_session(self.db.pool(), region).await?
        else {
            tracing::info!(region, "no open session; discarding results page");
            return Ok(Disposition::Complete);
        };

        let tokens = FormTokens {
            fields: task.payload.form.clone(),
        };
        let query = NameQuery::new(
            task.payload.surname.clone().unwrap_or_default(),
            task.payload.given_names.clone().unwrap_or_default(),
        );

        let fetched = if task.payload.first_page {
            adapter.submit_search(&client, &tokens, &query).await
        } else {
            adapter.fetch_results_page(&client, &tokens).await
        };
        let page = match fetched {
            Ok(page) => page,
            Err(err) => return Ok(self.dispose_region_error(&task.region, "results fetch", &err)),
        };

        let listing = match adapter.parse_results_page(&page) {
            Ok(listing) => listing,
            Err(err) => {
                tracing::warn!(region, error = %err, "results page failed to parse");
                return self.results_failure(&task.region).await;
            }
        };

        for row in &listing.rows {
            let payload = TaskPayload {
                form: row.form.fields.clone(),
                ..TaskPayload::default()
            };
            self.queue
                .enqueue(Task::new(
                    task.region.clone(),
                    TaskType::DetailPage,
                    payload,
                ))
                .await?;
        }

        let Some(next) = listing.next_page else {
            // The next button is expected on every page until the end
            // of the roster, so its absence runs the classification.
            tracing::warn!(region, "results page has no next-page form");
            return self.results_failure(&task.region).await;
        };

        sessions::update_cursor(self.db.pool(), &session.id, &listing.cursor_hint).await?;
        self.failures.reset(&task.region);

        let payload = TaskPayload {
            surname: task.payload.surname.clone(),
            given_names: task.payload.given_names.clone(),
            form: next.fields,
            first_page: false,
            ..TaskPayload::default()
        };
        self.queue
            .enqueue(Task::new(
                task.region.clone(),
                TaskType::ResultsPage,
                payload,
            ))
            .await?;

        tracing::debug!(
            region,
            rows = listing.rows.len(),
            cursor = %listing.cursor_hint,
            "results page consumed"
        );

        Ok(Disposition::Complete)
    }

    /// Classify a repeated results-page failure: plain retry, end of
    /// roster, or lost remote session.
    async fn results_failure(&self, region: &RegionId) -> Result<Disposition> {
        let count = self.failures.record_failure(region);
        if count < MAX_RESULTS_FAILURES {
            tracing::warn!(region = %region, count, "results failure; will retry");
            return Ok(Disposition::Retry);
        }

        let pool = self.db.pool();
        let cursor = match sessions::get_open_session(pool, region.as_str())
            .await?
            .and_then(|s| s.last_scraped)
        {
            Some(cursor) => Some(cursor),
            None => sessions::most_recent_cursor(pool, region.as_str()).await?,
        };

        let Some(cursor) = cursor else {
            // Nothing to classify against; keep retrying and let the
            // operator intervene.
            tracing::error!(region = %region, "repeated results failures with no cursor recorded");
            return Ok(Disposition::Retry);
        };

        let sentinel = self.region_config(region)?.end_of_data_sentinel.clone();
        let reached_end =
            NameQuery::from_cursor(&cursor).surname.to_uppercase() >= sentinel.to_uppercase();

        self.failures.reset(region);

        if reached_end {
            tracing::info!(region = %region, cursor = %cursor, "crawl reached end of roster; closing session");
            sessions::close_open_sessions(pool, region.as_str()).await?;
            self.queue.purge(region).await?;
        } else {
            tracing::warn!(
                region = %region,
                cursor = %cursor,
                "remote session lost before end of roster; resuming from cursor"
            );
            self.resume_from_cursor(region, &cursor).await?;
        }

        Ok(Disposition::Complete)
    }

    /// Fetch and parse one detail page, then store or fan out.
    async fn handle_detail_page(&self, task: &Task) -> Result<Disposition> {
        let adapter = self.adapter(&task.region)?;
        let client = self.fetch_client()?;

        let detail = DetailRef {
            form: FormTokens {
                fields: task.payload.form.clone(),
            },
        };
        let page = match adapter.fetch_detail(&client, &detail).await {
            Ok(page) => page,
            Err(err) => return Ok(self.dispose_region_error(&task.region, "detail fetch", &err)),
        };

        match adapter.parse_detail(&page) {
            Ok(DetailOutcome::Record(record)) => self.store_record(task, *record).await,
            Ok(DetailOutcome::Disambiguation(entries)) => {
                self.handle_disambiguation(task, &entries).await
            }
            Err(err) => Ok(self.dispose_region_error(&task.region, "detail parse", &err)),
        }
    }

    /// Link a record to a person and persist person, record, and
    /// facility snapshot.
    ///
    /// The three writes are independently idempotent, so redelivery
    /// after a mid-sequence failure repeats them harmlessly.
    async fn store_record(&self, task: &Task, record: StructuredRecord) -> Result<Disposition> {
        let region = task.region.as_str();
        let pool = self.db.pool();

        let mut candidates = vec![record.record_id.clone()];
        for raw in &task.payload.linked_records {
            if raw != record.record_id.as_str() {
                if let Ok(id) = RecordId::new(raw.clone()) {
                    candidates.push(id);
                }
            }
        }

        let identity = match self.linker.link_person(region, &candidates).await? {
            Some(identity) => identity,
            None => {
                // No stored sibling decides the person; fall back to the
                // disambiguation group id, then to a minted fuzzy id.
                let person_id = match &task.payload.group_id {
                    Some(group) => GroupId::from_string(group.clone()).into_person_id(),
                    None => PersonId::generate(),
                };
                PersonIdentity {
                    person_id: person_id.as_str().to_string(),
                    id_is_fuzzy: true,
                }
            }
        };

        let person = Person {
            person_id: identity.person_id.clone(),
            region: region.to_string(),
            id_is_fuzzy: identity.id_is_fuzzy,
            surname: record.surname.clone(),
            given_names: record.given_names.clone(),
            birthdate: record.birthdate,
            sex: record.sex.clone(),
            race: record.race.clone(),
        };
        persons::upsert_person(pool, &person).await?;

        let key = records::upsert_record(pool, region, &record, &identity.person_id).await?;
        snapshots::append_snapshot_if_changed(
            pool,
            region,
            &key.record_id,
            record.facility.as_deref(),
        )
        .await?;

        tracing::info!(
            region,
            record_id = %key.record_id,
            person_id = %identity.person_id,
            "record stored"
        );

        Ok(Disposition::Complete)
    }

    /// Fan out over a disambiguation listing, skipping decoys and
    /// already-claimed record ids.
    async fn handle_disambiguation(
        &self,
        task: &Task,
        entries: &[DisambiguationEntry],
    ) -> Result<Disposition> {
        let region = task.region.as_str();
        let pool = self.db.pool();

        // Side effects only run against an open session; a fan-out
        // landing after stop() would repopulate a purged queue.
        let Some(session) = sessions::get_open_session(pool, region).await? else {
            tracing::info!(region, "no open session; dropping disambiguation fan-out");
            return Ok(Disposition::Complete);
        };

        let group = GroupId::generate();
        let linked: Vec<String> = entries
            .iter()
            .filter_map(DisambiguationEntry::record_id)
            .map(|id| id.to_string())
            .collect();

        let mut enqueued = 0_u32;
        for entry in entries {
            let Some(record_id) = entry.record_id() else {
                tracing::debug!(region, "skipping decoy disambiguation row");
                continue;
            };

            if markers::was_record_scraped_since(
                pool,
                region,
                record_id.as_str(),
                session.start_time,
            )
            .await?
            {
                tracing::debug!(region, record_id = %record_id, "already claimed this session");
                continue;
            }

            // The marker is advisory; losing it only costs a duplicate
            // scrape, so a failed write must not kill the fan-out.
            if let Err(err) = markers::mark_record_scraped(pool, region, record_id.as_str()).await
            {
                tracing::warn!(region, record_id = %record_id, error = %err, "scrape marker write failed");
            }

            let payload = TaskPayload {
                form: entry.form.fields.clone(),
                group_id: Some(group.to_string()),
                linked_records: linked.clone(),
                ..TaskPayload::default()
            };
            self.queue
                .enqueue(Task::new(
                    task.region.clone(),
                    TaskType::DetailPage,
                    payload,
                ))
                .await?;
            enqueued += 1;
        }

        tracing::info!(
            region,
            group_id = %group,
            entries = entries.len(),
            enqueued,
            "disambiguation fanned out"
        );

        Ok(Disposition::Complete)
    }

    fn dispose_region_error(
        &self,
        region: &RegionId,
        context: &str,
        err: &RegionError,
    ) -> Disposition {
        match err.kind() {
            ErrorKind::Transient => {
                tracing::warn!(region = %region, context, error = %err, "transient failure; will retry");
                Disposition::Retry
            }
            ErrorKind::Permanent => {
                if let RegionError::UnexpectedShape { reason, page } = err {
                    tracing::error!(
                        region = %region,
                        context,
                        reason,
                        page,
                        "page shape mismatch; dropping task"
                    );
                } else {
                    tracing::error!(region = %region, context, error = %err, "permanent failure; dropping task");
                }
                Disposition::Complete
            }
        }
    }
}
