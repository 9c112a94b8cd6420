//! In-memory stand-ins for the API, the store, and the archive. They keep
//! the same contracts as the real connectors (window filtering, newer-wins
//! upserts, monotonic checkpoints) so the orchestrator can be exercised
//! end to end without a network or a database.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use mirror_core::{
    archive::PageArchive,
    error::{ArchiveError, SourceError, StoreError},
    source::CatalogSource,
    store::{EntityStats, MirrorStore, UpsertOutcome},
};
use model::{
    entity::EntityKind,
    page::{CatalogPage, RecordDraft},
    sync::SyncCheckpoint,
    window::TimeWindow,
};
use serde_json::{Value, json};
use std::{
    collections::{BTreeMap, HashMap, HashSet},
    path::PathBuf,
    sync::{
        Mutex,
        atomic::{AtomicBool, Ordering},
    },
};

/// A scriptable catalog API. Records are filtered by the requested window
/// and paginated exactly like the remote: `totalResults` counts everything
/// matching the query, each page returns at most `results_per_page`.
#[derive(Default)]
pub struct FakeCatalog {
    records: Mutex<HashMap<EntityKind, Vec<RecordDraft>>>,
    /// Remaining 429 responses to serve, keyed by (entity, start_index).
    throttle: Mutex<HashMap<(EntityKind, u64), usize>>,
    /// Entities whose every request fails with a credential rejection.
    auth_failures: Mutex<HashSet<EntityKind>>,
    /// Every call, throttled or not, in order.
    requests: Mutex<Vec<(EntityKind, TimeWindow, u64)>>,
}

impl FakeCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_record(&self, entity: EntityKind, id: &str, last_modified: DateTime<Utc>) {
        let draft = RecordDraft {
            id: id.to_string(),
            payload: json!({ "id": id, "lastModified": last_modified.to_rfc3339() }),
            last_modified,
        };
        self.records
            .lock()
            .unwrap()
            .entry(entity)
            .or_default()
            .push(draft);
    }

    /// Answer the next `times` requests at this offset with a 429.
    pub fn throttle_at(&self, entity: EntityKind, start_index: u64, times: usize) {
        self.throttle
            .lock()
            .unwrap()
            .insert((entity, start_index), times);
    }

    pub fn fail_auth(&self, entity: EntityKind) {
        self.auth_failures.lock().unwrap().insert(entity);
    }

    /// Number of calls made for this (entity, offset), retries included.
    pub fn attempts_at(&self, entity: EntityKind, start_index: u64) -> usize {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .filter(|(e, _, s)| *e == entity && *s == start_index)
            .count()
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    /// Distinct windows requested for an entity, in first-seen order.
    pub fn requested_windows(&self, entity: EntityKind) -> Vec<TimeWindow> {
        let mut seen = Vec::new();
        for (e, window, _) in self.requests.lock().unwrap().iter() {
            if *e == entity && !seen.contains(window) {
                seen.push(*window);
            }
        }
        seen
    }
}

#[async_trait]
impl CatalogSource for FakeCatalog {
    async fn fetch_page(
        &self,
        entity: EntityKind,
        window: &TimeWindow,
        start_index: u64,
        results_per_page: usize,
    ) -> Result<CatalogPage, SourceError> {
        self.requests
            .lock()
            .unwrap()
            .push((entity, *window, start_index));

        if self.auth_failures.lock().unwrap().contains(&entity) {
            return Err(SourceError::Auth("invalid API key".into()));
        }
        if let Some(remaining) = self.throttle.lock().unwrap().get_mut(&(entity, start_index))
            && *remaining > 0
        {
            *remaining -= 1;
            return Err(SourceError::Throttled);
        }

        let records = self.records.lock().unwrap();
        let matching: Vec<RecordDraft> = records
            .get(&entity)
            .map(|all| {
                all.iter()
                    .filter(|r| window.contains(r.last_modified))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();

        let total = matching.len() as u64;
        let page: Vec<RecordDraft> = matching
            .into_iter()
            .skip(start_index as usize)
            .take(results_per_page)
            .collect();
        let returned = page.len();
        let raw = json!({
            "startIndex": start_index,
            "totalResults": total,
            entity.profile().items_key: page.iter().map(|r| r.payload.clone()).collect::<Vec<_>>(),
        });

        Ok(CatalogPage {
            entity,
            start_index,
            total_results: total,
            returned,
            records: page,
            skipped: 0,
            raw,
        })
    }
}

/// An in-memory `MirrorStore` with the same upsert and checkpoint semantics
/// as the Postgres connector.
#[derive(Default)]
pub struct MemoryStore {
    records: Mutex<HashMap<EntityKind, BTreeMap<String, (Value, DateTime<Utc>)>>>,
    checkpoints: Mutex<HashMap<EntityKind, SyncCheckpoint>>,
    fail_next_upsert: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next `upsert_page` fail before writing anything.
    pub fn fail_next_upsert(&self) {
        self.fail_next_upsert.store(true, Ordering::SeqCst);
    }

    pub fn record_count(&self, entity: EntityKind) -> usize {
        self.records
            .lock()
            .unwrap()
            .get(&entity)
            .map_or(0, BTreeMap::len)
    }

    pub fn record_ids(&self, entity: EntityKind) -> Vec<String> {
        self.records
            .lock()
            .unwrap()
            .get(&entity)
            .map(|m| m.keys().cloned().collect())
            .unwrap_or_default()
    }

    pub fn last_modified_of(&self, entity: EntityKind, id: &str) -> Option<DateTime<Utc>> {
        self.records
            .lock()
            .unwrap()
            .get(&entity)
            .and_then(|m| m.get(id))
            .map(|(_, ts)| *ts)
    }

    pub fn checkpoint_of(&self, entity: EntityKind) -> Option<DateTime<Utc>> {
        self.checkpoints
            .lock()
            .unwrap()
            .get(&entity)
            .map(|c| c.last_synced_through)
    }

    /// Seed a checkpoint directly, bypassing the monotonic advance.
    pub fn set_checkpoint(&self, entity: EntityKind, through: DateTime<Utc>) {
        self.checkpoints.lock().unwrap().insert(
            entity,
            SyncCheckpoint {
                entity,
                last_synced_through: through,
                updated_at: Utc::now(),
            },
        );
    }
}

#[async_trait]
impl MirrorStore for MemoryStore {
    async fn ensure_schema(&self) -> Result<(), StoreError> {
        Ok(())
    }

    async fn upsert_page(
        &self,
        entity: EntityKind,
        records: &[RecordDraft],
    ) -> Result<UpsertOutcome, StoreError> {
        if self.fail_next_upsert.swap(false, Ordering::SeqCst) {
            return Err(StoreError::query("injected upsert failure"));
        }

        let mut all = self.records.lock().unwrap();
        let table = all.entry(entity).or_default();
        let mut outcome = UpsertOutcome::default();
        for record in records {
            match table.get_mut(&record.id) {
                None => {
                    table.insert(
                        record.id.clone(),
                        (record.payload.clone(), record.last_modified),
                    );
                    outcome.inserted += 1;
                }
                Some((payload, stored)) if *stored < record.last_modified => {
                    *payload = record.payload.clone();
                    *stored = record.last_modified;
                    outcome.updated += 1;
                }
                Some(_) => outcome.unchanged += 1,
            }
        }
        Ok(outcome)
    }

    async fn checkpoint(&self, entity: EntityKind) -> Result<Option<SyncCheckpoint>, StoreError> {
        Ok(self.checkpoints.lock().unwrap().get(&entity).cloned())
    }

    async fn advance_checkpoint(
        &self,
        entity: EntityKind,
        through: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let mut checkpoints = self.checkpoints.lock().unwrap();
        let entry = checkpoints.entry(entity).or_insert(SyncCheckpoint {
            entity,
            last_synced_through: through,
            updated_at: Utc::now(),
        });
        if through > entry.last_synced_through {
            entry.last_synced_through = through;
        }
        entry.updated_at = Utc::now();
        Ok(())
    }

    async fn stats(&self, entity: EntityKind) -> Result<EntityStats, StoreError> {
        let records = self.records.lock().unwrap();
        let table = records.get(&entity);
        Ok(EntityStats {
            entity,
            records: table.map_or(0, |t| t.len() as i64),
            earliest: table.and_then(|t| t.values().map(|(_, ts)| *ts).min()),
            latest: table.and_then(|t| t.values().map(|(_, ts)| *ts).max()),
            checkpoint: self.checkpoint_of(entity),
        })
    }

    async fn database_size(&self) -> Result<Option<String>, StoreError> {
        Ok(None)
    }
}

/// Records archived pages without touching the filesystem.
#[derive(Default)]
pub struct MemoryArchive {
    pages: Mutex<Vec<(EntityKind, u64)>>,
}

impl MemoryArchive {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn archived(&self) -> Vec<(EntityKind, u64)> {
        self.pages.lock().unwrap().clone()
    }
}

#[async_trait]
impl PageArchive for MemoryArchive {
    async fn archive(
        &self,
        entity: EntityKind,
        start_index: u64,
        _raw: &Value,
    ) -> Result<PathBuf, ArchiveError> {
        self.pages.lock().unwrap().push((entity, start_index));
        Ok(PathBuf::new())
    }

    async fn sweep(&self) -> Result<usize, ArchiveError> {
        Ok(0)
    }
}

/// An archive whose writes always fail, for failure-isolation scenarios.
pub struct FailingArchive;

#[async_trait]
impl PageArchive for FailingArchive {
    async fn archive(
        &self,
        _entity: EntityKind,
        _start_index: u64,
        _raw: &Value,
    ) -> Result<PathBuf, ArchiveError> {
        Err(ArchiveError::Io(std::io::Error::other(
            "injected archive failure",
        )))
    }

    async fn sweep(&self) -> Result<usize, ArchiveError> {
        Ok(0)
    }
}
