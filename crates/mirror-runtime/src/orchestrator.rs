use crate::error::SyncError;
use chrono::{Duration, Utc};
use mirror_core::{
    archive::PageArchive,
    retry::RetryError,
    source::{CatalogSource, ResilientSource},
    store::MirrorStore,
};
use model::{
    entity::EntityKind,
    report::{EntityOutcome, EntityReport, RunOutcome, RunReport},
    sync::{SyncMode, SyncStage},
    window::TimeWindow,
};
use planner::{pages::PageWalk, windows::WindowPlan};
use std::sync::Arc;
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct SyncOptions {
    pub mode: SyncMode,
    pub entities: Vec<EntityKind>,
    pub results_per_page: usize,
    /// Windows end this far before "now" so data still being committed at
    /// the source is not queried.
    pub safety_delay: Duration,
}

impl SyncOptions {
    pub fn new(mode: SyncMode) -> Self {
        Self {
            mode,
            entities: EntityKind::ALL.to_vec(),
            results_per_page: 2000,
            safety_delay: Duration::minutes(5),
        }
    }
}

/// Running tallies and position of one entity's state machine, kept outside
/// the fallible loop so a failure report can say where it happened.
#[derive(Debug, Default)]
struct EntityProgress {
    stage: Option<SyncStage>,
    window: Option<TimeWindow>,
    windows_completed: u64,
    pages_fetched: u64,
    inserted: u64,
    updated: u64,
    unchanged: u64,
    skipped: u64,
}

/// Drives the per-entity state machine
/// `PLANNING -> FETCHING -> ARCHIVING -> APPLYING -> CHECKPOINTING` over the
/// planned windows, sequentially per entity and sequentially across
/// entities. A failure terminates only the entity it happened in; the
/// checkpoint stays at the last durably applied position, and the next run
/// replans from there.
pub struct SyncOrchestrator<S: CatalogSource> {
    source: ResilientSource<S>,
    store: Arc<dyn MirrorStore>,
    archive: Arc<dyn PageArchive>,
    opts: SyncOptions,
    cancel: CancellationToken,
}

impl<S: CatalogSource> SyncOrchestrator<S> {
    pub fn new(
        source: ResilientSource<S>,
        store: Arc<dyn MirrorStore>,
        archive: Arc<dyn PageArchive>,
        opts: SyncOptions,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            source,
            store,
            archive,
            opts,
            cancel,
        }
    }

    pub async fn run(&self) -> RunReport {
        let run_id = new_run_id();
        info!(run = %run_id, mode = %self.opts.mode, "starting mirror sync");

        // Retention sweep is off the critical path; a failed sweep must not
        // block synchronization.
        if let Err(err) = self.archive.sweep().await {
            warn!(%err, "archive sweep failed, continuing");
        }

        let mut entities = Vec::with_capacity(self.opts.entities.len());
        let mut interrupted = false;
        for entity in &self.opts.entities {
            if interrupted || self.cancel.is_cancelled() {
                warn!(run = %run_id, entity = %entity, "skipping entity, shutdown requested");
                entities.push(skipped_report(*entity));
                continue;
            }
            let report = self.sync_entity(*entity, &run_id).await;
            interrupted = matches!(report.outcome, EntityOutcome::Interrupted);
            entities.push(report);
        }

        let outcome = RunOutcome::from_entities(&entities);
        info!(run = %run_id, outcome = ?outcome, "mirror sync finished");
        RunReport {
            run_id,
            mode: self.opts.mode,
            outcome,
            entities,
        }
    }

    async fn sync_entity(&self, entity: EntityKind, run_id: &str) -> EntityReport {
        let started = Instant::now();
        info!(run = %run_id, entity = %entity, "syncing entity");

        let mut progress = EntityProgress::default();
        let result = self.run_entity(entity, &mut progress).await;

        // Report whatever checkpoint is durable now, advanced or not.
        let checkpoint = match self.store.checkpoint(entity).await {
            Ok(cp) => cp.map(|c| c.last_synced_through),
            Err(err) => {
                warn!(entity = %entity, %err, "could not read checkpoint for report");
                None
            }
        };

        let outcome = match result {
            Ok(()) => {
                info!(
                    run = %run_id,
                    entity = %entity,
                    windows = progress.windows_completed,
                    pages = progress.pages_fetched,
                    inserted = progress.inserted,
                    updated = progress.updated,
                    unchanged = progress.unchanged,
                    "entity sync done"
                );
                EntityOutcome::Done
            }
            Err(SyncError::Interrupted) => {
                warn!(run = %run_id, entity = %entity, "entity sync interrupted");
                EntityOutcome::Interrupted
            }
            Err(err) => {
                let stage = progress.stage.unwrap_or(SyncStage::Planning);
                error!(
                    run = %run_id,
                    entity = %entity,
                    stage = %stage,
                    window = ?progress.window,
                    %err,
                    "entity sync failed"
                );
                EntityOutcome::Failed {
                    stage,
                    window: progress.window,
                    error: err.to_string(),
                }
            }
        };

        EntityReport {
            entity,
            outcome,
            windows_completed: progress.windows_completed,
            pages_fetched: progress.pages_fetched,
            inserted: progress.inserted,
            updated: progress.updated,
            unchanged: progress.unchanged,
            skipped: progress.skipped,
            checkpoint,
            duration_ms: started.elapsed().as_millis() as u64,
        }
    }

    async fn run_entity(
        &self,
        entity: EntityKind,
        progress: &mut EntityProgress,
    ) -> Result<(), SyncError> {
        progress.stage = Some(SyncStage::Planning);
        let checkpoint = self
            .store
            .checkpoint(entity)
            .await?
            .map(|c| c.last_synced_through);
        let plan = WindowPlan::new(
            self.opts.mode,
            checkpoint,
            Utc::now(),
            self.opts.safety_delay,
            entity.max_window_span(),
        );
        let page_size = self.opts.results_per_page.min(entity.profile().page_cap);

        for window in plan {
            if self.cancel.is_cancelled() {
                return Err(SyncError::Interrupted);
            }
            progress.window = Some(window);

            let mut walk = PageWalk::new(page_size);
            while let Some(start_index) = walk.next_start_index() {
                if self.cancel.is_cancelled() {
                    return Err(SyncError::Interrupted);
                }

                progress.stage = Some(SyncStage::Fetching);
                let page = self
                    .source
                    .fetch_page(entity, &window, start_index, page_size)
                    .await
                    .map_err(|err| match err {
                        RetryError::Fatal(e) => SyncError::Source(e),
                        RetryError::AttemptsExceeded(e) => SyncError::RetriesExhausted(e),
                    })?;
                progress.pages_fetched += 1;

                // Archive before apply: any page that reaches the store has
                // a raw copy first.
                progress.stage = Some(SyncStage::Archiving);
                self.archive.archive(entity, start_index, &page.raw).await?;

                progress.stage = Some(SyncStage::Applying);
                if !page.records.is_empty() {
                    let applied = self.store.upsert_page(entity, &page.records).await?;
                    progress.inserted += applied.inserted;
                    progress.updated += applied.updated;
                    progress.unchanged += applied.unchanged;
                }
                progress.skipped += page.skipped as u64;

                // Tighten the checkpoint within the window so an interrupt
                // mid-window resumes past what is already durable.
                progress.stage = Some(SyncStage::Checkpointing);
                if let Some(max_modified) = page.max_last_modified() {
                    self.store.advance_checkpoint(entity, max_modified).await?;
                }

                walk.record_page(page.returned, page.total_results);
                progress.stage = Some(SyncStage::Planning);
            }

            // Whole window applied: the checkpoint now covers its end.
            self.store.advance_checkpoint(entity, window.end).await?;
            progress.windows_completed += 1;
            debug!(entity = %entity, window = %window, "window completed");
        }

        Ok(())
    }
}

fn new_run_id() -> String {
    let id = Uuid::new_v4().simple().to_string();
    format!("run-{}", &id[..8])
}

fn skipped_report(entity: EntityKind) -> EntityReport {
    EntityReport {
        entity,
        outcome: EntityOutcome::Interrupted,
        windows_completed: 0,
        pages_fetched: 0,
        inserted: 0,
        updated: 0,
        unchanged: 0,
        skipped: 0,
        checkpoint: None,
        duration_ms: 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::DateTime;
    use mirror_core::{
        error::{ArchiveError, SourceError, StoreError},
        rate::RateBudget,
        retry::RetryPolicy,
        store::{EntityStats, UpsertOutcome},
    };
    use model::page::{CatalogPage, RecordDraft};
    use std::path::PathBuf;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct EmptySource {
        requests: AtomicUsize,
    }

    #[async_trait]
    impl CatalogSource for EmptySource {
        async fn fetch_page(
            &self,
            entity: EntityKind,
            _window: &TimeWindow,
            start_index: u64,
            _results_per_page: usize,
        ) -> Result<CatalogPage, SourceError> {
            self.requests.fetch_add(1, Ordering::SeqCst);
            Ok(CatalogPage::empty(entity, start_index))
        }
    }

    struct StaticStore {
        checkpoint: Option<DateTime<Utc>>,
    }

    #[async_trait]
    impl MirrorStore for StaticStore {
        async fn ensure_schema(&self) -> Result<(), StoreError> {
            Ok(())
        }

        async fn upsert_page(
            &self,
            _entity: EntityKind,
            _records: &[RecordDraft],
        ) -> Result<UpsertOutcome, StoreError> {
            Ok(UpsertOutcome::default())
        }

        async fn checkpoint(
            &self,
            entity: EntityKind,
        ) -> Result<Option<model::sync::SyncCheckpoint>, StoreError> {
            Ok(self.checkpoint.map(|ts| model::sync::SyncCheckpoint {
                entity,
                last_synced_through: ts,
                updated_at: ts,
            }))
        }

        async fn advance_checkpoint(
            &self,
            _entity: EntityKind,
            _through: DateTime<Utc>,
        ) -> Result<(), StoreError> {
            Ok(())
        }

        async fn stats(&self, entity: EntityKind) -> Result<EntityStats, StoreError> {
            Ok(EntityStats {
                entity,
                records: 0,
                earliest: None,
                latest: None,
                checkpoint: self.checkpoint,
            })
        }

        async fn database_size(&self) -> Result<Option<String>, StoreError> {
            Ok(None)
        }
    }

    struct NullArchive;

    #[async_trait]
    impl PageArchive for NullArchive {
        async fn archive(
            &self,
            _entity: EntityKind,
            _start_index: u64,
            _raw: &serde_json::Value,
        ) -> Result<PathBuf, ArchiveError> {
            Ok(PathBuf::new())
        }

        async fn sweep(&self) -> Result<usize, ArchiveError> {
            Ok(0)
        }
    }

    fn orchestrator(
        source: Arc<EmptySource>,
        checkpoint: Option<DateTime<Utc>>,
        cancel: CancellationToken,
    ) -> SyncOrchestrator<Arc<EmptySource>> {
        let resilient = ResilientSource::new(
            source,
            Arc::new(RateBudget::new(1000, std::time::Duration::from_secs(1))),
            RetryPolicy::default(),
        );
        SyncOrchestrator::new(
            resilient,
            Arc::new(StaticStore { checkpoint }),
            Arc::new(NullArchive),
            SyncOptions::new(SyncMode::Incremental),
            cancel,
        )
    }

    #[tokio::test]
    async fn nothing_new_completes_without_requests() {
        let source = Arc::new(EmptySource {
            requests: AtomicUsize::new(0),
        });
        // Checkpoint within the safety delay: the planner yields no windows.
        let orch = orchestrator(source.clone(), Some(Utc::now()), CancellationToken::new());

        let report = orch.run().await;

        assert_eq!(report.outcome, RunOutcome::Success);
        assert_eq!(source.requests.load(Ordering::SeqCst), 0);
        for entity in &report.entities {
            assert!(entity.outcome.is_done());
            assert_eq!(entity.windows_completed, 0);
        }
    }

    #[tokio::test]
    async fn cancelled_run_reports_interrupted() {
        let source = Arc::new(EmptySource {
            requests: AtomicUsize::new(0),
        });
        let cancel = CancellationToken::new();
        cancel.cancel();
        let orch = orchestrator(source.clone(), None, cancel);

        let report = orch.run().await;

        assert_eq!(report.outcome, RunOutcome::Interrupted);
        assert_eq!(source.requests.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn run_ids_are_short_and_unique() {
        let a = new_run_id();
        let b = new_run_id();
        assert!(a.starts_with("run-"));
        assert_eq!(a.len(), "run-".len() + 8);
        assert_ne!(a, b);
    }
}
