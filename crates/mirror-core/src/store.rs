use crate::error::StoreError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use model::{entity::EntityKind, page::RecordDraft, sync::SyncCheckpoint};
use serde::Serialize;

/// Counts returned by one page upsert.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct UpsertOutcome {
    pub inserted: u64,
    pub updated: u64,
    /// Records whose stored version was already equal or newer.
    pub unchanged: u64,
}

/// Read-only per-entity statistics for the inspection command.
#[derive(Debug, Clone, Serialize)]
pub struct EntityStats {
    pub entity: EntityKind,
    pub records: i64,
    pub earliest: Option<DateTime<Utc>>,
    pub latest: Option<DateTime<Utc>>,
    pub checkpoint: Option<DateTime<Utc>>,
}

/// The relational mirror store.
///
/// `upsert_page` is atomic per page and newer-wins per record, which is what
/// makes replaying an already-applied page a no-op. `advance_checkpoint`
/// is monotonic: an older timestamp never moves the checkpoint backward.
#[async_trait]
pub trait MirrorStore: Send + Sync {
    /// Creates the record tables and the checkpoint table if missing.
    async fn ensure_schema(&self) -> Result<(), StoreError>;

    async fn upsert_page(
        &self,
        entity: EntityKind,
        records: &[RecordDraft],
    ) -> Result<UpsertOutcome, StoreError>;

    async fn checkpoint(&self, entity: EntityKind)
        -> Result<Option<SyncCheckpoint>, StoreError>;

    async fn advance_checkpoint(
        &self,
        entity: EntityKind,
        through: DateTime<Utc>,
    ) -> Result<(), StoreError>;

    async fn stats(&self, entity: EntityKind) -> Result<EntityStats, StoreError>;

    /// Human-readable database size, when the backend can report one.
    async fn database_size(&self) -> Result<Option<String>, StoreError>;
}
