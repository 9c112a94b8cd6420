use crate::error::ArchiveError;
use async_trait::async_trait;
use model::entity::EntityKind;
use serde_json::Value;
use std::path::PathBuf;

/// Durable, append-only storage of raw fetched pages.
///
/// `archive` must complete before the page is applied to the store, so any
/// page that reached the database also has a raw copy for audit and replay.
/// `sweep` is off the critical path; its failure never blocks a sync.
#[async_trait]
pub trait PageArchive: Send + Sync {
    /// Persists one raw page. Either the whole artifact lands or none of it.
    async fn archive(
        &self,
        entity: EntityKind,
        start_index: u64,
        raw: &Value,
    ) -> Result<PathBuf, ArchiveError>;

    /// Deletes pages older than the retention horizon; returns the count.
    async fn sweep(&self) -> Result<usize, ArchiveError>;
}
