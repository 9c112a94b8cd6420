use mirror_core::error::{ArchiveError, SourceError, StoreError};
use thiserror::Error;

/// Errors that terminate one entity type's sync run. Retriable conditions
/// are absorbed inside the transport wrapper; whatever reaches this enum is
/// fatal for the current run of that entity.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("source error: {0}")]
    Source(#[from] SourceError),

    /// A retryable source error outlived the retry budget.
    #[error("retries exhausted: {0}")]
    RetriesExhausted(SourceError),

    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("archive error: {0}")]
    Archive(#[from] ArchiveError),

    #[error("shutdown requested")]
    Interrupted,
}
