use crate::entity::EntityKind;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;

/// How the orchestrator scans a catalog. Chosen by the caller, not by a
/// process-wide flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncMode {
    /// Scan from the Unix epoch.
    Full,
    /// Scan from the last durable checkpoint; degrades to full when absent.
    Incremental,
}

impl fmt::Display for SyncMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SyncMode::Full => f.write_str("full"),
            SyncMode::Incremental => f.write_str("incremental"),
        }
    }
}

/// Stages of the per-entity sync state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SyncStage {
    Planning,
    Fetching,
    Archiving,
    Applying,
    Checkpointing,
    Done,
    Failed,
}

impl SyncStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            SyncStage::Planning => "Planning",
            SyncStage::Fetching => "Fetching",
            SyncStage::Archiving => "Archiving",
            SyncStage::Applying => "Applying",
            SyncStage::Checkpointing => "Checkpointing",
            SyncStage::Done => "Done",
            SyncStage::Failed => "Failed",
        }
    }
}

impl fmt::Display for SyncStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Durable high-water mark of modification time mirrored for one entity
/// type. One row per entity in the store; the resumability anchor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SyncCheckpoint {
    pub entity: EntityKind,
    pub last_synced_through: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
