use crate::{
    entity::EntityKind,
    sync::{SyncMode, SyncStage},
    window::TimeWindow,
};
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Terminal state of one entity type's sync run.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum EntityOutcome {
    Done,
    Failed {
        stage: SyncStage,
        window: Option<TimeWindow>,
        error: String,
    },
    Interrupted,
}

impl EntityOutcome {
    pub fn is_done(&self) -> bool {
        matches!(self, EntityOutcome::Done)
    }
}

/// Per-entity summary assembled by the orchestrator.
#[derive(Debug, Clone, Serialize)]
pub struct EntityReport {
    pub entity: EntityKind,
    pub outcome: EntityOutcome,
    pub windows_completed: u64,
    pub pages_fetched: u64,
    pub inserted: u64,
    pub updated: u64,
    pub unchanged: u64,
    pub skipped: u64,
    /// Checkpoint after the run, if one was ever persisted.
    pub checkpoint: Option<DateTime<Utc>>,
    pub duration_ms: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunOutcome {
    Success,
    PartialFailure,
    Interrupted,
}

impl RunOutcome {
    /// A run succeeds only when every entity reached `Done`; a shutdown
    /// request wins over failures in the overall verdict.
    pub fn from_entities(entities: &[EntityReport]) -> Self {
        if entities
            .iter()
            .any(|e| matches!(e.outcome, EntityOutcome::Interrupted))
        {
            RunOutcome::Interrupted
        } else if entities.iter().all(|e| e.outcome.is_done()) {
            RunOutcome::Success
        } else {
            RunOutcome::PartialFailure
        }
    }
}

/// Whole-process summary of one sync invocation.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub run_id: String,
    pub mode: SyncMode,
    pub outcome: RunOutcome,
    pub entities: Vec<EntityReport>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report(entity: EntityKind, outcome: EntityOutcome) -> EntityReport {
        EntityReport {
            entity,
            outcome,
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

    #[test]
    fn run_outcome_aggregation() {
        let done = report(EntityKind::Cve, EntityOutcome::Done);
        let failed = report(
            EntityKind::Cpe,
            EntityOutcome::Failed {
                stage: SyncStage::Fetching,
                window: None,
                error: "boom".into(),
            },
        );
        let interrupted = report(EntityKind::Cpe, EntityOutcome::Interrupted);

        assert_eq!(
            RunOutcome::from_entities(&[done.clone(), done.clone()]),
            RunOutcome::Success
        );
        assert_eq!(
            RunOutcome::from_entities(&[done.clone(), failed.clone()]),
            RunOutcome::PartialFailure
        );
        assert_eq!(
            RunOutcome::from_entities(&[failed, interrupted]),
            RunOutcome::Interrupted
        );
        assert_eq!(
            RunOutcome::from_entities(&[done, report(EntityKind::Cpe, EntityOutcome::Interrupted)]),
            RunOutcome::Interrupted
        );
    }
}
