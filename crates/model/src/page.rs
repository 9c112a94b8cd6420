use crate::entity::EntityKind;
use chrono::{DateTime, Utc};
use serde_json::Value;

/// One record extracted from a fetched page, ready for upsert.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordDraft {
    /// Stable natural key (CVE id or CPE name).
    pub id: String,
    /// Record body as returned by the API.
    pub payload: Value,
    /// Source modification timestamp, the upsert tie-break.
    pub last_modified: DateTime<Utc>,
}

/// One decoded page of a paginated catalog query. Holds both the raw
/// envelope (archived before apply) and the extracted records.
#[derive(Debug, Clone)]
pub struct CatalogPage {
    pub entity: EntityKind,
    /// Offset this page was requested at.
    pub start_index: u64,
    /// Total result count the API declared for the query.
    pub total_results: u64,
    /// Number of items in the envelope's record array, extracted or not.
    pub returned: usize,
    pub records: Vec<RecordDraft>,
    /// Items the extractor could not derive an id/timestamp from.
    pub skipped: usize,
    /// The response document exactly as received.
    pub raw: Value,
}

impl CatalogPage {
    /// An empty page, used for 404 responses and exhausted windows.
    pub fn empty(entity: EntityKind, start_index: u64) -> Self {
        let raw = serde_json::json!({
            entity.profile().items_key: [],
            "totalResults": 0,
        });
        Self {
            entity,
            start_index,
            total_results: 0,
            returned: 0,
            records: Vec::new(),
            skipped: 0,
            raw,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.returned == 0
    }

    /// Greatest source modification timestamp on this page, if any record
    /// was extracted. Lets the checkpoint tighten mid-window.
    pub fn max_last_modified(&self) -> Option<DateTime<Utc>> {
        self.records.iter().map(|r| r.last_modified).max()
    }
}
