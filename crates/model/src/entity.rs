use chrono::Duration;
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};
use thiserror::Error;

/// The two catalogs mirrored from the NVD 2.0 API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    Cve,
    Cpe,
}

/// Static descriptor of one mirrored catalog. Immutable for the process
/// lifetime; every component reads endpoint, field and table names from here.
#[derive(Debug)]
pub struct EntityProfile {
    /// Path under the API base URL.
    pub endpoint_path: &'static str,
    /// Key of the record array in the response envelope.
    pub items_key: &'static str,
    /// Key wrapping the record body inside each array item, if any.
    pub envelope_key: Option<&'static str>,
    /// Field holding the stable natural key.
    pub id_field: &'static str,
    /// Field holding the source modification timestamp.
    pub modified_field: &'static str,
    pub table: &'static str,
    pub id_column: &'static str,
    pub archive_prefix: &'static str,
    /// Largest `resultsPerPage` the API accepts for this catalog.
    pub page_cap: usize,
    /// Widest `lastModStartDate..lastModEndDate` span a single query may cover.
    pub max_window_span_days: i64,
}

static CVE_PROFILE: EntityProfile = EntityProfile {
    endpoint_path: "/rest/json/cves/2.0",
    items_key: "vulnerabilities",
    envelope_key: Some("cve"),
    id_field: "id",
    modified_field: "lastModified",
    table: "cve_records",
    id_column: "cve_id",
    archive_prefix: "cve_data",
    page_cap: 2000,
    max_window_span_days: 120,
};

static CPE_PROFILE: EntityProfile = EntityProfile {
    endpoint_path: "/rest/json/cpes/2.0",
    items_key: "products",
    envelope_key: None,
    // The identifier key varies by response shape; `cpe23Uri` is the fallback.
    id_field: "cpeName",
    modified_field: "lastModified",
    table: "cpe_records",
    id_column: "cpe_id",
    archive_prefix: "cpe_data",
    page_cap: 10000,
    max_window_span_days: 120,
};

impl EntityKind {
    pub const ALL: [EntityKind; 2] = [EntityKind::Cve, EntityKind::Cpe];

    pub fn profile(&self) -> &'static EntityProfile {
        match self {
            EntityKind::Cve => &CVE_PROFILE,
            EntityKind::Cpe => &CPE_PROFILE,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::Cve => "cve",
            EntityKind::Cpe => "cpe",
        }
    }

    pub fn max_window_span(&self) -> Duration {
        Duration::days(self.profile().max_window_span_days)
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
#[error("unknown entity type: {0}")]
pub struct UnknownEntity(String);

impl FromStr for EntityKind {
    type Err = UnknownEntity;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "cve" | "cves" => Ok(EntityKind::Cve),
            "cpe" | "cpes" => Ok(EntityKind::Cpe),
            other => Err(UnknownEntity(other.to_string())),
        }
    }
}
