use chrono::{DateTime, NaiveDateTime, Utc};
use mirror_core::error::SourceError;
use model::{
    entity::EntityKind,
    page::{CatalogPage, RecordDraft},
};
use serde_json::Value;
use tracing::warn;

/// Decodes a 200-response envelope into a [`CatalogPage`].
///
/// A missing or non-numeric `totalResults` makes the whole page malformed;
/// individual items the extractor cannot derive an id or timestamp from are
/// skipped with a warning and counted, matching how partial records flow
/// through the rest of the pipeline.
pub(super) fn page_from_envelope(
    entity: EntityKind,
    start_index: u64,
    raw: Value,
) -> Result<CatalogPage, SourceError> {
    let profile = entity.profile();
    let total_results = raw
        .get("totalResults")
        .and_then(Value::as_u64)
        .ok_or_else(|| SourceError::Malformed("envelope is missing totalResults".into()))?;

    let items: &[Value] = raw
        .get(profile.items_key)
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default();

    let mut records = Vec::with_capacity(items.len());
    let mut skipped = 0usize;
    for item in items {
        match extract_record(entity, item) {
            Some(draft) => records.push(draft),
            None => {
                warn!(
                    entity = %entity,
                    start_index,
                    "item without a usable id/timestamp, skipping"
                );
                skipped += 1;
            }
        }
    }

    let returned = items.len();
    Ok(CatalogPage {
        entity,
        start_index,
        total_results,
        returned,
        records,
        skipped,
        raw,
    })
}

fn extract_record(entity: EntityKind, item: &Value) -> Option<RecordDraft> {
    let profile = entity.profile();
    let (id, body) = match entity {
        EntityKind::Cve => {
            let body = match profile.envelope_key {
                Some(key) => item.get(key).unwrap_or(item),
                None => item,
            };
            let id = body.get(profile.id_field)?.as_str()?.to_string();
            (id, body)
        }
        EntityKind::Cpe => find_cpe_identifier(item)?,
    };

    let last_modified = body
        .get(profile.modified_field)
        .and_then(Value::as_str)
        .and_then(parse_modified)?;

    Some(RecordDraft {
        id,
        payload: body.clone(),
        last_modified,
    })
}

/// Recursively searches for the CPE identifier. Current responses carry
/// `cpeName`; older shapes used `cpe23Uri`. Returns the identifier and the
/// object containing it, which is what gets stored as the payload.
fn find_cpe_identifier(value: &Value) -> Option<(String, &Value)> {
    match value {
        Value::Object(map) => {
            if let Some(name) = map.get("cpeName").and_then(Value::as_str) {
                return Some((name.to_string(), value));
            }
            if let Some(uri) = map.get("cpe23Uri").and_then(Value::as_str) {
                return Some((uri.to_string(), value));
            }
            map.values().find_map(find_cpe_identifier)
        }
        Value::Array(items) => items.iter().find_map(find_cpe_identifier),
        _ => None,
    }
}

/// `lastModified` arrives with or without a zone offset depending on the
/// endpoint; both parse to UTC.
fn parse_modified(s: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .ok()
        .or_else(|| {
            NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f")
                .ok()
                .map(|naive| naive.and_utc())
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    #[test]
    fn decodes_cve_envelope() {
        let raw = json!({
            "totalResults": 2,
            "vulnerabilities": [
                { "cve": { "id": "CVE-2025-0001", "lastModified": "2025-04-21T18:34:02.350" } },
                { "cve": { "id": "CVE-2025-0002", "lastModified": "2025-04-22T09:00:00.000" } }
            ]
        });

        let page = page_from_envelope(EntityKind::Cve, 0, raw).unwrap();
        assert_eq!(page.total_results, 2);
        assert_eq!(page.returned, 2);
        assert_eq!(page.skipped, 0);
        assert_eq!(page.records[0].id, "CVE-2025-0001");
        assert_eq!(
            page.records[1].last_modified,
            Utc.with_ymd_and_hms(2025, 4, 22, 9, 0, 0).unwrap()
        );
        // Payload is the record body, not the outer wrapper.
        assert!(page.records[0].payload.get("cve").is_none());
        assert_eq!(
            page.records[0].payload.get("id").and_then(Value::as_str),
            Some("CVE-2025-0001")
        );
    }

    #[test]
    fn finds_nested_cpe_identifier() {
        let item = json!({
            "products": { "cpe": {
                "cpeName": "cpe:2.3:a:vendor:product:1.0:*:*:*:*:*:*:*",
                "lastModified": "2025-02-11T08:15:00.000"
            }}
        });

        let (id, body) = find_cpe_identifier(&item).unwrap();
        assert!(id.starts_with("cpe:2.3:a:vendor"));
        assert!(body.get("lastModified").is_some());
    }

    #[test]
    fn falls_back_to_cpe23uri() {
        let item = json!({ "cpe": { "cpe23Uri": "cpe:2.3:o:vendor:os:-:*:*:*:*:*:*:*" } });
        let (id, _) = find_cpe_identifier(&item).unwrap();
        assert!(id.starts_with("cpe:2.3:o:"));
    }

    #[test]
    fn unusable_items_are_skipped_and_counted() {
        let raw = json!({
            "totalResults": 3,
            "vulnerabilities": [
                { "cve": { "id": "CVE-2025-0001", "lastModified": "2025-04-21T18:34:02.350" } },
                { "cve": { "id": "CVE-2025-0002" } },
                { "cve": { "lastModified": "2025-04-21T18:34:02.350" } }
            ]
        });

        let page = page_from_envelope(EntityKind::Cve, 0, raw).unwrap();
        assert_eq!(page.returned, 3);
        assert_eq!(page.records.len(), 1);
        assert_eq!(page.skipped, 2);
    }

    #[test]
    fn missing_total_is_malformed() {
        let raw = json!({ "vulnerabilities": [] });
        let err = page_from_envelope(EntityKind::Cve, 0, raw).unwrap_err();
        assert!(matches!(err, SourceError::Malformed(_)));
    }

    #[test]
    fn offset_timestamps_parse_too() {
        assert_eq!(
            parse_modified("2025-04-21T18:34:02.350+00:00").unwrap(),
            parse_modified("2025-04-21T18:34:02.350").unwrap()
        );
        assert!(parse_modified("not a date").is_none());
    }
}
