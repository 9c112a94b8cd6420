use async_trait::async_trait;
use chrono::{DateTime, Utc};
use mirror_core::{error::SourceError, source::CatalogSource};
use model::{entity::EntityKind, page::CatalogPage, window::TimeWindow};
use std::time::Duration;
use tracing::debug;

mod extract;

pub const DEFAULT_BASE_URL: &str = "https://services.nvd.nist.gov";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const STATUS_BODY_LIMIT: usize = 512;

/// HTTP client for the NVD 2.0 REST API. One instance serves both catalogs;
/// the credential, when present, is attached to every request as the
/// `apiKey` header.
pub struct NvdClient {
    http: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

impl NvdClient {
    pub fn new(base_url: impl Into<String>, api_key: Option<String>) -> Result<Self, SourceError> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| SourceError::Transport(e.to_string()))?;
        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key,
        })
    }
}

/// RFC3339 UTC with `Z` suffix at second precision, the format the API's
/// `lastModStartDate`/`lastModEndDate` parameters expect.
fn format_param(ts: DateTime<Utc>) -> String {
    ts.format("%Y-%m-%dT%H:%M:%SZ").to_string()
}

#[async_trait]
impl CatalogSource for NvdClient {
    async fn fetch_page(
        &self,
        entity: EntityKind,
        window: &TimeWindow,
        start_index: u64,
        results_per_page: usize,
    ) -> Result<CatalogPage, SourceError> {
        let profile = entity.profile();
        let url = format!("{}{}", self.base_url, profile.endpoint_path);
        let query = [
            ("startIndex", start_index.to_string()),
            ("resultsPerPage", results_per_page.to_string()),
            ("lastModStartDate", format_param(window.start)),
            ("lastModEndDate", format_param(window.end)),
        ];

        debug!(entity = %entity, start_index, window = %window, "requesting catalog page");

        let mut request = self.http.get(&url).query(&query);
        if let Some(key) = &self.api_key {
            request = request.header("apiKey", key);
        }

        let response = request
            .send()
            .await
            .map_err(|e| SourceError::Transport(e.to_string()))?;

        let status = response.status().as_u16();
        match status {
            200 => {
                let raw: serde_json::Value = response
                    .json()
                    .await
                    .map_err(|e| SourceError::Malformed(e.to_string()))?;
                extract::page_from_envelope(entity, start_index, raw)
            }
            // The API answers 404 for a window with no matching records.
            404 => Ok(CatalogPage::empty(entity, start_index)),
            401 | 403 => Err(SourceError::Auth(format!(
                "the API rejected the credential (HTTP {status})"
            ))),
            429 => Err(SourceError::Throttled),
            _ => {
                let body = response.text().await.unwrap_or_default();
                let body = body.chars().take(STATUS_BODY_LIMIT).collect();
                Err(SourceError::Status { status, body })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Timelike};

    #[test]
    fn timestamp_params_are_second_precision_zulu() {
        let ts = Utc
            .with_ymd_and_hms(2025, 10, 29, 12, 0, 0)
            .unwrap()
            .with_nanosecond(123_456_789)
            .unwrap();
        assert_eq!(format_param(ts), "2025-10-29T12:00:00Z");
    }

    #[test]
    fn base_url_trailing_slash_is_stripped() {
        let client = NvdClient::new("https://example.test/", None).unwrap();
        assert_eq!(client.base_url, "https://example.test");
    }
}
