//! Grid Status API client.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDate;
use reqwest::StatusCode;
use tracing::{debug, info, warn};

use crate::model::LmpResponse;

use super::cache::{query_cache_key, ResponseCache};
use super::DataError;

const DEFAULT_BASE_URL: &str = "https://api.gridstatus.io";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Error answered by the Grid Status API, with a stable code the facade can
/// forward.
#[derive(Debug, Clone)]
pub struct GridStatusError {
    /// Upstream HTTP status; 0 when the request was never sent.
    pub status_code: u16,
    pub code: &'static str,
    pub message: String,
    /// Rate-limit hint from the `Retry-After` header.
    pub retry_after: Option<String>,
}

impl fmt::Display for GridStatusError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for GridStatusError {}

/// Parameters for one location query.
#[derive(Debug, Clone)]
pub struct QueryLocationParams {
    /// e.g. `"caiso_lmp_real_time_5_min"`.
    pub dataset_id: String,
    /// e.g. `"MOSSLD_2_PSP1"`.
    pub location_id: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    /// `"market"` unless the caller needs another zone.
    pub timezone: String,
}

/// Client for the Grid Status LMP datasets.
///
/// The cache is optional and explicit; without one every call goes
/// upstream.
#[derive(Clone)]
pub struct GridStatusClient {
    api_key: String,
    base_url: String,
    http: reqwest::Client,
    cache: Option<Arc<ResponseCache>>,
}

impl GridStatusClient {
    /// Creates a client.
    ///
    /// # Arguments
    ///
    /// * `api_key` - Grid Status API key, sent as `x-api-key`
    /// * `base_url` - Override for tests; `None` uses the public API
    /// * `cache` - Optional response cache collaborator
    pub fn new(
        api_key: impl Into<String>,
        base_url: Option<String>,
        cache: Option<Arc<ResponseCache>>,
    ) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: base_url.unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            http: reqwest::Client::builder()
                .timeout(REQUEST_TIMEOUT)
                .build()
                .unwrap_or_else(|_| reqwest::Client::new()),
            cache,
        }
    }

    /// Fetches LMP intervals for one location.
    ///
    /// # Errors
    ///
    /// Returns `DataError::Api` with a stable code for key problems
    /// (`MISSING_API_KEY`, `INVALID_API_KEY_FORMAT`), upstream rejections
    /// (`UNAUTHORIZED`, `INVALID_API_KEY`, `RATE_LIMIT_EXCEEDED`,
    /// `API_ERROR`), and `DataError::Http` for transport failures.
    pub async fn query_location(
        &self,
        params: &QueryLocationParams,
    ) -> Result<LmpResponse, DataError> {
        self.validate_api_key()?;

        let start = params.start_date.format("%Y-%m-%d").to_string();
        let end = params.end_date.format("%Y-%m-%d").to_string();
        let cache_key = query_cache_key(
            &params.dataset_id,
            &params.location_id,
            &start,
            &end,
            &params.timezone,
        );

        if let Some(cache) = &self.cache {
            if let Some(cached) = cache.get(&cache_key) {
                info!(
                    dataset = %params.dataset_id,
                    location = %params.location_id,
                    intervals = cached.data.len(),
                    "cache hit, skipping upstream request"
                );
                return Ok(cached);
            }
        }

        let url = format!(
            "{}/v1/datasets/{}/query/location/{}",
            self.base_url, params.dataset_id, params.location_id
        );
        debug!(
            %url,
            start = %start,
            end = %end,
            timezone = %params.timezone,
            "querying Grid Status"
        );

        let started = std::time::Instant::now();
        let response = self
            .http
            .get(&url)
            .query(&[
                ("start_time", start.as_str()),
                ("end_time", end.as_str()),
                ("timezone", params.timezone.as_str()),
                ("download", "true"),
            ])
            .header("x-api-key", &self.api_key)
            .header("Accept", "application/json")
            .send()
            .await?;

        let status = response.status();
        info!(
            status = status.as_u16(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            dataset = %params.dataset_id,
            location = %params.location_id,
            "Grid Status responded"
        );

        match status {
            StatusCode::OK => {}
            StatusCode::FORBIDDEN => {
                warn!(dataset = %params.dataset_id, "upstream rejected the API key");
                return Err(DataError::Api(GridStatusError {
                    status_code: status.as_u16(),
                    code: "INVALID_API_KEY",
                    message: "Invalid API key or insufficient permissions".to_string(),
                    retry_after: None,
                }));
            }
            StatusCode::TOO_MANY_REQUESTS => {
                let retry_after = response
                    .headers()
                    .get(reqwest::header::RETRY_AFTER)
                    .and_then(|v| v.to_str().ok())
                    .map(str::to_string);
                warn!(retry_after = retry_after.as_deref(), "upstream rate limit hit");
                return Err(DataError::Api(GridStatusError {
                    status_code: status.as_u16(),
                    code: "RATE_LIMIT_EXCEEDED",
                    message: format!(
                        "Rate limit exceeded. Retry after: {}",
                        retry_after.as_deref().unwrap_or("unknown")
                    ),
                    retry_after,
                }));
            }
            StatusCode::UNAUTHORIZED => {
                return Err(DataError::Api(GridStatusError {
                    status_code: status.as_u16(),
                    code: "UNAUTHORIZED",
                    message: "Unauthorized: Invalid API key".to_string(),
                    retry_after: None,
                }));
            }
            other => {
                return Err(DataError::Api(GridStatusError {
                    status_code: other.as_u16(),
                    code: "API_ERROR",
                    message: format!("API returned status {other}"),
                    retry_after: None,
                }));
            }
        }

        let result: LmpResponse = response.json().await?;
        debug!(intervals = result.data.len(), "decoded upstream response");

        if let Some(cache) = &self.cache {
            cache.set(&cache_key, result.clone());
        }

        Ok(result)
    }

    /// Convenience wrapper that parses `"YYYY-MM-DD"` date strings and
    /// queries in market time.
    ///
    /// # Errors
    ///
    /// `DataError::InvalidDate` for malformed dates, plus everything
    /// [`Self::query_location`] can return.
    pub async fn query_location_by_date(
        &self,
        dataset_id: &str,
        location_id: &str,
        start_date: &str,
        end_date: &str,
    ) -> Result<LmpResponse, DataError> {
        let start = parse_date("start_date", start_date)?;
        let end = parse_date("end_date", end_date)?;
        self.query_location(&QueryLocationParams {
            dataset_id: dataset_id.to_string(),
            location_id: location_id.to_string(),
            start_date: start,
            end_date: end,
            timezone: "market".to_string(),
        })
        .await
    }

    /// Rejects keys that cannot possibly be valid before spending a request.
    fn validate_api_key(&self) -> Result<(), DataError> {
        if self.api_key.trim().is_empty() {
            return Err(DataError::Api(GridStatusError {
                status_code: 0,
                code: "MISSING_API_KEY",
                message: "API key is required".to_string(),
                retry_after: None,
            }));
        }
        if self.api_key.len() < 10 {
            return Err(DataError::Api(GridStatusError {
                status_code: 0,
                code: "INVALID_API_KEY_FORMAT",
                message: "API key appears to be invalid (too short)".to_string(),
                retry_after: None,
            }));
        }
        Ok(())
    }
}

fn parse_date(field: &'static str, value: &str) -> Result<NaiveDate, DataError> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d").map_err(|_| DataError::InvalidDate {
        field,
        value: value.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn empty_api_key_is_rejected_before_any_request() {
        let client = GridStatusClient::new("", None, None);
        let err = client
            .query_location_by_date("ds", "loc", "2024-01-01", "2024-01-02")
            .await;
        match err {
            Err(DataError::Api(e)) => assert_eq!(e.code, "MISSING_API_KEY"),
            other => panic!("expected MISSING_API_KEY, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn short_api_key_is_rejected() {
        let client = GridStatusClient::new("tiny", None, None);
        let err = client
            .query_location_by_date("ds", "loc", "2024-01-01", "2024-01-02")
            .await;
        match err {
            Err(DataError::Api(e)) => assert_eq!(e.code, "INVALID_API_KEY_FORMAT"),
            other => panic!("expected INVALID_API_KEY_FORMAT, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn malformed_date_is_rejected() {
        let client = GridStatusClient::new("key-that-is-long-enough", None, None);
        let err = client
            .query_location_by_date("ds", "loc", "01/02/2024", "2024-01-02")
            .await;
        assert!(matches!(
            err,
            Err(DataError::InvalidDate { field: "start_date", .. })
        ));
    }
}
