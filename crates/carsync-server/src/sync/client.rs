//! External catalog source client
//!
//! Fetches the remote vehicle snapshot over HTTP. The client enforces a
//! bounded per-call timeout and surfaces typed transport errors; it never
//! retries internally. Retry policy belongs to the reconciler's batch loop,
//! and a failed fetch fails the whole cycle before any writes happen.

use reqwest::{
    header::{HeaderMap, HeaderValue},
    Client, StatusCode,
};
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, info};

use super::config::{SourceConfig, YearRange};
use super::normalize;

/// Errors surfaced by the source client
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("invalid source configuration: {0}")]
    Config(String),

    #[error("source request timed out")]
    Timeout,

    #[error("network error talking to source: {0}")]
    Network(#[source] reqwest::Error),

    #[error("source returned status {0}")]
    BadStatus(StatusCode),

    #[error("malformed source payload: {0}")]
    Payload(String),
}

/// Raw record as delivered by the source, prior to normalization.
///
/// Every field except the envelope itself is optional: the source has no
/// schema enforcement and individual records routinely miss fields. The
/// normalizer decides what is salvageable.
#[derive(Debug, Clone, Deserialize)]
pub struct RawVehicle {
    #[serde(rename = "objectId", default)]
    pub object_id: Option<String>,
    #[serde(rename = "Make", default)]
    pub make: Option<String>,
    #[serde(rename = "Model", default)]
    pub model: Option<String>,
    #[serde(rename = "Year", default)]
    pub year: Option<serde_json::Value>,
    #[serde(rename = "Category", default)]
    pub category: Option<String>,
    #[serde(rename = "createdAt", default)]
    pub created_at: Option<String>,
    #[serde(rename = "updatedAt", default)]
    pub updated_at: Option<String>,
}

/// JSON envelope wrapping the snapshot
#[derive(Debug, Deserialize)]
struct CatalogEnvelope {
    #[serde(default)]
    results: Vec<RawVehicle>,
}

/// HTTP client for the external vehicle catalog
pub struct CatalogClient {
    http: Client,
    config: SourceConfig,
}

impl CatalogClient {
    /// Create a new client from an explicit source configuration
    pub fn new(config: SourceConfig) -> Result<Self, FetchError> {
        config
            .validate()
            .map_err(|e| FetchError::Config(e.to_string()))?;

        let mut headers = HeaderMap::new();
        headers.insert(
            "X-Parse-Application-Id",
            HeaderValue::from_str(&config.app_id)
                .map_err(|_| FetchError::Config("application id is not a valid header value".to_string()))?,
        );
        let mut master_key = HeaderValue::from_str(&config.master_key)
            .map_err(|_| FetchError::Config("master key is not a valid header value".to_string()))?;
        master_key.set_sensitive(true);
        headers.insert("X-Parse-Master-Key", master_key);
        headers.insert("Content-Type", HeaderValue::from_static("application/json"));

        let http = Client::builder()
            .timeout(config.timeout())
            .default_headers(headers)
            .user_agent("carsync-catalog-client/1.0")
            .build()
            .map_err(|e| FetchError::Config(e.to_string()))?;

        Ok(Self { http, config })
    }

    /// Fetch the full external snapshot, filtered to the given year range.
    ///
    /// The range is pushed down to the source as a `where` predicate and
    /// re-applied client-side, so callers see the filtered sequence whether
    /// or not the source honored the predicate. Records whose year cannot be
    /// parsed pass through; the normalizer counts them as skipped.
    pub async fn fetch_snapshot(&self, filter: &YearRange) -> Result<Vec<RawVehicle>, FetchError> {
        let predicate = serde_json::json!({
            "Year": { "$gte": filter.min, "$lte": filter.max }
        })
        .to_string();
        let limit = self.config.fetch_limit.to_string();

        debug!(url = %self.config.base_url, %predicate, "fetching catalog snapshot");

        let response = self
            .http
            .get(&self.config.base_url)
            .query(&[("limit", limit.as_str()), ("where", predicate.as_str())])
            .send()
            .await
            .map_err(classify)?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::BadStatus(status));
        }

        let body = response.bytes().await.map_err(classify)?;
        let envelope: CatalogEnvelope = serde_json::from_slice(&body)
            .map_err(|e| FetchError::Payload(e.to_string()))?;

        let fetched = envelope.results.len();
        let records: Vec<RawVehicle> = envelope
            .results
            .into_iter()
            .filter(|raw| match normalize::year_of(raw) {
                Some(year) => filter.contains(year),
                None => true,
            })
            .collect();

        if records.len() < fetched {
            debug!(
                dropped = fetched - records.len(),
                "client-side year filter dropped records the source did not exclude"
            );
        }

        info!(records = records.len(), "fetched catalog snapshot");
        Ok(records)
    }

    /// Get the source configuration
    pub fn config(&self) -> &SourceConfig {
        &self.config
    }
}

fn classify(error: reqwest::Error) -> FetchError {
    if error.is_timeout() {
        FetchError::Timeout
    } else {
        FetchError::Network(error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_config(base_url: String) -> SourceConfig {
        SourceConfig {
            base_url,
            app_id: "test-app".to_string(),
            master_key: "test-key".to_string(),
            timeout_secs: 1,
            fetch_limit: 10_000,
        }
    }

    fn snapshot_body() -> serde_json::Value {
        json!({
            "results": [
                {
                    "objectId": "abc123",
                    "Make": "Toyota",
                    "Model": "Corolla",
                    "Year": 2015,
                    "Category": "Sedan",
                    "createdAt": "2020-01-06T12:25:35.741Z",
                    "updatedAt": "2020-01-06T12:25:35.741Z"
                },
                {
                    "objectId": "def456",
                    "Make": "Honda",
                    "Model": "Civic",
                    "Year": 2005,
                    "Category": "Sedan"
                }
            ]
        })
    }

    #[test]
    fn test_client_rejects_missing_credentials() {
        let config = SourceConfig::default();
        assert!(matches!(
            CatalogClient::new(config),
            Err(FetchError::Config(_))
        ));
    }

    #[tokio::test]
    async fn test_fetch_snapshot_sends_credentials_and_filter() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/classes/Car_Model_List"))
            .and(header("X-Parse-Application-Id", "test-app"))
            .and(header("X-Parse-Master-Key", "test-key"))
            .and(query_param("limit", "10000"))
            .respond_with(ResponseTemplate::new(200).set_body_json(snapshot_body()))
            .mount(&server)
            .await;

        let config = test_config(format!("{}/classes/Car_Model_List", server.uri()));
        let client = CatalogClient::new(config).unwrap();

        let records = client
            .fetch_snapshot(&YearRange::default())
            .await
            .unwrap();

        // the 2005 Civic is dropped by the client-side post-filter
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].object_id.as_deref(), Some("abc123"));
        assert_eq!(records[0].make.as_deref(), Some("Toyota"));
    }

    #[tokio::test]
    async fn test_fetch_snapshot_bad_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let config = test_config(server.uri());
        let client = CatalogClient::new(config).unwrap();

        let result = client.fetch_snapshot(&YearRange::default()).await;
        assert!(matches!(
            result,
            Err(FetchError::BadStatus(StatusCode::SERVICE_UNAVAILABLE))
        ));
    }

    #[tokio::test]
    async fn test_fetch_snapshot_malformed_payload() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .mount(&server)
            .await;

        let config = test_config(server.uri());
        let client = CatalogClient::new(config).unwrap();

        let result = client.fetch_snapshot(&YearRange::default()).await;
        assert!(matches!(result, Err(FetchError::Payload(_))));
    }

    #[tokio::test]
    async fn test_fetch_snapshot_timeout() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"results": []}))
                    .set_delay(std::time::Duration::from_millis(1500)),
            )
            .mount(&server)
            .await;

        let config = test_config(server.uri());
        let client = CatalogClient::new(config).unwrap();

        let result = client.fetch_snapshot(&YearRange::default()).await;
        assert!(matches!(result, Err(FetchError::Timeout)));
    }

    #[tokio::test]
    async fn test_fetch_snapshot_empty_envelope() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
            .mount(&server)
            .await;

        let config = test_config(server.uri());
        let client = CatalogClient::new(config).unwrap();

        let records = client.fetch_snapshot(&YearRange::default()).await.unwrap();
        assert!(records.is_empty());
    }
}
