use std::time::Duration;

use async_trait::async_trait;
use bookmatch_core::collaborators::CatalogSearch;
use bookmatch_core::config::CatalogConfig;
use bookmatch_core::domain::book::CatalogRecord;
use bookmatch_core::errors::BookMatchError;
use reqwest::{Client, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use tracing::{debug, warn};

use crate::dto::NaverBooksResponse;

pub const MAX_DISPLAY: usize = 100;

/// Book search over the Naver search API.
pub struct NaverCatalogClient {
    http: Client,
    base_url: String,
    client_id: String,
    client_secret: SecretString,
}

impl NaverCatalogClient {
    pub fn new(
        base_url: impl Into<String>,
        client_id: impl Into<String>,
        client_secret: SecretString,
        timeout: Duration,
    ) -> Result<Self, BookMatchError> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|error| BookMatchError::Upstream(error.to_string()))?;

        Ok(Self { http, base_url: base_url.into(), client_id: client_id.into(), client_secret })
    }

    pub fn from_config(config: &CatalogConfig) -> Result<Self, BookMatchError> {
        Self::new(
            config.base_url.clone(),
            config.client_id.clone(),
            config.client_secret.clone(),
            Duration::from_secs(config.timeout_secs.max(1)),
        )
    }
}

#[async_trait]
impl CatalogSearch for NaverCatalogClient {
    async fn search(&self, query: &str, limit: usize) -> Result<Vec<CatalogRecord>, BookMatchError> {
        let query = query.trim();
        if query.is_empty() {
            return Ok(Vec::new());
        }
        let display = display_count(limit);

        let response = self
            .http
            .get(&self.base_url)
            .header("X-Naver-Client-Id", &self.client_id)
            .header("X-Naver-Client-Secret", self.client_secret.expose_secret())
            .query(&[("query", query.to_owned()), ("display", display), ("start", "1".to_owned())])
            .send()
            .await
            .map_err(|error| {
                warn!(event_name = "catalog.search.failed", query, error = %error, "transport error");
                BookMatchError::Upstream(error.to_string())
            })?;

        let status = response.status();
        if !status.is_success() {
            warn!(
                event_name = "catalog.search.rejected",
                query,
                status = status.as_u16(),
                "non-success status"
            );
            return Err(classify_status(status));
        }

        let body = response.text().await.map_err(|error| BookMatchError::Upstream(error.to_string()))?;
        let records = parse_search_response(&body)?;
        debug!(event_name = "catalog.search.completed", query, results = records.len());
        Ok(records)
    }
}

fn display_count(limit: usize) -> String {
    limit.clamp(1, MAX_DISPLAY).to_string()
}

fn classify_status(status: StatusCode) -> BookMatchError {
    if status == StatusCode::TOO_MANY_REQUESTS {
        BookMatchError::RateLimited
    } else {
        BookMatchError::Upstream(format!("catalog returned status {}", status.as_u16()))
    }
}

pub fn parse_search_response(body: &str) -> Result<Vec<CatalogRecord>, BookMatchError> {
    let response: NaverBooksResponse = serde_json::from_str(body)
        .map_err(|error| BookMatchError::MalformedResponse(error.to_string()))?;
    Ok(response.items.into_iter().map(|item| item.into_record()).collect())
}
