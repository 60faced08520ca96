//! Labeled test case sources
//!
//! The published test sheet is a CSV with at least `id`, `dataset` and
//! `query` columns; `expected_ids` holds pipe-delimited external ids.

use async_trait::async_trait;
use reqwest::{header, Client};
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, info};

use crate::models::{ExpectedEntity, TestCase};
use crate::{Error, Result};

/// Outcome of one fetch, consumed by the evaluator
pub type TestFetchResult = Result<Vec<TestCase>>;

/// Provider of labeled test cases for a dataset
#[async_trait]
pub trait TestSource: Send + Sync {
    async fn fetch(&self, dataset: &str) -> TestFetchResult;
}

/// In-memory test cases, shared by every dataset name
#[derive(Debug, Clone, Default)]
pub struct StaticTestSource {
    cases: Vec<TestCase>,
}

impl StaticTestSource {
    pub fn new(cases: Vec<TestCase>) -> Self {
        Self { cases }
    }
}

#[async_trait]
impl TestSource for StaticTestSource {
    async fn fetch(&self, _dataset: &str) -> TestFetchResult {
        Ok(self.cases.clone())
    }
}

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Downloads the published test sheet on every fetch (no caching, no retry)
pub struct HttpTestSource {
    http_client: Client,
    url: String,
}

impl HttpTestSource {
    pub fn new(url: impl Into<String>, api_key: Option<&str>) -> Result<Self> {
        let user_agent = match api_key {
            Some(key) if !key.trim().is_empty() => format!(
                "orgID API/{} (mailto:info@ourresearch.org) openalex-api-key:{}",
                env!("CARGO_PKG_VERSION"),
                key
            ),
            _ => format!(
                "orgID API/{} (mailto:info@ourresearch.org)",
                env!("CARGO_PKG_VERSION")
            ),
        };
        let mut headers = header::HeaderMap::new();
        headers.insert(
            header::USER_AGENT,
            header::HeaderValue::from_str(&user_agent)
                .map_err(|e| Error::Config(format!("Invalid user agent: {}", e)))?,
        );

        let http_client = Client::builder()
            .timeout(DEFAULT_TIMEOUT)
            .default_headers(headers)
            .build()?;

        Ok(Self {
            http_client,
            url: url.into(),
        })
    }
}

#[async_trait]
impl TestSource for HttpTestSource {
    async fn fetch(&self, dataset: &str) -> TestFetchResult {
        debug!(url = %self.url, dataset = %dataset, "Fetching test sheet");
        let body = self
            .http_client
            .get(&self.url)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;
        let cases = parse_test_sheet(&body, dataset)?;
        info!("Fetched {} tests for dataset '{}'", cases.len(), dataset);
        Ok(cases)
    }
}

#[derive(Debug, Deserialize)]
struct SheetRow {
    #[serde(default)]
    id: String,
    #[serde(default)]
    dataset: String,
    #[serde(default)]
    query: String,
    #[serde(default)]
    expected_ids: Option<String>,
}

/// Parse a test sheet, keeping rows of `dataset`
pub fn parse_test_sheet(csv_text: &str, dataset: &str) -> Result<Vec<TestCase>> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(csv_text.as_bytes());

    let mut cases = Vec::new();
    for record in reader.deserialize::<SheetRow>() {
        let row = record?;
        if row.dataset != dataset {
            continue;
        }
        let expected_entities = row
            .expected_ids
            .as_deref()
            .unwrap_or_default()
            .split('|')
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .map(|id| ExpectedEntity {
                id: id.to_string(),
                ..Default::default()
            })
            .collect();
        cases.push(TestCase {
            id: row.id,
            query: row.query,
            expected_entities,
        });
    }
    Ok(cases)
}
