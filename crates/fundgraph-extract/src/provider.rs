//! Layout oracle providers
//!
//! Concrete implementations of the document-understanding boundary: the Azure
//! Document Intelligence prebuilt-layout client, and a fixture provider that
//! replays a saved layout result for tests and offline runs.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;

use crate::layout::{LayoutCell, LayoutPage, LayoutResult, LayoutTable};
use crate::ExtractError;

/// Trait for document-layout oracles
#[async_trait]
pub trait LayoutProvider: Send + Sync {
    /// Analyze raw document bytes into a layout result.
    async fn analyze(&self, bytes: &[u8]) -> Result<LayoutResult, ExtractError>;
}

// ============================================================================
// Azure Document Intelligence
// ============================================================================

/// Azure Document Intelligence configuration
#[derive(Debug, Clone)]
pub struct AzureLayoutConfig {
    pub endpoint: String,
    pub key: String,
    pub api_version: String,
    pub timeout_secs: u64,
    pub poll_interval_ms: u64,
    pub max_polls: u32,
}

impl AzureLayoutConfig {
    pub fn new(endpoint: &str, key: &str) -> Self {
        Self {
            endpoint: endpoint.trim_end_matches('/').to_string(),
            key: key.to_string(),
            api_version: "2024-11-30".to_string(),
            timeout_secs: 60,
            poll_interval_ms: 2000,
            max_polls: 60,
        }
    }
}

/// Client for the prebuilt-layout analyze operation.
///
/// Submits the document, then polls the returned `Operation-Location` until
/// the analysis succeeds or fails, and normalizes the service JSON into a
/// [`LayoutResult`].
pub struct AzureLayoutClient {
    client: Client,
    config: AzureLayoutConfig,
}

impl AzureLayoutClient {
    pub fn new(config: AzureLayoutConfig) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .expect("Failed to create HTTP client");

        Self { client, config }
    }

    async fn submit(&self, bytes: &[u8]) -> Result<String, ExtractError> {
        let url = format!(
            "{}/documentintelligence/documentModels/prebuilt-layout:analyze?api-version={}",
            self.config.endpoint, self.config.api_version
        );

        let response = self
            .client
            .post(&url)
            .header("Ocp-Apim-Subscription-Key", &self.config.key)
            .header("Content-Type", "application/octet-stream")
            .body(bytes.to_vec())
            .send()
            .await
            .map_err(|e| ExtractError::Network(e.to_string()))?;

        if !response.status().is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(ExtractError::Api(format!("analyze error: {}", error_text)));
        }

        response
            .headers()
            .get("operation-location")
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string())
            .ok_or_else(|| {
                ExtractError::InvalidResponse("missing Operation-Location header".to_string())
            })
    }

    async fn poll(&self, operation_url: &str) -> Result<serde_json::Value, ExtractError> {
        for _ in 0..self.config.max_polls {
            let response = self
                .client
                .get(operation_url)
                .header("Ocp-Apim-Subscription-Key", &self.config.key)
                .send()
                .await
                .map_err(|e| ExtractError::Network(e.to_string()))?;

            if !response.status().is_success() {
                let error_text = response.text().await.unwrap_or_default();
                return Err(ExtractError::Api(format!("poll error: {}", error_text)));
            }

            let data: serde_json::Value = response
                .json()
                .await
                .map_err(|e| ExtractError::InvalidResponse(e.to_string()))?;

            match data["status"].as_str() {
                Some("succeeded") => return Ok(data),
                Some("failed") => {
                    return Err(ExtractError::AnalysisFailed(
                        data["error"]["message"]
                            .as_str()
                            .unwrap_or("unknown error")
                            .to_string(),
                    ))
                }
                _ => {
                    tokio::time::sleep(Duration::from_millis(self.config.poll_interval_ms)).await;
                }
            }
        }

        Err(ExtractError::AnalysisFailed(
            "polling attempts exhausted".to_string(),
        ))
    }

    fn normalize(data: &serde_json::Value) -> LayoutResult {
        let analyze = &data["analyzeResult"];

        let pages = analyze["pages"]
            .as_array()
            .map(|pages| {
                pages
                    .iter()
                    .map(|p| LayoutPage {
                        page_number: p["pageNumber"].as_u64().unwrap_or(0) as u32,
                        lines: p["lines"]
                            .as_array()
                            .map(|lines| {
                                lines
                                    .iter()
                                    .filter_map(|l| l["content"].as_str())
                                    .map(|s| s.to_string())
                                    .collect()
                            })
                            .unwrap_or_default(),
                    })
                    .collect()
            })
            .unwrap_or_default();

        let tables = analyze["tables"]
            .as_array()
            .map(|tables| {
                tables
                    .iter()
                    .map(|t| LayoutTable {
                        row_count: t["rowCount"].as_u64().unwrap_or(0) as usize,
                        column_count: t["columnCount"].as_u64().unwrap_or(0) as usize,
                        page_number: t["boundingRegions"][0]["pageNumber"]
                            .as_u64()
                            .map(|n| n as u32),
                        cells: t["cells"]
                            .as_array()
                            .map(|cells| {
                                cells
                                    .iter()
                                    .map(|c| LayoutCell {
                                        row_index: c["rowIndex"].as_u64().unwrap_or(0) as usize,
                                        column_index: c["columnIndex"].as_u64().unwrap_or(0)
                                            as usize,
                                        content: c["content"].as_str().unwrap_or("").to_string(),
                                    })
                                    .collect()
                            })
                            .unwrap_or_default(),
                    })
                    .collect()
            })
            .unwrap_or_default();

        LayoutResult { pages, tables }
    }
}

#[async_trait]
impl LayoutProvider for AzureLayoutClient {
    async fn analyze(&self, bytes: &[u8]) -> Result<LayoutResult, ExtractError> {
        let operation_url = self.submit(bytes).await?;
        let data = self.poll(&operation_url).await?;
        let result = Self::normalize(&data);
        tracing::info!(
            pages = result.pages.len(),
            tables = result.tables.len(),
            "layout analysis complete"
        );
        Ok(result)
    }
}

// ============================================================================
// Fixture provider
// ============================================================================

/// Replays a saved [`LayoutResult`] instead of calling the service.
pub struct FixtureLayoutProvider {
    result: LayoutResult,
}

impl FixtureLayoutProvider {
    pub fn new(result: LayoutResult) -> Self {
        Self { result }
    }

    /// Load a layout result previously serialized to JSON.
    pub fn from_json_file(path: &Path) -> Result<Self, ExtractError> {
        let text = std::fs::read_to_string(path)?;
        let result: LayoutResult = serde_json::from_str(&text)
            .map_err(|e| ExtractError::InvalidResponse(e.to_string()))?;
        Ok(Self { result })
    }
}

#[async_trait]
impl LayoutProvider for FixtureLayoutProvider {
    async fn analyze(&self, _bytes: &[u8]) -> Result<LayoutResult, ExtractError> {
        Ok(self.result.clone())
    }
}

// ============================================================================
// Tests
// ============================================================================
