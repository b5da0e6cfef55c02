//! LLM table-cleaner boundary
//!
//! The classification oracle takes a markdown rendering of one raw table and
//! returns semantically grouped holdings as a JSON array. The oracle is
//! allowed to wrap its output in a fenced code block; the fence is stripped
//! before parsing. A parse failure is recovered locally as zero holdings.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::CleanError;

/// One holding item as returned by the oracle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HoldingItem {
    pub name: Option<String>,
    pub percentage_to_net_assets: Option<f64>,
}

/// One asset-class group of holdings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HoldingGroup {
    pub group_name: Option<String>,
    pub sub_group: Option<String>,
    #[serde(default)]
    pub items: Vec<HoldingItem>,
}

/// Trait for table-cleaning oracles
#[async_trait]
pub trait TableCleaner: Send + Sync {
    /// Normalize one raw table (markdown/text) into grouped holdings.
    async fn clean_table(&self, table_markdown: &str) -> Result<Vec<HoldingGroup>, CleanError>;
}

// ============================================================================
// Response parsing
// ============================================================================

/// Strip a leading ```json / ``` fence, if any.
fn strip_code_fence(raw: &str) -> &str {
    let trimmed = raw.trim();
    for fence in ["```json", "```"] {
        if let Some(rest) = trimmed.strip_prefix(fence) {
            return match rest.find("```") {
                Some(end) => &rest[..end],
                None => rest,
            };
        }
    }
    trimmed
}

/// Parse oracle output into groups.
///
/// Malformed JSON yields an empty list (zero holdings extracted), never an
/// error: classification parse failures are recoverable by design.
pub fn parse_cleaner_output(raw: &str) -> Vec<HoldingGroup> {
    let json_str = strip_code_fence(raw).trim();
    match serde_json::from_str::<Vec<HoldingGroup>>(json_str) {
        Ok(groups) => groups,
        Err(e) => {
            tracing::warn!(error = %e, "failed to parse cleaner output, treating as empty");
            Vec::new()
        }
    }
}

// ============================================================================
// OpenAI-compatible chat-completions cleaner
// ============================================================================

const SYSTEM_PROMPT: &str = r#"You are a table normalizer for OCR-extracted fund portfolio tables.

Group every holding row into asset classes:
- group_name must be one of:
    EQUITY & EQUITY RELATED
    CORPORATE DEBT
    GOVERNMENT SECURITIES
    SECURITISED DEBT
    MONEY MARKET INSTRUMENTS
    OTHER
- sub_group must be logically valid for the group_name.
- For EQUITY & EQUITY RELATED, sector names (Banking, IT, Pharma, FMCG, Energy,
  Metals, ...) MUST NOT be used as sub_group. Use "Indian Equity" or
  "Foreign Equity" unless the instrument type is explicitly different
  (REIT, INVIT, ...).
- Keep full company names intact. Use null for missing values.
- Consider Gross Exposure / % to Net Assets as percentage_to_net_assets.
- Ignore totals, headers, ratings, summaries.

Output a STRICT JSON ARRAY ONLY, no explanations. Each element:
{
  "group_name": string,
  "sub_group": string,
  "items": [ { "name": string, "percentage_to_net_assets": number } ]
}"#;

/// Configuration for the chat-completions cleaner
#[derive(Debug, Clone)]
pub struct LlmCleanerConfig {
    pub api_key: String,
    pub model: String,
    pub base_url: String,
    pub temperature: f32,
    pub timeout_secs: u64,
}

impl LlmCleanerConfig {
    pub fn new(api_key: &str, model: &str) -> Self {
        Self {
            api_key: api_key.to_string(),
            model: model.to_string(),
            base_url: "https://api.groq.com/openai/v1".to_string(),
            temperature: 0.1,
            timeout_secs: 60,
        }
    }

    pub fn with_base_url(mut self, url: &str) -> Self {
        self.base_url = url.trim_end_matches('/').to_string();
        self
    }
}

/// Table cleaner backed by an OpenAI-compatible chat-completions endpoint
pub struct LlmTableCleaner {
    client: Client,
    config: LlmCleanerConfig,
}

impl LlmTableCleaner {
    pub fn new(config: LlmCleanerConfig) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .expect("Failed to create HTTP client");

        Self { client, config }
    }
}

#[async_trait]
impl TableCleaner for LlmTableCleaner {
    async fn clean_table(&self, table_markdown: &str) -> Result<Vec<HoldingGroup>, CleanError> {
        let url = format!("{}/chat/completions", self.config.base_url);

        let body = serde_json::json!({
            "model": self.config.model,
            "temperature": self.config.temperature,
            "messages": [
                {"role": "system", "content": SYSTEM_PROMPT},
                {"role": "user", "content": table_markdown},
            ],
        });

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.config.api_key))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| CleanError::Network(e.to_string()))?;

        if !response.status().is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(CleanError::Api(format!("API error: {}", error_text)));
        }

        let data: serde_json::Value = response
            .json()
            .await
            .map_err(|e| CleanError::InvalidResponse(e.to_string()))?;

        let content = data["choices"][0]["message"]["content"]
            .as_str()
            .unwrap_or("");

        let groups = parse_cleaner_output(content);
        tracing::info!(groups = groups.len(), "table normalized");
        Ok(groups)
    }
}

// ============================================================================
// Mock cleaner for tests
// ============================================================================

/// Returns canned groups without calling any service.
pub struct MockTableCleaner {
    pub groups: Vec<HoldingGroup>,
}

impl MockTableCleaner {
    pub fn new(groups: Vec<HoldingGroup>) -> Self {
        Self { groups }
    }

    pub fn empty() -> Self {
        Self { groups: Vec::new() }
    }
}

#[async_trait]
impl TableCleaner for MockTableCleaner {
    async fn clean_table(&self, _table_markdown: &str) -> Result<Vec<HoldingGroup>, CleanError> {
        Ok(self.groups.clone())
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    const GROUPED: &str = r#"[
        {"group_name": "EQUITY & EQUITY RELATED", "sub_group": "Indian Equity",
         "items": [{"name": "HDFC Bank Limited", "percentage_to_net_assets": 9.18}]}
    ]"#;

    #[test]
    fn parses_plain_json_array() {
        let groups = parse_cleaner_output(GROUPED);
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].items[0].name.as_deref(), Some("HDFC Bank Limited"));
        assert_eq!(groups[0].items[0].percentage_to_net_assets, Some(9.18));
    }

    #[test]
    fn strips_json_fence() {
        let fenced = format!("```json\n{}\n```", GROUPED);
        let groups = parse_cleaner_output(&fenced);
        assert_eq!(groups.len(), 1);
    }

    #[test]
    fn strips_bare_fence() {
        let fenced = format!("```\n{}\n```", GROUPED);
        let groups = parse_cleaner_output(&fenced);
        assert_eq!(groups.len(), 1);
    }

    #[test]
    fn malformed_json_yields_zero_holdings() {
        assert!(parse_cleaner_output("not json at all").is_empty());
        assert!(parse_cleaner_output("{\"group_name\": \"X\"}").is_empty());
    }

    #[test]
    fn missing_items_defaults_to_empty() {
        let groups = parse_cleaner_output(
            r#"[{"group_name": "OTHER", "sub_group": "Commodity"}]"#,
        );
        assert_eq!(groups.len(), 1);
        assert!(groups[0].items.is_empty());
    }

    #[tokio::test]
    async fn mock_cleaner_returns_canned_groups() {
        let cleaner = MockTableCleaner::new(parse_cleaner_output(GROUPED));
        let groups = cleaner.clean_table("| ignored |").await.unwrap();
        assert_eq!(groups.len(), 1);
    }
}
