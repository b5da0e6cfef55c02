//! Neo4j HTTP backend
//!
//! Drives the Neo4j transactional Cypher endpoint
//! (`POST {base}/db/{database}/tx/commit`) with one parameterized statement
//! per round trip. The server provides per-statement transactionality; the
//! load protocol above this backend provides none across statements.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;

use crate::backend::GraphBackend;
use crate::{FundRow, GraphError, HoldingEdgeRow, InstrumentRow, SnapshotRow};

const MERGE_INSTRUMENTS: &str = "\
UNWIND $instruments AS row
MERGE (i:Instrument {instrument_id: row.instrument_id})
ON CREATE SET
    i.name        = row.name,
    i.asset_class = row.asset_class,
    i.sub_type    = row.sub_type
RETURN count(i) AS instruments_created";

const MERGE_FUND: &str = "\
MERGE (f:Fund {fund_id: $fund_id})
ON CREATE SET
    f.fund_name = $fund_name,
    f.amc = $amc,
    f.category = $category
RETURN f.fund_id AS fund_id, f.fund_name AS fund_name";

const CREATE_SNAPSHOT: &str = "\
CREATE (snap:MonthlySnapshot {
    snapshot_id: $snapshot_id,
    fund_id: $fund_id,
    year: $year,
    month: $month,
    total_aum: $total_aum,
    num_holdings: $num_holdings
})
RETURN snap.snapshot_id AS snapshot_id";

const LINK_LATEST_SNAPSHOT: &str = "\
MATCH (f:Fund {fund_id: $fund_id})
MATCH (snap:MonthlySnapshot {snapshot_id: $snapshot_id})
CREATE (f)-[:LATEST_SNAPSHOT]->(snap)
RETURN f.fund_id AS fund_id, snap.snapshot_id AS snapshot_id";

const CREATE_HOLDINGS: &str = "\
UNWIND $holdings AS holding
MATCH (snap:MonthlySnapshot {snapshot_id: holding.snapshot_id})
MATCH (i:Instrument {instrument_id: holding.instrument_id})
CREATE (snap)-[:HOLDS {
    weight: holding.weight
}]->(i)
RETURN count(*) AS holdings_created";

const CREATE_CURRENT_HOLDINGS: &str = "\
MATCH (f:Fund {fund_id: $fund_id})-[:LATEST_SNAPSHOT]->(snap:MonthlySnapshot {snapshot_id: $snapshot_id})
MATCH (snap)-[h:HOLDS]->(i:Instrument)
CREATE (f)-[:CURRENT_HOLDINGS {
    weight: h.weight
}]->(i)
RETURN count(*) AS current_holdings_created";

const SCHEMA_STATEMENTS: [&str; 6] = [
    "CREATE CONSTRAINT fund_id_unique IF NOT EXISTS FOR (f:Fund) REQUIRE f.fund_id IS UNIQUE",
    "CREATE CONSTRAINT instrument_id_unique IF NOT EXISTS FOR (i:Instrument) REQUIRE i.instrument_id IS UNIQUE",
    "CREATE CONSTRAINT snapshot_id_unique IF NOT EXISTS FOR (s:MonthlySnapshot) REQUIRE s.snapshot_id IS UNIQUE",
    "CREATE INDEX fund_name_index IF NOT EXISTS FOR (f:Fund) ON (f.fund_name)",
    "CREATE INDEX instrument_name_index IF NOT EXISTS FOR (i:Instrument) ON (i.name)",
    "CREATE INDEX snapshot_period_index IF NOT EXISTS FOR (s:MonthlySnapshot) ON (s.year, s.month)",
];

/// Connection settings for the HTTP endpoint
#[derive(Debug, Clone)]
pub struct Neo4jSettings {
    /// Base URL of the HTTP API, e.g. `http://localhost:7474`
    pub base_url: String,
    pub database: String,
    pub username: String,
    pub password: String,
    pub timeout_secs: u64,
}

impl Neo4jSettings {
    pub fn new(base_url: &str, username: &str, password: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            database: "neo4j".to_string(),
            username: username.to_string(),
            password: password.to_string(),
            timeout_secs: 30,
        }
    }

    pub fn with_database(mut self, database: &str) -> Self {
        self.database = database.to_string();
        self
    }
}

pub struct Neo4jHttpBackend {
    client: Client,
    settings: Neo4jSettings,
}

impl Neo4jHttpBackend {
    pub fn new(settings: Neo4jSettings) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()
            .expect("Failed to create HTTP client");

        tracing::info!(url = %settings.base_url, database = %settings.database, "connected to Neo4j");
        Self { client, settings }
    }

    /// Execute one statement in an auto-commit transaction; returns the rows
    /// of the first result.
    async fn execute(
        &self,
        statement: &str,
        parameters: serde_json::Value,
    ) -> Result<Vec<serde_json::Value>, GraphError> {
        let url = format!(
            "{}/db/{}/tx/commit",
            self.settings.base_url, self.settings.database
        );

        let body = serde_json::json!({
            "statements": [{"statement": statement, "parameters": parameters}]
        });

        let response = self
            .client
            .post(&url)
            .basic_auth(&self.settings.username, Some(&self.settings.password))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| GraphError::Network(e.to_string()))?;

        if !response.status().is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(GraphError::Api(format!("HTTP error: {}", error_text)));
        }

        let data: serde_json::Value = response
            .json()
            .await
            .map_err(|e| GraphError::InvalidResponse(e.to_string()))?;

        if let Some(errors) = data["errors"].as_array() {
            if let Some(first) = errors.first() {
                let code = first["code"].as_str().unwrap_or("");
                let message = format!(
                    "{}: {}",
                    code,
                    first["message"].as_str().unwrap_or("unknown error")
                );
                if code.contains("ConstraintValidationFailed") {
                    return Err(GraphError::ConstraintViolation(message));
                }
                return Err(GraphError::Api(message));
            }
        }

        let rows = data["results"][0]["data"]
            .as_array()
            .map(|rows| rows.iter().map(|r| r["row"].clone()).collect())
            .unwrap_or_default();

        Ok(rows)
    }

    /// Single-row count result, defaulting to 0 when the statement matched
    /// nothing.
    fn first_count(rows: &[serde_json::Value]) -> u64 {
        rows.first()
            .and_then(|row| row[0].as_u64())
            .unwrap_or(0)
    }

    /// A MATCH-based single-row statement that returned no rows means a
    /// referenced node does not exist.
    fn require_row(rows: &[serde_json::Value], what: &str) -> Result<(), GraphError> {
        if rows.is_empty() {
            return Err(GraphError::MissingNode(what.to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl GraphBackend for Neo4jHttpBackend {
    async fn merge_instruments(&self, instruments: &[InstrumentRow]) -> Result<u64, GraphError> {
        let params = serde_json::json!({ "instruments": instruments });
        let rows = self.execute(MERGE_INSTRUMENTS, params).await?;
        let created = Self::first_count(&rows);
        tracing::info!(instruments = created, "created/merged instruments");
        Ok(created)
    }

    async fn merge_fund(&self, fund: &FundRow) -> Result<(), GraphError> {
        let params = serde_json::json!({
            "fund_id": fund.fund_id,
            "fund_name": fund.fund_name,
            "amc": fund.amc,
            "category": fund.category,
        });
        let rows = self.execute(MERGE_FUND, params).await?;
        Self::require_row(&rows, "fund merge returned no row")?;
        tracing::info!(fund_name = %fund.fund_name, "created fund");
        Ok(())
    }

    async fn create_snapshot(&self, snapshot: &SnapshotRow) -> Result<(), GraphError> {
        let params = serde_json::json!({
            "snapshot_id": snapshot.snapshot_id,
            "fund_id": snapshot.fund_id,
            "year": snapshot.year,
            "month": snapshot.month,
            "total_aum": snapshot.total_aum,
            "num_holdings": snapshot.num_holdings,
        });
        let rows = self.execute(CREATE_SNAPSHOT, params).await?;
        Self::require_row(&rows, "snapshot create returned no row")?;
        tracing::info!(snapshot_id = %snapshot.snapshot_id, "created snapshot");
        Ok(())
    }

    async fn link_latest_snapshot(
        &self,
        fund_id: i64,
        snapshot_id: &str,
    ) -> Result<(), GraphError> {
        let params = serde_json::json!({
            "fund_id": fund_id,
            "snapshot_id": snapshot_id,
        });
        let rows = self.execute(LINK_LATEST_SNAPSHOT, params).await?;
        Self::require_row(
            &rows,
            &format!("fund {} or snapshot {}", fund_id, snapshot_id),
        )?;
        tracing::info!(fund_id, snapshot_id, "linked fund to snapshot");
        Ok(())
    }

    async fn create_holdings(&self, holdings: &[HoldingEdgeRow]) -> Result<u64, GraphError> {
        let params = serde_json::json!({ "holdings": holdings });
        let rows = self.execute(CREATE_HOLDINGS, params).await?;
        let created = Self::first_count(&rows);
        tracing::info!(holdings = created, "created holdings");
        Ok(created)
    }

    async fn derive_current_holdings(
        &self,
        fund_id: i64,
        snapshot_id: &str,
    ) -> Result<u64, GraphError> {
        let params = serde_json::json!({
            "fund_id": fund_id,
            "snapshot_id": snapshot_id,
        });
        let rows = self.execute(CREATE_CURRENT_HOLDINGS, params).await?;
        let created = Self::first_count(&rows);
        tracing::info!(current_holdings = created, "created current holdings");
        Ok(created)
    }

    async fn apply_schema(&self) -> Result<(), GraphError> {
        for statement in SCHEMA_STATEMENTS {
            self.execute(statement, serde_json::json!({})).await?;
        }
        tracing::info!("applied constraints and indexes");
        Ok(())
    }

    async fn close(&self) -> Result<(), GraphError> {
        // The HTTP API is stateless per request; nothing to release.
        tracing::info!("closed Neo4j connection");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn count_extraction_defaults_to_zero() {
        assert_eq!(Neo4jHttpBackend::first_count(&[]), 0);
        assert_eq!(
            Neo4jHttpBackend::first_count(&[serde_json::json!([7])]),
            7
        );
    }

    #[test]
    fn missing_row_is_missing_node() {
        assert!(matches!(
            Neo4jHttpBackend::require_row(&[], "fund 1"),
            Err(GraphError::MissingNode(_))
        ));
        assert!(Neo4jHttpBackend::require_row(&[serde_json::json!([1])], "x").is_ok());
    }
}
