//! The six-step portfolio load protocol
//!
//! Row transformation (identifier/weight aliases, silent skip of rows with
//! no identifier) happens here, above the backend. The six steps run as
//! sequential round trips; a failure partway through surfaces to the caller
//! with no compensating rollback of the steps that already succeeded.

use std::sync::Arc;

use crate::backend::GraphBackend;
use crate::{
    FundRow, GraphError, HoldingEdgeRow, HoldingInput, InstrumentRow, LoadSummary, SnapshotRow,
};

/// Fund/snapshot identity and totals for one load call
#[derive(Debug, Clone)]
pub struct PortfolioLoad {
    pub fund_id: i64,
    pub fund_name: String,
    pub amc: String,
    pub category: Option<String>,
    pub snapshot_id: String,
    pub year: i32,
    pub month: u32,
    pub total_aum: f64,
}

/// Portfolio store over a pluggable graph backend
pub struct PortfolioStore {
    backend: Arc<dyn GraphBackend>,
}

impl PortfolioStore {
    pub fn new(backend: Arc<dyn GraphBackend>) -> Self {
        Self { backend }
    }

    /// Step 1: upsert an Instrument node for every holding that carries an
    /// identifier. Rows without one are excluded here and stay excluded for
    /// the rest of the load.
    pub async fn create_instruments(&self, holdings: &[HoldingInput]) -> Result<u64, GraphError> {
        let rows: Vec<InstrumentRow> = holdings
            .iter()
            .filter_map(|h| {
                h.effective_id().map(|id| InstrumentRow {
                    instrument_id: id.to_string(),
                    name: h.name.clone(),
                    asset_class: h.asset_class.clone(),
                    sub_type: h.sub_type.clone(),
                })
            })
            .collect();

        self.backend.merge_instruments(&rows).await
    }

    /// Step 2: upsert the Fund node.
    pub async fn create_fund(&self, fund: &FundRow) -> Result<(), GraphError> {
        self.backend.merge_fund(fund).await
    }

    /// Step 3: insert a fresh MonthlySnapshot node.
    pub async fn create_snapshot(&self, snapshot: &SnapshotRow) -> Result<(), GraphError> {
        self.backend.create_snapshot(snapshot).await
    }

    /// Step 4: point the fund at the fresh snapshot.
    pub async fn link_snapshot_to_fund(
        &self,
        fund_id: i64,
        snapshot_id: &str,
    ) -> Result<(), GraphError> {
        self.backend.link_latest_snapshot(fund_id, snapshot_id).await
    }

    /// Step 5: create one HOLDS edge per identified holding. Rows lacking an
    /// identifier are skipped silently.
    pub async fn add_holdings(
        &self,
        snapshot_id: &str,
        holdings: &[HoldingInput],
    ) -> Result<u64, GraphError> {
        let rows: Vec<HoldingEdgeRow> = holdings
            .iter()
            .filter_map(|h| {
                h.effective_id().map(|id| HoldingEdgeRow {
                    snapshot_id: snapshot_id.to_string(),
                    instrument_id: id.to_string(),
                    weight: h.effective_weight(),
                })
            })
            .collect();

        self.backend.create_holdings(&rows).await
    }

    /// Step 6: re-derive the CURRENT_HOLDINGS view from the fresh snapshot.
    pub async fn create_current_holdings(
        &self,
        fund_id: i64,
        snapshot_id: &str,
    ) -> Result<u64, GraphError> {
        self.backend
            .derive_current_holdings(fund_id, snapshot_id)
            .await
    }

    /// Complete load workflow: six ordered steps, each one round trip.
    pub async fn load_portfolio(
        &self,
        load: &PortfolioLoad,
        holdings: &[HoldingInput],
    ) -> Result<LoadSummary, GraphError> {
        let instruments_created = self.create_instruments(holdings).await?;

        self.create_fund(&FundRow {
            fund_id: load.fund_id,
            fund_name: load.fund_name.clone(),
            amc: load.amc.clone(),
            category: load.category.clone(),
        })
        .await?;

        self.create_snapshot(&SnapshotRow {
            snapshot_id: load.snapshot_id.clone(),
            fund_id: load.fund_id,
            year: load.year,
            month: load.month,
            total_aum: load.total_aum,
            num_holdings: holdings.len(),
        })
        .await?;

        self.link_snapshot_to_fund(load.fund_id, &load.snapshot_id)
            .await?;

        let holdings_created = self.add_holdings(&load.snapshot_id, holdings).await?;

        let current_holdings_created = self
            .create_current_holdings(load.fund_id, &load.snapshot_id)
            .await?;

        Ok(LoadSummary {
            instruments_created,
            fund_id: load.fund_id,
            snapshot_id: load.snapshot_id.clone(),
            holdings_created,
            current_holdings_created,
        })
    }

    /// Schema maintenance: constraints and indexes, run once before bulk
    /// loads.
    pub async fn apply_schema(&self) -> Result<(), GraphError> {
        self.backend.apply_schema().await
    }

    /// Release the backend connection.
    pub async fn close(&self) -> Result<(), GraphError> {
        self.backend.close().await
    }
}
