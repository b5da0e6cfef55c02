//! Graph backend trait
//!
//! One method per wire statement class of the load protocol, plus schema
//! maintenance and connection release. Each method is a single round trip;
//! idempotency is per-method as documented, never across methods.

use async_trait::async_trait;

use crate::{FundRow, GraphError, HoldingEdgeRow, InstrumentRow, SnapshotRow};

#[async_trait]
pub trait GraphBackend: Send + Sync {
    /// Upsert instruments by `instrument_id`; fields set only on first
    /// creation. Returns the number of rows processed.
    async fn merge_instruments(&self, instruments: &[InstrumentRow]) -> Result<u64, GraphError>;

    /// Upsert a fund by `fund_id`; fields set only on first creation.
    async fn merge_fund(&self, fund: &FundRow) -> Result<(), GraphError>;

    /// Insert a new snapshot node. Not idempotent: a repeated load for the
    /// same period produces a duplicate snapshot unless the backend enforces
    /// uniqueness on `snapshot_id`.
    async fn create_snapshot(&self, snapshot: &SnapshotRow) -> Result<(), GraphError>;

    /// Create a LATEST_SNAPSHOT edge. Not idempotent: repeated loads
    /// accumulate multiple "latest" pointers for a fund.
    async fn link_latest_snapshot(&self, fund_id: i64, snapshot_id: &str)
        -> Result<(), GraphError>;

    /// Create one HOLDS edge per row whose snapshot and instrument both
    /// exist; non-matching rows are dropped silently (MATCH semantics).
    /// Returns the number of edges created.
    async fn create_holdings(&self, holdings: &[HoldingEdgeRow]) -> Result<u64, GraphError>;

    /// Copy every HOLDS edge of the given snapshot into CURRENT_HOLDINGS
    /// edges from the fund, carrying the same weight. Stale edges from prior
    /// loads are not removed. Returns the number of edges created.
    async fn derive_current_holdings(
        &self,
        fund_id: i64,
        snapshot_id: &str,
    ) -> Result<u64, GraphError>;

    /// Create uniqueness constraints and secondary indexes. Maintenance
    /// path, run once before bulk loads.
    async fn apply_schema(&self) -> Result<(), GraphError>;

    /// Release the connection. Must be called on every exit path once a
    /// processing run completes.
    async fn close(&self) -> Result<(), GraphError>;
}
