//! In-memory graph backend
//!
//! Mirrors the Cypher statements of the HTTP backend operation-for-operation
//! so the load protocol can be exercised in tests and offline runs:
//! merge-on-conflict is first-write-wins, snapshots and edges are always
//! created, MATCH-style joins drop non-matching rows silently, and counts
//! follow the aggregate semantics of the wire statements.

use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::RwLock;

use crate::backend::GraphBackend;
use crate::{FundRow, GraphError, HoldingEdgeRow, InstrumentRow, SnapshotRow};

/// CURRENT_HOLDINGS edge (fund -> instrument)
#[derive(Debug, Clone, PartialEq)]
pub struct CurrentHoldingEdge {
    pub fund_id: i64,
    pub instrument_id: String,
    pub weight: Option<f64>,
}

#[derive(Default)]
struct GraphData {
    instruments: HashMap<String, InstrumentRow>,
    funds: HashMap<i64, FundRow>,
    snapshots: Vec<SnapshotRow>,
    latest: Vec<(i64, String)>,
    holds: Vec<HoldingEdgeRow>,
    current: Vec<CurrentHoldingEdge>,
    unique_snapshots: bool,
}

/// Graph store held entirely in memory
#[derive(Default)]
pub struct MemoryBackend {
    data: RwLock<GraphData>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    // ------------------------------------------------------------------
    // Read accessors for assertions and offline queries
    // ------------------------------------------------------------------

    pub fn instrument_count(&self) -> usize {
        self.data.read().instruments.len()
    }

    pub fn fund_count(&self) -> usize {
        self.data.read().funds.len()
    }

    pub fn snapshot_count(&self) -> usize {
        self.data.read().snapshots.len()
    }

    pub fn instrument(&self, instrument_id: &str) -> Option<InstrumentRow> {
        self.data.read().instruments.get(instrument_id).cloned()
    }

    pub fn fund(&self, fund_id: i64) -> Option<FundRow> {
        self.data.read().funds.get(&fund_id).cloned()
    }

    pub fn snapshots_for_fund(&self, fund_id: i64) -> Vec<SnapshotRow> {
        self.data
            .read()
            .snapshots
            .iter()
            .filter(|s| s.fund_id == fund_id)
            .cloned()
            .collect()
    }

    /// All LATEST_SNAPSHOT pointers for a fund, in creation order.
    pub fn latest_snapshots(&self, fund_id: i64) -> Vec<String> {
        self.data
            .read()
            .latest
            .iter()
            .filter(|(f, _)| *f == fund_id)
            .map(|(_, s)| s.clone())
            .collect()
    }

    pub fn holdings_for_snapshot(&self, snapshot_id: &str) -> Vec<HoldingEdgeRow> {
        self.data
            .read()
            .holds
            .iter()
            .filter(|h| h.snapshot_id == snapshot_id)
            .cloned()
            .collect()
    }

    /// All CURRENT_HOLDINGS edges for a fund, stale ones included.
    pub fn current_holdings(&self, fund_id: i64) -> Vec<CurrentHoldingEdge> {
        self.data
            .read()
            .current
            .iter()
            .filter(|c| c.fund_id == fund_id)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl GraphBackend for MemoryBackend {
    async fn merge_instruments(&self, instruments: &[InstrumentRow]) -> Result<u64, GraphError> {
        let mut data = self.data.write();
        let mut processed = 0u64;
        for row in instruments {
            // ON CREATE SET only: an existing node keeps its fields.
            data.instruments
                .entry(row.instrument_id.clone())
                .or_insert_with(|| row.clone());
            processed += 1;
        }
        Ok(processed)
    }

    async fn merge_fund(&self, fund: &FundRow) -> Result<(), GraphError> {
        let mut data = self.data.write();
        data.funds
            .entry(fund.fund_id)
            .or_insert_with(|| fund.clone());
        Ok(())
    }

    async fn create_snapshot(&self, snapshot: &SnapshotRow) -> Result<(), GraphError> {
        let mut data = self.data.write();
        if data.unique_snapshots
            && data
                .snapshots
                .iter()
                .any(|s| s.snapshot_id == snapshot.snapshot_id)
        {
            return Err(GraphError::ConstraintViolation(format!(
                "snapshot_id {} already exists",
                snapshot.snapshot_id
            )));
        }
        data.snapshots.push(snapshot.clone());
        Ok(())
    }

    async fn link_latest_snapshot(
        &self,
        fund_id: i64,
        snapshot_id: &str,
    ) -> Result<(), GraphError> {
        let mut data = self.data.write();
        if !data.funds.contains_key(&fund_id) {
            return Err(GraphError::MissingNode(format!("fund {}", fund_id)));
        }
        if !data.snapshots.iter().any(|s| s.snapshot_id == snapshot_id) {
            return Err(GraphError::MissingNode(format!(
                "snapshot {}",
                snapshot_id
            )));
        }
        data.latest.push((fund_id, snapshot_id.to_string()));
        Ok(())
    }

    async fn create_holdings(&self, holdings: &[HoldingEdgeRow]) -> Result<u64, GraphError> {
        let mut data = self.data.write();
        let mut created = 0u64;
        for row in holdings {
            // UNWIND + MATCH: rows whose snapshot or instrument is missing
            // simply produce no edge.
            let snapshot_exists = data.snapshots.iter().any(|s| s.snapshot_id == row.snapshot_id);
            let instrument_exists = data.instruments.contains_key(&row.instrument_id);
            if snapshot_exists && instrument_exists {
                data.holds.push(row.clone());
                created += 1;
            }
        }
        Ok(created)
    }

    async fn derive_current_holdings(
        &self,
        fund_id: i64,
        snapshot_id: &str,
    ) -> Result<u64, GraphError> {
        let mut data = self.data.write();
        let linked = data
            .latest
            .iter()
            .any(|(f, s)| *f == fund_id && s == snapshot_id);
        if !linked {
            // MATCH found nothing; the aggregate count is 0, not an error.
            return Ok(0);
        }

        let edges: Vec<CurrentHoldingEdge> = data
            .holds
            .iter()
            .filter(|h| h.snapshot_id == snapshot_id)
            .map(|h| CurrentHoldingEdge {
                fund_id,
                instrument_id: h.instrument_id.clone(),
                weight: h.weight,
            })
            .collect();

        let created = edges.len() as u64;
        data.current.extend(edges);
        Ok(created)
    }

    async fn apply_schema(&self) -> Result<(), GraphError> {
        // Instruments and funds are keyed maps already; the only constraint
        // with observable effect here is snapshot_id uniqueness.
        self.data.write().unique_snapshots = true;
        Ok(())
    }

    async fn close(&self) -> Result<(), GraphError> {
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn instrument(id: &str, name: &str) -> InstrumentRow {
        InstrumentRow {
            instrument_id: id.to_string(),
            name: Some(name.to_string()),
            asset_class: Some("EQUITY & EQUITY RELATED".to_string()),
            sub_type: Some("Indian Equity".to_string()),
        }
    }

    fn snapshot(id: &str, fund_id: i64) -> SnapshotRow {
        SnapshotRow {
            snapshot_id: id.to_string(),
            fund_id,
            year: 2025,
            month: 1,
            total_aum: 1000.0,
            num_holdings: 2,
        }
    }

    #[tokio::test]
    async fn merge_is_first_write_wins() {
        let backend = MemoryBackend::new();
        backend
            .merge_instruments(&[instrument("INE040A01034", "HDFC Bank Limited")])
            .await
            .unwrap();

        let mut renamed = instrument("INE040A01034", "Renamed Corp");
        renamed.sub_type = Some("Foreign Equity".to_string());
        let processed = backend.merge_instruments(&[renamed]).await.unwrap();

        assert_eq!(processed, 1);
        assert_eq!(backend.instrument_count(), 1);
        let stored = backend.instrument("INE040A01034").unwrap();
        assert_eq!(stored.name.as_deref(), Some("HDFC Bank Limited"));
        assert_eq!(stored.sub_type.as_deref(), Some("Indian Equity"));
    }

    #[tokio::test]
    async fn snapshots_are_always_created() {
        let backend = MemoryBackend::new();
        backend.create_snapshot(&snapshot("202501", 1)).await.unwrap();
        backend.create_snapshot(&snapshot("202501", 1)).await.unwrap();
        assert_eq!(backend.snapshot_count(), 2);
    }

    #[tokio::test]
    async fn schema_enforces_snapshot_uniqueness() {
        let backend = MemoryBackend::new();
        backend.apply_schema().await.unwrap();
        backend.create_snapshot(&snapshot("202501", 1)).await.unwrap();

        let result = backend.create_snapshot(&snapshot("202501", 1)).await;
        assert!(matches!(result, Err(GraphError::ConstraintViolation(_))));
    }

    #[tokio::test]
    async fn link_requires_both_nodes() {
        let backend = MemoryBackend::new();
        let result = backend.link_latest_snapshot(1, "202501").await;
        assert!(matches!(result, Err(GraphError::MissingNode(_))));
    }

    #[tokio::test]
    async fn holdings_with_unknown_instrument_are_dropped() {
        let backend = MemoryBackend::new();
        backend
            .merge_instruments(&[instrument("INE040A01034", "HDFC Bank Limited")])
            .await
            .unwrap();
        backend.create_snapshot(&snapshot("202501", 1)).await.unwrap();

        let created = backend
            .create_holdings(&[
                HoldingEdgeRow {
                    snapshot_id: "202501".to_string(),
                    instrument_id: "INE040A01034".to_string(),
                    weight: Some(9.18),
                },
                HoldingEdgeRow {
                    snapshot_id: "202501".to_string(),
                    instrument_id: "UNKNOWN".to_string(),
                    weight: Some(1.0),
                },
            ])
            .await
            .unwrap();

        assert_eq!(created, 1);
        assert_eq!(backend.holdings_for_snapshot("202501").len(), 1);
    }

    #[tokio::test]
    async fn derive_without_latest_edge_copies_nothing() {
        let backend = MemoryBackend::new();
        let created = backend.derive_current_holdings(1, "202501").await.unwrap();
        assert_eq!(created, 0);
    }
}
