//! Portfolio graph store for Fundgraph
//!
//! Models fund -> instrument ownership over time:
//! - `Instrument` and `Fund` nodes with merge-on-conflict creation
//!   (first-write-wins, re-creation never overwrites)
//! - `MonthlySnapshot` nodes, always newly created per load
//! - `HOLDS` edges (snapshot -> instrument, weighted)
//! - `LATEST_SNAPSHOT` pointers (fund -> snapshot)
//! - `CURRENT_HOLDINGS` edges (fund -> instrument), re-derived from the fresh
//!   snapshot on each load
//!
//! The six-step load protocol runs as six sequential round-trips with no
//! cross-step atomicity: a failure partway through leaves the store
//! partially loaded, and the caller sees the error. Backends provide
//! per-statement transactionality only.

pub mod backend;
pub mod memory;
pub mod neo4j;
pub mod portfolio;

pub use backend::GraphBackend;
pub use memory::MemoryBackend;
pub use neo4j::{Neo4jHttpBackend, Neo4jSettings};
pub use portfolio::{PortfolioLoad, PortfolioStore};

use serde::{Deserialize, Serialize};

/// Errors at the graph-store boundary
#[derive(Debug, thiserror::Error)]
pub enum GraphError {
    #[error("graph API error: {0}")]
    Api(String),
    #[error("network error: {0}")]
    Network(String),
    #[error("invalid graph response: {0}")]
    InvalidResponse(String),
    #[error("no matching node: {0}")]
    MissingNode(String),
    #[error("uniqueness constraint violated: {0}")]
    ConstraintViolation(String),
}

// ============================================================================
// Node and edge rows (backend wire parameters)
// ============================================================================

/// Instrument node parameters (merge-on-conflict by `instrument_id`)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstrumentRow {
    pub instrument_id: String,
    pub name: Option<String>,
    pub asset_class: Option<String>,
    pub sub_type: Option<String>,
}

/// Fund node parameters (merge-on-conflict by `fund_id`)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FundRow {
    pub fund_id: i64,
    pub fund_name: String,
    pub amc: String,
    pub category: Option<String>,
}

/// Monthly snapshot parameters (always created, never merged)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotRow {
    pub snapshot_id: String,
    pub fund_id: i64,
    pub year: i32,
    pub month: u32,
    pub total_aum: f64,
    pub num_holdings: usize,
}

/// HOLDS edge parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HoldingEdgeRow {
    pub snapshot_id: String,
    pub instrument_id: String,
    pub weight: Option<f64>,
}

/// One holding row as supplied by callers of the load protocol.
///
/// The interchange format carries `stock_id`/`weights`; direct API callers
/// use `instrument_id`/`weight`. Both spellings are accepted and reconciled
/// here instead of via dynamic field fallbacks downstream.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HoldingInput {
    pub name: Option<String>,
    pub instrument_id: Option<String>,
    pub stock_id: Option<String>,
    pub weights: Option<f64>,
    pub weight: Option<f64>,
    pub asset_class: Option<String>,
    pub sub_type: Option<String>,
}

impl HoldingInput {
    /// `instrument_id` wins over `stock_id`; `None` when both are absent.
    pub fn effective_id(&self) -> Option<&str> {
        self.instrument_id.as_deref().or(self.stock_id.as_deref())
    }

    /// `weights` wins over `weight`.
    pub fn effective_weight(&self) -> Option<f64> {
        self.weights.or(self.weight)
    }
}

/// Per-step counts returned by `load_portfolio` for caller-side verification
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoadSummary {
    pub instruments_created: u64,
    pub fund_id: i64,
    pub snapshot_id: String,
    pub holdings_created: u64,
    pub current_holdings_created: u64,
}
