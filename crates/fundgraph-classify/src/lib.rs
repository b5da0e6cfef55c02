//! Holding classification for Fundgraph
//!
//! The local half of the row-normalization stage:
//! - asset taxonomy (valid group / sub-group pairs) exposed as a validation
//!   utility, never enforced inline at ingest time
//! - the LLM table-cleaner oracle boundary (fenced-JSON tolerant parsing,
//!   parse failure recovered as zero holdings)
//! - ISIN resolution from the reference master with punctuation/suffix
//!   normalization
//! - flattening of grouped oracle output into flat holding records plus the
//!   JSON interchange file that decouples extraction from graph loading

pub mod cleaner;
pub mod flatten;
pub mod isin;
pub mod taxonomy;

pub use cleaner::{
    parse_cleaner_output, HoldingGroup, HoldingItem, LlmCleanerConfig, LlmTableCleaner,
    MockTableCleaner, TableCleaner,
};
pub use flatten::{group_by_fund, load_json, FlatHolding, HoldingsAccumulator};
pub use isin::{normalize_company_name, IsinMapper};
pub use taxonomy::{valid_subgroups, validate_classification, EQUITY_GROUP};

/// Errors at the classification boundary
#[derive(Debug, thiserror::Error)]
pub enum CleanError {
    #[error("cleaner API error: {0}")]
    Api(String),
    #[error("network error: {0}")]
    Network(String),
    #[error("invalid cleaner response: {0}")]
    InvalidResponse(String),
}
