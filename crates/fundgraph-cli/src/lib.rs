//! Fundgraph orchestration
//!
//! Configuration loading, fund identity derivation, and the document
//! pipeline that composes extraction -> classification -> identity
//! resolution -> graph loading. The binary in `main.rs` is thin glue over
//! this crate.

pub mod config;
pub mod identity;
pub mod pipeline;

pub use config::{AppConfig, AzureSettings, CleanerSettings, DataSettings, GraphSettings};
pub use identity::{amc_for, estimate_total_aum, fund_id_for, snapshot_id_for};
pub use pipeline::{load_holdings_file, BatchOutcome, DocumentPipeline};
