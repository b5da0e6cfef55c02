//! Factsheet table extraction for Fundgraph
//!
//! Turns a raw document-layout result (pages, lines, tables, cells) into a
//! mapping from detected fund name to the reconciled tables for that fund:
//! - dense grid materialization of sparse cell records
//! - fund-name detection from page text ("fund" keyword + preceding line)
//! - continuation merge of adjacent same-header tables within a page
//!
//! The layout result itself comes from an external document-understanding
//! service (Azure Document Intelligence prebuilt-layout); that service is an
//! untrusted oracle consumed through [`LayoutProvider`].

pub mod layout;
pub mod provider;
pub mod tables;

pub use layout::{LayoutCell, LayoutPage, LayoutResult, LayoutTable};
pub use provider::{AzureLayoutClient, AzureLayoutConfig, FixtureLayoutProvider, LayoutProvider};
pub use tables::{
    detect_fund_name, extract_fund_tables, grid_to_markdown, materialize_grid, TableGrid,
};

/// Errors at the extraction boundary
#[derive(Debug, thiserror::Error)]
pub enum ExtractError {
    #[error("layout service error: {0}")]
    Api(String),
    #[error("network error: {0}")]
    Network(String),
    #[error("invalid layout response: {0}")]
    InvalidResponse(String),
    #[error("layout analysis did not complete: {0}")]
    AnalysisFailed(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
