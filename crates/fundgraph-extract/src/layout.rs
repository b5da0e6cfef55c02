//! Layout result model
//!
//! The single well-typed structure produced at the document-understanding
//! oracle boundary. Downstream code only ever sees these types; the adapter
//! that calls the service is responsible for normalizing into them.

use serde::{Deserialize, Serialize};

/// Full layout analysis of one document
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LayoutResult {
    pub pages: Vec<LayoutPage>,
    pub tables: Vec<LayoutTable>,
}

/// One page with its text lines in reading order
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LayoutPage {
    pub page_number: u32,
    pub lines: Vec<String>,
}

/// A detected table with sparse cell records
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LayoutTable {
    pub row_count: usize,
    pub column_count: usize,
    /// Page the table starts on. Tables without a bounding page are dropped
    /// during reconciliation.
    pub page_number: Option<u32>,
    pub cells: Vec<LayoutCell>,
}

/// A single cell addressed by row/column index
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LayoutCell {
    pub row_index: usize,
    pub column_index: usize,
    pub content: String,
}

impl LayoutTable {
    pub fn new(row_count: usize, column_count: usize, page_number: Option<u32>) -> Self {
        Self {
            row_count,
            column_count,
            page_number,
            cells: Vec::new(),
        }
    }

    pub fn with_cell(mut self, row_index: usize, column_index: usize, content: &str) -> Self {
        self.cells.push(LayoutCell {
            row_index,
            column_index,
            content: content.to_string(),
        });
        self
    }
}
