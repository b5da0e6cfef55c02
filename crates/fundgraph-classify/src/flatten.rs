//! Flattening and the holdings interchange format
//!
//! Turns the oracle's grouped output into flat holding records, attaching the
//! fund name, the resolved ISIN (equity rows only), and the market-cap
//! bucket. Records accumulate across tables and documents until persisted as
//! one JSON batch, which a later graph-load run can consume.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::cleaner::HoldingGroup;
use crate::isin::IsinMapper;
use crate::taxonomy::EQUITY_GROUP;

const ISIN_RESOLVED_SUBGROUPS: [&str; 2] = ["Indian Equity", "Foreign Equity"];

/// One flat holding record, the interchange boundary artifact
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlatHolding {
    pub fund_name: String,
    pub name: Option<String>,
    pub stock_id: Option<String>,
    pub weights: Option<f64>,
    pub market_cap: Option<String>,
    pub asset_class: Option<String>,
    pub sub_type: Option<String>,
}

/// Accumulates flat records across multiple tables/documents
#[derive(Debug, Default)]
pub struct HoldingsAccumulator {
    records: Vec<FlatHolding>,
}

impl HoldingsAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Flatten one table's grouped output and append to the buffer.
    ///
    /// ISIN resolution only applies to equity rows whose sub-group is
    /// "Indian Equity" or "Foreign Equity"; debt and money-market rows get a
    /// null identifier by design. Market-cap lookup is attempted for every
    /// row (original behavior). Returns the records added by this call.
    pub fn flatten_groups(
        &mut self,
        fund_name: &str,
        groups: &[HoldingGroup],
        mapper: &IsinMapper,
    ) -> Vec<FlatHolding> {
        let mut batch = Vec::new();

        for group in groups {
            let asset_class = group.group_name.as_deref();
            let sub_type = group.sub_group.as_deref();

            let resolve_isin = asset_class == Some(EQUITY_GROUP)
                && sub_type.is_some_and(|s| ISIN_RESOLVED_SUBGROUPS.contains(&s));

            for item in &group.items {
                let stock_name = item.name.as_deref().unwrap_or("");

                let stock_id = if resolve_isin {
                    mapper.resolve(stock_name)
                } else {
                    None
                };

                batch.push(FlatHolding {
                    fund_name: fund_name.to_string(),
                    name: item.name.clone(),
                    stock_id,
                    weights: item.percentage_to_net_assets,
                    market_cap: mapper.market_cap(stock_name),
                    asset_class: asset_class.map(|s| s.to_string()),
                    sub_type: sub_type.map(|s| s.to_string()),
                });
            }
        }

        if !batch.is_empty() {
            tracing::info!(fund_name, items = batch.len(), "flattened holdings");
        }
        self.records.extend(batch.iter().cloned());
        batch
    }

    pub fn records(&self) -> &[FlatHolding] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Persist the accumulated batch as a pretty-printed JSON array and clear
    /// the buffer.
    pub fn save_json(&mut self, path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(&self.records)?;
        std::fs::write(path, json)?;

        tracing::info!(items = self.records.len(), path = %path.display(), "saved holdings");
        self.records.clear();
        Ok(())
    }
}

/// Load a previously persisted interchange file.
pub fn load_json(path: &Path) -> anyhow::Result<Vec<FlatHolding>> {
    let text = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&text)?)
}

/// Group flat records by fund name (ordered for deterministic iteration).
pub fn group_by_fund(records: Vec<FlatHolding>) -> BTreeMap<String, Vec<FlatHolding>> {
    let mut by_fund: BTreeMap<String, Vec<FlatHolding>> = BTreeMap::new();
    for record in records {
        by_fund.entry(record.fund_name.clone()).or_default().push(record);
    }
    by_fund
}

// ============================================================================
// Tests
// ============================================================================
