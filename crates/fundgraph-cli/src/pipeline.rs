//! Document pipeline
//!
//! Composes the stages for one document end-to-end: layout analysis ->
//! table reconciliation -> LLM cleaning -> flattening with identity
//! resolution. Batch mode walks a directory and keeps going past
//! per-document failures; graph loading consumes the persisted interchange
//! file fund by fund with the same continue-on-error policy.

use std::path::Path;

use anyhow::{Context, Result};

use fundgraph_classify::{
    group_by_fund, load_json, FlatHolding, HoldingsAccumulator, IsinMapper, TableCleaner,
};
use fundgraph_extract::{extract_fund_tables, grid_to_markdown, LayoutProvider};
use fundgraph_store::{HoldingInput, PortfolioLoad, PortfolioStore};

use crate::identity::{amc_for, estimate_total_aum, fund_id_for, snapshot_id_for};

/// Per-directory batch result
#[derive(Debug, Default, Clone)]
pub struct BatchOutcome {
    pub processed: usize,
    pub failed: usize,
}

/// One document-processing run: extraction through flattening
pub struct DocumentPipeline {
    layout: Box<dyn LayoutProvider>,
    cleaner: Box<dyn TableCleaner>,
    mapper: IsinMapper,
    accumulator: HoldingsAccumulator,
}

impl DocumentPipeline {
    pub fn new(
        layout: Box<dyn LayoutProvider>,
        cleaner: Box<dyn TableCleaner>,
        mapper: IsinMapper,
    ) -> Self {
        Self {
            layout,
            cleaner,
            mapper,
            accumulator: HoldingsAccumulator::new(),
        }
    }

    /// Process one factsheet: returns the number of flat records added.
    ///
    /// Any per-table cleaning failure (transport or parse) is recovered as
    /// zero holdings for that table and processing moves to the next one;
    /// only an unreadable input or a failed layout analysis fails the
    /// document.
    pub async fn process_document(&mut self, path: &Path) -> Result<usize> {
        tracing::info!(path = %path.display(), "extracting tables");

        let bytes = std::fs::read(path)
            .with_context(|| format!("failed to read document {}", path.display()))?;
        let layout = self.layout.analyze(&bytes).await?;
        let fund_tables = extract_fund_tables(&layout);

        let mut added = 0;
        for (fund_name, tables) in &fund_tables {
            for table in tables {
                tracing::info!(%fund_name, rows = table.len(), "cleaning table");
                let groups = match self.cleaner.clean_table(&grid_to_markdown(table)).await {
                    Ok(groups) => groups,
                    Err(e) => {
                        tracing::warn!(%fund_name, error = %e, "table cleaning failed, skipping table");
                        continue;
                    }
                };
                added += self
                    .accumulator
                    .flatten_groups(fund_name, &groups, &self.mapper)
                    .len();
            }
        }

        tracing::info!(path = %path.display(), records = added, "document processed");
        Ok(added)
    }

    /// Process every `*.pdf` in a directory; one document's failure is
    /// logged and the loop continues.
    pub async fn process_directory(&mut self, dir: &Path) -> Result<BatchOutcome> {
        let mut pdfs: Vec<_> = walkdir::WalkDir::new(dir)
            .max_depth(1)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| {
                e.path()
                    .extension()
                    .is_some_and(|ext| ext.eq_ignore_ascii_case("pdf"))
            })
            .map(|e| e.path().to_path_buf())
            .collect();
        pdfs.sort();

        if pdfs.is_empty() {
            tracing::warn!(dir = %dir.display(), "no PDF files found");
            return Ok(BatchOutcome::default());
        }
        tracing::info!(count = pdfs.len(), "found PDF files to process");

        let mut outcome = BatchOutcome::default();
        for pdf in &pdfs {
            match self.process_document(pdf).await {
                Ok(_) => outcome.processed += 1,
                Err(e) => {
                    tracing::error!(path = %pdf.display(), error = %e, "error processing document");
                    outcome.failed += 1;
                }
            }
        }

        Ok(outcome)
    }

    pub fn records(&self) -> &[FlatHolding] {
        self.accumulator.records()
    }

    /// Persist the accumulated interchange file and clear the buffer.
    pub fn save(&mut self, path: &Path) -> Result<()> {
        self.accumulator.save_json(path)
    }
}

// ============================================================================
// Graph loading from the interchange file
// ============================================================================

fn to_holding_input(h: &FlatHolding) -> HoldingInput {
    HoldingInput {
        name: h.name.clone(),
        stock_id: h.stock_id.clone(),
        weights: h.weights,
        asset_class: h.asset_class.clone(),
        sub_type: h.sub_type.clone(),
        ..Default::default()
    }
}

/// Load a persisted interchange file into the graph, one fund at a time.
///
/// Per-fund failures are logged and the loop continues; returns
/// (loaded, failed) fund counts.
pub async fn load_holdings_file(
    store: &PortfolioStore,
    path: &Path,
    year: i32,
    month: u32,
) -> Result<(usize, usize)> {
    let records = load_json(path)
        .with_context(|| format!("failed to read holdings file {}", path.display()))?;
    if records.is_empty() {
        tracing::warn!(path = %path.display(), "no data found in holdings file");
        return Ok((0, 0));
    }

    let by_fund = group_by_fund(records);
    tracing::info!(funds = by_fund.len(), "loading funds into graph");

    let mut loaded = 0;
    let mut failed = 0;
    for (fund_name, fund_holdings) in &by_fund {
        let fund_id = fund_id_for(fund_name);
        let load = PortfolioLoad {
            fund_id,
            fund_name: fund_name.clone(),
            amc: amc_for(fund_name),
            category: None,
            snapshot_id: snapshot_id_for(year, month, fund_id),
            year,
            month,
            total_aum: estimate_total_aum(fund_holdings),
        };
        let holdings: Vec<HoldingInput> = fund_holdings.iter().map(to_holding_input).collect();

        match store.load_portfolio(&load, &holdings).await {
            Ok(summary) => {
                tracing::info!(
                    %fund_name,
                    holdings = summary.holdings_created,
                    "loaded fund"
                );
                loaded += 1;
            }
            Err(e) => {
                tracing::error!(%fund_name, error = %e, "error loading fund");
                failed += 1;
            }
        }
    }

    Ok((loaded, failed))
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use fundgraph_classify::{HoldingGroup, HoldingItem, MockTableCleaner};
    use fundgraph_extract::{FixtureLayoutProvider, LayoutPage, LayoutResult, LayoutTable};

    fn fixture_layout() -> LayoutResult {
        LayoutResult {
            pages: vec![LayoutPage {
                page_number: 1,
                lines: vec!["Alpha".to_string(), "Bluechip Fund".to_string()],
            }],
            tables: vec![LayoutTable::new(2, 2, Some(1))
                .with_cell(0, 0, "Security")
                .with_cell(0, 1, "% NAV")
                .with_cell(1, 0, "HDFC Bank Ltd.")
                .with_cell(1, 1, "9.18")],
        }
    }

    fn canned_groups() -> Vec<HoldingGroup> {
        vec![HoldingGroup {
            group_name: Some("EQUITY & EQUITY RELATED".to_string()),
            sub_group: Some("Indian Equity".to_string()),
            items: vec![HoldingItem {
                name: Some("HDFC Bank Ltd.".to_string()),
                percentage_to_net_assets: Some(9.18),
            }],
        }]
    }

    #[tokio::test]
    async fn pipeline_flattens_one_document() {
        let mut mapper = IsinMapper::empty();
        mapper.insert("hdfc bank limited", "INE040A01034", Some("Large Cap"));

        let mut pipeline = DocumentPipeline::new(
            Box::new(FixtureLayoutProvider::new(fixture_layout())),
            Box::new(MockTableCleaner::new(canned_groups())),
            mapper,
        );

        let dir = tempfile::tempdir().unwrap();
        let doc = dir.path().join("factsheet.pdf");
        std::fs::write(&doc, b"%PDF-1.4 stub").unwrap();

        let added = pipeline.process_document(&doc).await.unwrap();
        assert_eq!(added, 1);

        let records = pipeline.records();
        assert_eq!(records[0].fund_name, "Alpha Bluechip Fund");
        assert_eq!(records[0].stock_id.as_deref(), Some("INE040A01034"));
    }

    /// Errors on the first call, returns canned groups afterwards.
    struct FlakyCleaner {
        calls: std::sync::Mutex<usize>,
        groups: Vec<HoldingGroup>,
    }

    #[async_trait::async_trait]
    impl fundgraph_classify::TableCleaner for FlakyCleaner {
        async fn clean_table(
            &self,
            _table_markdown: &str,
        ) -> Result<Vec<HoldingGroup>, fundgraph_classify::CleanError> {
            let mut calls = self.calls.lock().unwrap();
            *calls += 1;
            if *calls == 1 {
                return Err(fundgraph_classify::CleanError::Network(
                    "connection reset".to_string(),
                ));
            }
            Ok(self.groups.clone())
        }
    }

    #[tokio::test]
    async fn cleaner_failure_skips_table_and_continues() {
        let mut layout = fixture_layout();
        layout.pages.push(LayoutPage {
            page_number: 2,
            lines: vec!["Beta".to_string(), "Liquid Fund".to_string()],
        });
        layout.tables.push(
            LayoutTable::new(2, 2, Some(2))
                .with_cell(0, 0, "Security")
                .with_cell(0, 1, "% NAV")
                .with_cell(1, 0, "ICICI Bank Ltd")
                .with_cell(1, 1, "7.02"),
        );

        let mut pipeline = DocumentPipeline::new(
            Box::new(FixtureLayoutProvider::new(layout)),
            Box::new(FlakyCleaner {
                calls: std::sync::Mutex::new(0),
                groups: canned_groups(),
            }),
            IsinMapper::empty(),
        );

        let dir = tempfile::tempdir().unwrap();
        let doc = dir.path().join("factsheet.pdf");
        std::fs::write(&doc, b"%PDF-1.4 stub").unwrap();

        // The first fund's table fails to clean; the second still lands.
        let added = pipeline.process_document(&doc).await.unwrap();
        assert_eq!(added, 1);
        assert_eq!(pipeline.records()[0].fund_name, "Beta Liquid Fund");
    }

    #[tokio::test]
    async fn batch_picks_up_only_pdfs() {
        let mut pipeline = DocumentPipeline::new(
            Box::new(FixtureLayoutProvider::new(fixture_layout())),
            Box::new(MockTableCleaner::empty()),
            IsinMapper::empty(),
        );

        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.pdf"), b"%PDF a").unwrap();
        std::fs::write(dir.path().join("b.pdf"), b"%PDF b").unwrap();
        std::fs::write(dir.path().join("notes.txt"), b"ignored").unwrap();

        let outcome = pipeline.process_directory(dir.path()).await.unwrap();
        assert_eq!(outcome.processed, 2);
        assert_eq!(outcome.failed, 0);
    }
}
