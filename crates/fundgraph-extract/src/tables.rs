//! Table reconciliation
//!
//! Grid materialization, fund-name detection, and continuation merge.
//! Header comparison during merging is exact tuple equality of the stringified
//! cells: OCR noise in a header (extra space, case difference) produces two
//! separate tables instead of one. That fragility is load-bearing for
//! compatibility with downstream consumers and must not be "fixed" here.

use std::collections::BTreeMap;

use crate::layout::{LayoutPage, LayoutResult, LayoutTable};

/// Dense rows x columns grid of trimmed cell text
pub type TableGrid = Vec<Vec<String>>;

/// Materialize a sparse table into a dense grid.
///
/// Cells not present in the layout result default to the empty string.
/// Out-of-range cell records are ignored.
pub fn materialize_grid(table: &LayoutTable) -> TableGrid {
    let mut grid = vec![vec![String::new(); table.column_count]; table.row_count];
    for cell in &table.cells {
        if cell.row_index < table.row_count && cell.column_index < table.column_count {
            grid[cell.row_index][cell.column_index] = cell.content.trim().to_string();
        }
    }
    grid
}

/// Detect the fund name for a page.
///
/// Scans the page lines in order for the first line containing "fund"
/// (case-insensitive); the immediately preceding line, when present, is
/// prepended and whitespace is collapsed. Falls back to the page's first
/// line; a page with no lines has no fund name.
pub fn detect_fund_name(pages: &[LayoutPage], page_number: u32) -> Option<String> {
    let page = pages.iter().find(|p| p.page_number == page_number)?;

    for (idx, line) in page.lines.iter().enumerate() {
        if line.to_lowercase().contains("fund") {
            let combined = if idx > 0 {
                format!("{} {}", page.lines[idx - 1].trim(), line.trim())
            } else {
                line.trim().to_string()
            };
            return Some(collapse_whitespace(&combined));
        }
    }

    page.lines.first().map(|l| l.trim().to_string())
}

fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Reconcile all detected tables into `fund name -> logical tables`.
///
/// Tables are grouped by the page they start on (ascending), the page's fund
/// name is attached to every table on it, and adjacent tables with identical
/// header rows are merged into one logical table. Only adjacent tables on the
/// same page are merge candidates; there is no cross-page merge and no
/// look-ahead past a non-matching table. Pages without a detected fund name
/// contribute nothing.
pub fn extract_fund_tables(result: &LayoutResult) -> BTreeMap<String, Vec<TableGrid>> {
    // Group tables by starting page, in discovery order within a page.
    let mut tables_by_page: BTreeMap<u32, Vec<TableGrid>> = BTreeMap::new();
    for table in &result.tables {
        let Some(page) = table.page_number else {
            continue;
        };
        tables_by_page
            .entry(page)
            .or_default()
            .push(materialize_grid(table));
    }

    let mut tables_by_fund: BTreeMap<String, Vec<TableGrid>> = BTreeMap::new();

    for (page, grids) in &tables_by_page {
        let fund_name = match detect_fund_name(&result.pages, *page) {
            Some(name) if !name.is_empty() => name,
            _ => {
                tracing::warn!(page = *page, "no fund name detected, dropping page tables");
                continue;
            }
        };

        let mut i = 0;
        while i < grids.len() {
            let mut merged = grids[i].clone();
            let header = grids[i].first().cloned();

            let mut j = i + 1;
            while j < grids.len() {
                if header.is_some() && grids[j].first() == header.as_ref() {
                    merged.extend(grids[j].iter().skip(1).cloned());
                    j += 1;
                } else {
                    break;
                }
            }

            tables_by_fund
                .entry(fund_name.clone())
                .or_default()
                .push(merged);
            i = j;
        }
    }

    tables_by_fund
}

/// Render a grid as a markdown table for the LLM cleaner.
///
/// The first row is treated as the header; an all-empty grid renders to an
/// empty string.
pub fn grid_to_markdown(grid: &TableGrid) -> String {
    let Some(header) = grid.first() else {
        return String::new();
    };

    let mut out = String::new();
    out.push_str(&format!("| {} |\n", header.join(" | ")));
    out.push_str(&format!(
        "|{}\n",
        header.iter().map(|_| "---|").collect::<String>()
    ));
    for row in grid.iter().skip(1) {
        out.push_str(&format!("| {} |\n", row.join(" | ")));
    }
    out
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::LayoutTable;

    fn page(number: u32, lines: &[&str]) -> LayoutPage {
        LayoutPage {
            page_number: number,
            lines: lines.iter().map(|l| l.to_string()).collect(),
        }
    }

    fn two_col_table(page_number: u32, rows: &[(&str, &str)]) -> LayoutTable {
        let mut table = LayoutTable::new(rows.len(), 2, Some(page_number));
        for (i, (a, b)) in rows.iter().enumerate() {
            table = table.with_cell(i, 0, a).with_cell(i, 1, b);
        }
        table
    }

    #[test]
    fn grid_fills_missing_cells_with_empty_strings() {
        let table = LayoutTable::new(2, 3, Some(1))
            .with_cell(0, 0, " Security ")
            .with_cell(1, 2, "9.18");
        let grid = materialize_grid(&table);

        assert_eq!(grid[0], vec!["Security", "", ""]);
        assert_eq!(grid[1], vec!["", "", "9.18"]);
    }

    #[test]
    fn fund_name_joins_previous_line() {
        let pages = vec![page(1, &["ABC", "XYZ Fund - Direct Plan", "footer"])];
        assert_eq!(
            detect_fund_name(&pages, 1).as_deref(),
            Some("ABC XYZ Fund - Direct Plan")
        );
    }

    #[test]
    fn fund_name_on_first_line_has_no_prefix() {
        let pages = vec![page(1, &["Alpha Fund", "something else"])];
        assert_eq!(detect_fund_name(&pages, 1).as_deref(), Some("Alpha Fund"));
    }

    #[test]
    fn fund_name_falls_back_to_first_line() {
        let pages = vec![page(1, &["Monthly Factsheet", "January 2025"])];
        assert_eq!(
            detect_fund_name(&pages, 1).as_deref(),
            Some("Monthly Factsheet")
        );
    }

    #[test]
    fn fund_name_is_none_for_empty_page() {
        let pages = vec![page(1, &[])];
        assert_eq!(detect_fund_name(&pages, 1), None);
        assert_eq!(detect_fund_name(&pages, 2), None);
    }

    #[test]
    fn fund_name_collapses_whitespace() {
        let pages = vec![page(1, &["ABC  Capital", "Bluechip   Fund"])];
        assert_eq!(
            detect_fund_name(&pages, 1).as_deref(),
            Some("ABC Capital Bluechip Fund")
        );
    }

    #[test]
    fn adjacent_tables_with_identical_headers_merge() {
        let result = LayoutResult {
            pages: vec![page(1, &["Alpha Fund"])],
            tables: vec![
                two_col_table(1, &[("Security", "% NAV"), ("HDFC Bank", "9.18")]),
                two_col_table(1, &[("Security", "% NAV"), ("ICICI Bank", "7.00")]),
            ],
        };

        let by_fund = extract_fund_tables(&result);
        let tables = &by_fund["Alpha Fund"];
        assert_eq!(tables.len(), 1);
        assert_eq!(tables[0].len(), 3);
        assert_eq!(tables[0][1][0], "HDFC Bank");
        assert_eq!(tables[0][2][0], "ICICI Bank");
    }

    #[test]
    fn intervening_table_with_different_header_blocks_merge() {
        let result = LayoutResult {
            pages: vec![page(1, &["Alpha Fund"])],
            tables: vec![
                two_col_table(1, &[("Security", "% NAV"), ("HDFC Bank", "9.18")]),
                two_col_table(1, &[("Sector", "Weight"), ("Banking", "30.0")]),
                two_col_table(1, &[("Security", "% NAV"), ("ICICI Bank", "7.00")]),
            ],
        };

        let by_fund = extract_fund_tables(&result);
        // No look-ahead past the sector table: three separate logical tables.
        assert_eq!(by_fund["Alpha Fund"].len(), 3);
    }

    #[test]
    fn header_comparison_is_exact() {
        // Extra space inside a header cell survives trimming and prevents the merge.
        let result = LayoutResult {
            pages: vec![page(1, &["Alpha Fund"])],
            tables: vec![
                two_col_table(1, &[("Security", "% NAV"), ("HDFC Bank", "9.18")]),
                two_col_table(1, &[("Security", "%  NAV"), ("ICICI Bank", "7.00")]),
            ],
        };

        let by_fund = extract_fund_tables(&result);
        assert_eq!(by_fund["Alpha Fund"].len(), 2);
    }

    #[test]
    fn no_cross_page_merge() {
        let result = LayoutResult {
            pages: vec![page(1, &["Alpha Fund"]), page(2, &["Alpha Fund"])],
            tables: vec![
                two_col_table(1, &[("Security", "% NAV"), ("HDFC Bank", "9.18")]),
                two_col_table(2, &[("Security", "% NAV"), ("ICICI Bank", "7.00")]),
            ],
        };

        let by_fund = extract_fund_tables(&result);
        assert_eq!(by_fund["Alpha Fund"].len(), 2);
    }

    #[test]
    fn pages_without_fund_name_contribute_nothing() {
        let result = LayoutResult {
            pages: vec![page(1, &[])],
            tables: vec![two_col_table(1, &[("Security", "% NAV"), ("HDFC", "1.0")])],
        };

        assert!(extract_fund_tables(&result).is_empty());
    }

    #[test]
    fn markdown_rendering_keeps_header_and_rows() {
        let grid = vec![
            vec!["Security".to_string(), "% NAV".to_string()],
            vec!["HDFC Bank".to_string(), "9.18".to_string()],
        ];
        let md = grid_to_markdown(&grid);
        assert!(md.starts_with("| Security | % NAV |\n"));
        assert!(md.contains("| HDFC Bank | 9.18 |"));
    }
}
