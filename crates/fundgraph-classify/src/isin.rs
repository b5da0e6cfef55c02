//! Instrument identity resolution
//!
//! Maps free-text instrument names to ISINs and market-cap buckets using the
//! exchange master CSV. The same normalization is applied to load-time keys
//! and query-time lookups so that "HDFC Bank Ltd." and "hdfc bank limited"
//! resolve identically. A lookup miss is not an error; the caller decides
//! what a null identifier means.

use std::collections::HashMap;
use std::path::Path;

/// Normalized form used as the lookup key: lower-case, trimmed, HTML-escaped
/// ampersand unescaped, `ltd.`/`ltd` suffix variants replaced with `limited`.
pub fn normalize_company_name(name: &str) -> String {
    name.trim()
        .to_lowercase()
        .replace("&amp;", "&")
        .replace("ltd.", "limited")
        .replace("ltd", "limited")
}

/// ISIN and market-cap lookups keyed by normalized company name
#[derive(Debug, Default)]
pub struct IsinMapper {
    isin_by_name: HashMap<String, String>,
    cap_by_name: HashMap<String, String>,
}

impl IsinMapper {
    /// Empty mapper; every lookup returns `None`.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Load the reference master from CSV.
    ///
    /// Expected columns: "NAME OF COMPANY", "ISIN NUMBER", "MARKET CAP".
    /// A missing file is non-fatal: the mapper operates with empty mappings.
    pub fn from_csv_path(path: &Path) -> Self {
        let mut mapper = Self::default();

        if !path.exists() {
            tracing::warn!(path = %path.display(), "ISIN mapping file not found");
            return mapper;
        }

        let reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .flexible(true)
            .from_path(path);

        let mut reader = match reader {
            Ok(r) => r,
            Err(e) => {
                tracing::error!(error = %e, "error opening ISIN mapping");
                return mapper;
            }
        };

        let headers = match reader.headers() {
            Ok(h) => h.clone(),
            Err(e) => {
                tracing::error!(error = %e, "error reading ISIN mapping headers");
                return mapper;
            }
        };
        let col = |name: &str| headers.iter().position(|h| h == name);
        let (name_col, isin_col, cap_col) = (
            col("NAME OF COMPANY"),
            col("ISIN NUMBER"),
            col("MARKET CAP"),
        );

        for record in reader.records() {
            let record = match record {
                Ok(r) => r,
                Err(e) => {
                    tracing::warn!(error = %e, "skipping malformed ISIN mapping row");
                    continue;
                }
            };

            let field = |idx: Option<usize>| {
                idx.and_then(|i| record.get(i))
                    .map(|s| s.trim().to_string())
                    .unwrap_or_default()
            };

            let company = normalize_company_name(&field(name_col));
            let isin = field(isin_col);
            let market_cap = field(cap_col);

            if !company.is_empty() && !isin.is_empty() {
                mapper.isin_by_name.insert(company.clone(), isin);
            }
            if !company.is_empty() && !market_cap.is_empty() {
                mapper.cap_by_name.insert(company, market_cap);
            }
        }

        tracing::info!(mappings = mapper.isin_by_name.len(), "loaded ISIN mappings");
        mapper
    }

    /// Insert a mapping directly (tests, programmatic loads).
    pub fn insert(&mut self, company_name: &str, isin: &str, market_cap: Option<&str>) {
        let key = normalize_company_name(company_name);
        self.isin_by_name.insert(key.clone(), isin.to_string());
        if let Some(cap) = market_cap {
            self.cap_by_name.insert(key, cap.to_string());
        }
    }

    /// Resolve a stock name to its ISIN; `None` on miss.
    pub fn resolve(&self, stock_name: &str) -> Option<String> {
        if stock_name.is_empty() || self.isin_by_name.is_empty() {
            return None;
        }

        let isin = self.isin_by_name.get(&normalize_company_name(stock_name));
        if isin.is_none() {
            tracing::warn!(stock_name, "ISIN not found");
        }
        isin.cloned()
    }

    /// Market-cap bucket for a stock name; `None` on miss.
    pub fn market_cap(&self, stock_name: &str) -> Option<String> {
        if stock_name.is_empty() || self.cap_by_name.is_empty() {
            return None;
        }
        self.cap_by_name
            .get(&normalize_company_name(stock_name))
            .cloned()
    }

    pub fn len(&self) -> usize {
        self.isin_by_name.len()
    }

    pub fn is_empty(&self) -> bool {
        self.isin_by_name.is_empty()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn normalization_handles_suffix_and_escapes() {
        assert_eq!(normalize_company_name("HDFC Bank Ltd."), "hdfc bank limited");
        assert_eq!(normalize_company_name(" HDFC Bank Ltd "), "hdfc bank limited");
        assert_eq!(
            normalize_company_name("L&amp;T Finance Ltd."),
            "l&t finance limited"
        );
        assert_eq!(normalize_company_name("hdfc bank limited"), "hdfc bank limited");
    }

    #[test]
    fn suffix_variants_resolve_to_same_isin() {
        let mut mapper = IsinMapper::empty();
        mapper.insert("hdfc bank limited", "INE040A01034", Some("Large Cap"));

        assert_eq!(
            mapper.resolve("HDFC Bank Ltd.").as_deref(),
            Some("INE040A01034")
        );
        assert_eq!(
            mapper.resolve("hdfc bank limited").as_deref(),
            Some("INE040A01034")
        );
        assert_eq!(mapper.market_cap("HDFC Bank Ltd").as_deref(), Some("Large Cap"));
    }

    #[test]
    fn lookup_miss_is_none_not_error() {
        let mut mapper = IsinMapper::empty();
        mapper.insert("hdfc bank limited", "INE040A01034", None);

        assert_eq!(mapper.resolve("Unknown Corp"), None);
        assert_eq!(mapper.market_cap("hdfc bank limited"), None);
    }

    #[test]
    fn missing_file_yields_empty_mapper() {
        let mapper = IsinMapper::from_csv_path(Path::new("/nonexistent/isin.csv"));
        assert!(mapper.is_empty());
        assert_eq!(mapper.resolve("HDFC Bank Ltd"), None);
    }

    #[test]
    fn loads_reference_csv() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "NAME OF COMPANY,ISIN NUMBER,MARKET CAP").unwrap();
        writeln!(file, "HDFC Bank Ltd.,INE040A01034,Large Cap").unwrap();
        writeln!(file, "ICICI Bank Ltd,INE090A01021,Large Cap").unwrap();
        writeln!(file, ",INE000000000,").unwrap();
        file.flush().unwrap();

        let mapper = IsinMapper::from_csv_path(file.path());
        assert_eq!(mapper.len(), 2);
        assert_eq!(
            mapper.resolve("icici bank limited").as_deref(),
            Some("INE090A01021")
        );
    }
}
