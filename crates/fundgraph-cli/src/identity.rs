//! Fund identity derivation
//!
//! Interchange records carry only the detected fund name; the graph model
//! needs stable integer ids. The id is derived from a SHA-256 digest of the
//! fund name, truncated to 8 decimal digits, so repeated loads of the same
//! fund always hit the same node.

use sha2::{Digest, Sha256};

use fundgraph_classify::FlatHolding;

/// Deterministic fund id for a fund name (8 decimal digits).
pub fn fund_id_for(fund_name: &str) -> i64 {
    let digest = Sha256::digest(fund_name.as_bytes());
    let mut prefix = [0u8; 8];
    prefix.copy_from_slice(&digest[..8]);
    (u64::from_be_bytes(prefix) % 100_000_000) as i64
}

/// Snapshot id: `{year}{month:02}{fund_id}`.
pub fn snapshot_id_for(year: i32, month: u32, fund_id: i64) -> String {
    format!("{}{:02}{}", year, month, fund_id)
}

/// AMC estimated as the first whitespace token of the fund name.
pub fn amc_for(fund_name: &str) -> String {
    fund_name
        .split_whitespace()
        .next()
        .unwrap_or("Unknown")
        .to_string()
}

/// Placeholder AUM: 10x the sum of the holding weights. The factsheet's real
/// AUM figure is not extracted by this pipeline.
pub fn estimate_total_aum(holdings: &[FlatHolding]) -> f64 {
    holdings.iter().filter_map(|h| h.weights).sum::<f64>() * 10.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fund_id_is_stable_and_bounded() {
        let a = fund_id_for("Alpha Bluechip Fund");
        let b = fund_id_for("Alpha Bluechip Fund");
        assert_eq!(a, b);
        assert!((0..100_000_000).contains(&a));
        assert_ne!(a, fund_id_for("Beta Bluechip Fund"));
    }

    #[test]
    fn snapshot_id_zero_pads_month() {
        assert_eq!(snapshot_id_for(2025, 1, 9109), "2025019109");
        assert_eq!(snapshot_id_for(2025, 12, 9109), "2025129109");
    }

    #[test]
    fn amc_is_first_token() {
        assert_eq!(amc_for("HDFC Flexi Cap Fund"), "HDFC");
        assert_eq!(amc_for(""), "Unknown");
    }
}
