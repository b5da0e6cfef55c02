//! Asset taxonomy
//!
//! Static schema of allowed (group, sub-group) pairs. Consulted for
//! validation only: oracle output with an invalid combination is not rejected
//! at flattening time, callers opt into strictness.

pub const EQUITY_GROUP: &str = "EQUITY & EQUITY RELATED";

/// Valid sub-groups for a top-level group name; empty for unknown groups.
pub fn valid_subgroups(group_name: &str) -> &'static [&'static str] {
    match group_name {
        "EQUITY & EQUITY RELATED" => &[
            "Indian Equity",
            "Preferential Shares",
            "Foreign Equity",
            "REIT/INVIT",
            "Mutual Fund Units",
            "Index Options",
            "Stock Options",
            "Stock Futures",
            "Gold ETF",
            "Silver ETF",
        ],
        "CORPORATE DEBT" => &[
            "Corporate Bonds",
            "Non Convertible Debentures",
            "Convertible Debentures",
            "Pass Through Certificates",
            "Reduced Face Value Bonds - Non Amortisation",
            "Credit Exposure",
            "Zero Coupon Bond",
        ],
        "GOVERNMENT SECURITIES" => &[
            "Government Bonds",
            "State Government Bonds",
            "Treasury Bills",
        ],
        "SECURITISED DEBT" => &["Securitised Debt", "Pass Through Certificate"],
        "MONEY MARKET INSTRUMENTS" => &[
            "Certificate of Deposit",
            "Commercial Paper",
            "TREPS and Others",
        ],
        "OTHER" => &["Commodity"],
        _ => &[],
    }
}

/// A `(group, sub_group)` pair is valid iff the sub-group appears in that
/// group's list.
pub fn validate_classification(group_name: &str, sub_group: &str) -> bool {
    valid_subgroups(group_name).contains(&sub_group)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_pairs_validate() {
        assert!(validate_classification(EQUITY_GROUP, "Indian Equity"));
        assert!(validate_classification(
            "MONEY MARKET INSTRUMENTS",
            "TREPS and Others"
        ));
        assert!(validate_classification("OTHER", "Commodity"));
    }

    #[test]
    fn cross_group_pairs_are_invalid() {
        assert!(!validate_classification(EQUITY_GROUP, "Treasury Bills"));
        assert!(!validate_classification(
            "GOVERNMENT SECURITIES",
            "Indian Equity"
        ));
    }

    #[test]
    fn unknown_group_has_no_subgroups() {
        assert!(valid_subgroups("DERIVATIVES").is_empty());
        assert!(!validate_classification("DERIVATIVES", "Stock Futures"));
    }
}
