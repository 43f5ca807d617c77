//! Core domain types: assets, asset classes, and balance-text parsing.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Kind of financial product a configured holding is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProductType {
    Etf,
    IndexFund,
}

impl ProductType {
    pub fn label(&self) -> &'static str {
        match self {
            ProductType::Etf => "ETF",
            ProductType::IndexFund => "index fund",
        }
    }
}

impl fmt::Display for ProductType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Asset classes matching the Golden Butterfly portfolio structure.
///
/// Each class maps to a fixed label in the destination sheet's first column;
/// the updater only ever writes into the value column of a row whose label
/// matches one of these.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssetType {
    Cash,
    LongTermTreasury,
    Gold,
    SmallCapStocks,
    LargeCapStocks,
}

impl AssetType {
    /// All asset classes, in sheet order.
    pub const ALL: [AssetType; 5] = [
        AssetType::Cash,
        AssetType::LongTermTreasury,
        AssetType::Gold,
        AssetType::SmallCapStocks,
        AssetType::LargeCapStocks,
    ];

    /// The label used for this class in the destination sheet.
    pub fn sheet_label(&self) -> &'static str {
        match self {
            AssetType::Cash => "Cash",
            AssetType::LongTermTreasury => "Long-Term Treasury",
            AssetType::Gold => "Gold",
            AssetType::SmallCapStocks => "Small-Cap",
            AssetType::LargeCapStocks => "Large-Cap",
        }
    }
}

impl fmt::Display for AssetType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.sheet_label())
    }
}

/// A single scraped balance: where it came from, how much, and which
/// portfolio bucket it belongs to. Built by a site adapter during a run and
/// consumed once by the write step; never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Asset {
    pub name: String,
    pub amount: Decimal,
    pub asset_type: AssetType,
}

impl Asset {
    pub fn new(name: impl Into<String>, amount: Decimal, asset_type: AssetType) -> Self {
        Self {
            name: name.into(),
            amount,
            asset_type,
        }
    }
}

/// Sum scraped assets into one total per asset class.
///
/// `BTreeMap` keeps the output order deterministic, which keeps the batched
/// sheet update (and the tests) stable.
pub fn aggregate_by_type(assets: &[Asset]) -> BTreeMap<AssetType, Decimal> {
    let mut totals: BTreeMap<AssetType, Decimal> = BTreeMap::new();
    for asset in assets {
        *totals.entry(asset.asset_type).or_insert(Decimal::ZERO) += asset.amount;
    }
    totals
}

#[derive(Debug, Error)]
pub enum BalanceParseError {
    #[error("could not parse a balance out of {0:?}")]
    Unparseable(String),
}

/// Parse a balance figure out of rendered page text.
///
/// Bank UIs render amounts with currency symbols and locale-dependent
/// separators ("1.234,56 €", "€1,234.56", "1 234,56"). When both separators
/// appear, the rightmost one is the decimal mark. A lone separator followed
/// by exactly one or two digits is treated as the decimal mark; otherwise it
/// is grouping (so "1.234" reads as 1234).
pub fn parse_balance(raw: &str) -> Result<Decimal, BalanceParseError> {
    let cleaned: String = raw
        .chars()
        .filter(|c| c.is_ascii_digit() || matches!(c, '.' | ',' | '-'))
        .collect();

    if !cleaned.chars().any(|c| c.is_ascii_digit()) {
        return Err(BalanceParseError::Unparseable(raw.to_string()));
    }

    let last_dot = cleaned.rfind('.');
    let last_comma = cleaned.rfind(',');

    let normalized: String = match (last_dot, last_comma) {
        (Some(d), Some(c)) => {
            let (decimal_sep, grouping_sep) = if d > c { ('.', ',') } else { (',', '.') };
            cleaned
                .chars()
                .filter(|&ch| ch != grouping_sep)
                .map(|ch| if ch == decimal_sep { '.' } else { ch })
                .collect()
        }
        (Some(pos), None) | (None, Some(pos)) => {
            let sep = cleaned[pos..].chars().next().unwrap_or('.');
            let digits_after = cleaned.len() - pos - 1;
            let occurrences = cleaned.matches(sep).count();
            if occurrences == 1 && (1..=2).contains(&digits_after) {
                cleaned
                    .chars()
                    .map(|ch| if ch == sep { '.' } else { ch })
                    .collect()
            } else {
                cleaned.chars().filter(|&ch| ch != sep).collect()
            }
        }
        (None, None) => cleaned,
    };

    Decimal::from_str(&normalized)
        .map_err(|_| BalanceParseError::Unparseable(raw.to_string()))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_parse_european_format() {
        assert_eq!(parse_balance("1.234,56 €").unwrap(), dec!(1234.56));
        assert_eq!(parse_balance("12.345.678,90 €").unwrap(), dec!(12345678.90));
        assert_eq!(parse_balance("0,50 €").unwrap(), dec!(0.50));
    }

    #[test]
    fn test_parse_us_format() {
        assert_eq!(parse_balance("€1,234.56").unwrap(), dec!(1234.56));
        assert_eq!(parse_balance("$12,345,678.90").unwrap(), dec!(12345678.90));
    }

    #[test]
    fn test_parse_space_grouping() {
        assert_eq!(parse_balance("1 234,56").unwrap(), dec!(1234.56));
        assert_eq!(parse_balance("1 234").unwrap(), dec!(1234));
    }

    #[test]
    fn test_parse_lone_separator_heuristic() {
        // One separator with three trailing digits is grouping.
        assert_eq!(parse_balance("1.234").unwrap(), dec!(1234));
        assert_eq!(parse_balance("1,234").unwrap(), dec!(1234));
        // One or two trailing digits make it the decimal mark.
        assert_eq!(parse_balance("12,3").unwrap(), dec!(12.3));
        assert_eq!(parse_balance("12.34").unwrap(), dec!(12.34));
    }

    #[test]
    fn test_parse_plain_and_negative() {
        assert_eq!(parse_balance("1234").unwrap(), dec!(1234));
        assert_eq!(parse_balance("-42,10 €").unwrap(), dec!(-42.10));
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(parse_balance("").is_err());
        assert!(parse_balance("n/a").is_err());
        assert!(parse_balance("€ —").is_err());
    }

    #[test]
    fn test_aggregate_sums_per_class() {
        let assets = vec![
            Asset::new("TR Cash", dec!(100), AssetType::Cash),
            Asset::new("MI Cash", dec!(50.5), AssetType::Cash),
            Asset::new("Gold ETC", dec!(200), AssetType::Gold),
        ];

        let totals = aggregate_by_type(&assets);
        assert_eq!(totals.len(), 2);
        assert_eq!(totals[&AssetType::Cash], dec!(150.5));
        assert_eq!(totals[&AssetType::Gold], dec!(200));
    }

    #[test]
    fn test_aggregate_empty() {
        assert!(aggregate_by_type(&[]).is_empty());
    }

    #[test]
    fn test_product_type_labels() {
        assert_eq!(ProductType::Etf.to_string(), "ETF");
        assert_eq!(ProductType::IndexFund.to_string(), "index fund");
    }

    #[test]
    fn test_sheet_labels_unique() {
        let mut labels: Vec<_> = AssetType::ALL.iter().map(|t| t.sheet_label()).collect();
        labels.sort();
        labels.dedup();
        assert_eq!(labels.len(), AssetType::ALL.len());
    }
}
