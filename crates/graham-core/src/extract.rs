//! Keyword lookup of numeric fields in provider rows.

use serde::{Deserialize, Serialize};

use crate::domain::{FinancialRow, Fundamentals, MarketData};

/// Amount of the first value point of the first row whose name contains any
/// keyword, compared case-insensitively, in row order.
///
/// Rows without a name are ignored. Matching rows without value points are
/// passed over so a later matching row can still answer. Anything missing or
/// malformed yields `0.0`.
pub fn extract_amount<S: AsRef<str>>(rows: &[FinancialRow], keywords: &[S]) -> f64 {
    let keywords: Vec<String> = keywords
        .iter()
        .map(|keyword| keyword.as_ref().trim().to_uppercase())
        .filter(|keyword| !keyword.is_empty())
        .collect();
    if keywords.is_empty() {
        return 0.0;
    }

    for row in rows {
        let Some(name) = row.name.as_deref().filter(|name| !name.trim().is_empty()) else {
            continue;
        };
        let name = name.to_uppercase();
        if !keywords.iter().any(|keyword| name.contains(keyword.as_str())) {
            continue;
        }
        if row.values.is_empty() {
            continue;
        }
        return row.first_amount().unwrap_or(0.0);
    }

    0.0
}

/// Canonical fields the extractor knows how to look up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    Eps,
    Bvps,
    Roe,
    Der,
    Npm,
    Price,
    MarketCap,
    Volume,
    Per,
    Pbv,
}

impl Field {
    pub const ALL: [Self; 10] = [
        Self::Eps,
        Self::Bvps,
        Self::Roe,
        Self::Der,
        Self::Npm,
        Self::Price,
        Self::MarketCap,
        Self::Volume,
        Self::Per,
        Self::Pbv,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Eps => "eps",
            Self::Bvps => "bvps",
            Self::Roe => "roe",
            Self::Der => "der",
            Self::Npm => "npm",
            Self::Price => "price",
            Self::MarketCap => "market_cap",
            Self::Volume => "volume",
            Self::Per => "per",
            Self::Pbv => "pbv",
        }
    }
}

fn words(items: &[&str]) -> Vec<String> {
    items.iter().map(|item| (*item).to_owned()).collect()
}

/// Canonical field to keyword alternatives, loadable from the `[keywords]`
/// config table. Fields missing from the table keep their defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FieldKeywords {
    pub eps: Vec<String>,
    pub bvps: Vec<String>,
    pub roe: Vec<String>,
    pub der: Vec<String>,
    pub npm: Vec<String>,
    pub price: Vec<String>,
    pub market_cap: Vec<String>,
    pub volume: Vec<String>,
    pub per: Vec<String>,
    pub pbv: Vec<String>,
}

impl Default for FieldKeywords {
    fn default() -> Self {
        Self {
            eps: words(&["EPS", "EARNING PER SHARE"]),
            bvps: words(&["BVPS", "BOOK VALUE"]),
            roe: words(&["ROE", "RETURN ON EQUITY"]),
            der: words(&["DER", "DEBT TO EQUITY"]),
            npm: words(&["NPM", "NET PROFIT"]),
            price: words(&["CLOSE", "PRICE", "HARGA"]),
            market_cap: words(&["MARKET CAP"]),
            volume: words(&["VOLUME"]),
            per: words(&["PER", "PRICE EARNING"]),
            pbv: words(&["PBV", "PRICE TO BOOK"]),
        }
    }
}

impl FieldKeywords {
    pub fn for_field(&self, field: Field) -> &[String] {
        match field {
            Field::Eps => &self.eps,
            Field::Bvps => &self.bvps,
            Field::Roe => &self.roe,
            Field::Der => &self.der,
            Field::Npm => &self.npm,
            Field::Price => &self.price,
            Field::MarketCap => &self.market_cap,
            Field::Volume => &self.volume,
            Field::Per => &self.per,
            Field::Pbv => &self.pbv,
        }
    }

    /// Fields whose keyword list is empty or blank.
    pub fn empty_fields(&self) -> Vec<Field> {
        Field::ALL
            .into_iter()
            .filter(|field| {
                self.for_field(*field)
                    .iter()
                    .all(|keyword| keyword.trim().is_empty())
            })
            .collect()
    }
}

/// Extractor bound to one report's rows.
#[derive(Debug, Clone, Copy)]
pub struct RowExtractor<'a> {
    rows: &'a [FinancialRow],
    keywords: &'a FieldKeywords,
}

impl<'a> RowExtractor<'a> {
    pub const fn new(rows: &'a [FinancialRow], keywords: &'a FieldKeywords) -> Self {
        Self { rows, keywords }
    }

    pub fn get(&self, field: Field) -> f64 {
        extract_amount(self.rows, self.keywords.for_field(field))
    }

    pub fn fundamentals(&self) -> Fundamentals {
        Fundamentals {
            eps: self.get(Field::Eps),
            bvps: self.get(Field::Bvps),
            roe: self.get(Field::Roe),
            der: self.get(Field::Der),
            npm: self.get(Field::Npm),
        }
    }

    pub fn market_data(&self) -> MarketData {
        MarketData {
            price: self.get(Field::Price),
            market_cap: self.get(Field::MarketCap),
            volume: self.get(Field::Volume),
            per: self.get(Field::Per),
            pbv: self.get(Field::Pbv),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(name: &str, amounts: &[f64]) -> FinancialRow {
        FinancialRow::new(name, amounts.iter().copied())
    }

    #[test]
    fn matches_keyword_case_insensitively() {
        let rows = vec![row("Earning Per Share (Rp)", &[123.4])];

        assert_eq!(extract_amount(&rows, &["EPS", "EARNING PER SHARE"]), 123.4);
        assert_eq!(extract_amount(&rows, &["earning per share"]), 123.4);
    }

    #[test]
    fn missing_data_defaults_to_zero() {
        let rows = vec![row("Revenue", &[10.0])];
        let empty: Vec<FinancialRow> = Vec::new();
        let no_keywords: [&str; 0] = [];

        assert_eq!(extract_amount(&rows, &["EPS"]), 0.0);
        assert_eq!(extract_amount(&empty, &["EPS"]), 0.0);
        assert_eq!(extract_amount(&rows, &no_keywords), 0.0);
        assert_eq!(extract_amount(&rows, &["  "]), 0.0);
    }

    #[test]
    fn first_matching_row_wins() {
        let rows = vec![row("EPS (Annualised)", &[7.0]), row("EPS", &[3.0])];

        assert_eq!(extract_amount(&rows, &["EPS"]), 7.0);
    }

    #[test]
    fn unnamed_and_valueless_rows_are_passed_over() {
        let rows = vec![
            FinancialRow {
                name: None,
                values: vec![crate::domain::ValuePoint::new(1.0)],
            },
            row("", &[2.0]),
            row("Book Value per Share", &[]),
            row("BVPS", &[4500.0]),
        ];

        assert_eq!(extract_amount(&rows, &["BVPS", "BOOK VALUE"]), 4500.0);
        assert_eq!(extract_amount(&rows[..3], &["BVPS", "BOOK VALUE"]), 0.0);
    }

    #[test]
    fn first_point_without_amount_is_zero() {
        let rows = vec![FinancialRow {
            name: Some(String::from("ROE")),
            values: vec![crate::domain::ValuePoint::default()],
        }];

        assert_eq!(extract_amount(&rows, &["ROE"]), 0.0);
    }

    #[test]
    fn extractor_fills_both_record_halves() {
        let rows = vec![
            row("EPS", &[500.0]),
            row("BVPS", &[4500.0]),
            row("Return On Equity", &[11.1]),
            row("Debt to Equity Ratio", &[0.8]),
            row("Net Profit Margin", &[21.0]),
            row("Close Price", &[6000.0]),
            row("Market Cap", &[9.1e14]),
            row("Volume", &[1.2e8]),
            row("PER", &[12.0]),
            row("PBV", &[1.33]),
        ];
        let keywords = FieldKeywords::default();
        let extractor = RowExtractor::new(&rows, &keywords);

        let fundamentals = extractor.fundamentals();
        assert_eq!(fundamentals.eps, 500.0);
        assert_eq!(fundamentals.bvps, 4500.0);
        assert_eq!(fundamentals.roe, 11.1);
        assert_eq!(fundamentals.der, 0.8);
        assert_eq!(fundamentals.npm, 21.0);

        let market = extractor.market_data();
        assert_eq!(market.price, 6000.0);
        assert_eq!(market.market_cap, 9.1e14);
        assert_eq!(market.volume, 1.2e8);
        assert_eq!(market.per, 12.0);
        assert_eq!(market.pbv, 1.33);
    }

    #[test]
    fn substring_matching_can_hit_an_unrelated_row() {
        let rows = vec![row("Book Value Per Share", &[4500.0]), row("PER", &[12.0])];
        let keywords = FieldKeywords::default();

        assert_eq!(RowExtractor::new(&rows, &keywords).get(Field::Per), 4500.0);
    }

    #[test]
    fn partial_config_keeps_default_keywords() {
        let keywords: FieldKeywords =
            toml::from_str("eps = [\"LABA PER SAHAM\"]").expect("keywords");

        assert_eq!(keywords.eps, vec![String::from("LABA PER SAHAM")]);
        assert_eq!(keywords.bvps, FieldKeywords::default().bvps);
        assert!(keywords.empty_fields().is_empty());

        let blank = FieldKeywords {
            npm: vec![String::from(" ")],
            ..FieldKeywords::default()
        };
        assert_eq!(blank.empty_fields(), vec![Field::Npm]);
    }
}
