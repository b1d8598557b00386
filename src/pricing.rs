use serde::Serialize;

use crate::error::{CatalogError, Result};
use crate::loader::RawTable;
use crate::table::missing_columns;

pub const REQUIRED_COLUMNS: [&str; 3] = ["sku", "name", "base_price"];
const MAX_FEATURES: usize = 3;

/// Markup and rounding applied to every row of a price sheet
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PricingRule {
    pub markup_pct: f64,
    pub rounding_step: u32,
}

impl Default for PricingRule {
    fn default() -> Self {
        PricingRule {
            markup_pct: 25.0,
            rounding_step: 10,
        }
    }
}

impl PricingRule {
    /// Selling price: base plus markup rounded to an integer, then snapped to
    /// the nearest multiple of the rounding step; never negative
    pub fn selling_price(&self, base_price: f64) -> i64 {
        let raw = (base_price * (1.0 + self.markup_pct / 100.0)).round();
        let step = f64::from(self.rounding_step);
        let snapped = if self.rounding_step > 1 {
            (raw / step).round() * step
        } else {
            raw
        };
        if snapped.is_finite() && snapped > 0.0 {
            snapped as i64
        } else {
            0
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct PriceSheetRow {
    pub sku: String,
    pub name: String,
    pub description: String,
    pub base_price: f64,
    pub selling_price: i64,
    pub top_features: String,
    pub image_url: Option<String>,
}

/// Parse a price cell; anything that is not a finite number reads as 0
pub fn coerce_price(value: &str) -> f64 {
    let cleaned: String = value.trim().chars().filter(|c| *c != ',').collect();
    match cleaned.parse::<f64>() {
        Ok(v) if v.is_finite() => v,
        _ => 0.0,
    }
}

/// First three non-empty `;`-separated features, trimmed, joined with `"; "`
pub fn top3_feats(features: &str) -> String {
    features
        .split(';')
        .map(str::trim)
        .filter(|f| !f.is_empty())
        .take(MAX_FEATURES)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Price every row of an uploaded product sheet
///
/// `description`, `features` and `image_url` columns are optional.
///
/// # Errors
/// * `MissingColumns` listing every absent name of `sku`, `name`, `base_price`
pub fn build(raw: &RawTable, rule: &PricingRule) -> Result<Vec<PriceSheetRow>> {
    let missing = missing_columns(raw, REQUIRED_COLUMNS);
    if !missing.is_empty() {
        return Err(CatalogError::MissingColumns(missing));
    }

    let rows = (0..raw.rows.len())
        .map(|i| {
            let cell = |name: &str| raw.get(i, name).unwrap_or_default().trim().to_string();
            let base_price = coerce_price(&cell("base_price"));
            let image_url = Some(cell("image_url")).filter(|u| !u.is_empty());
            PriceSheetRow {
                sku: cell("sku"),
                name: cell("name"),
                description: cell("description"),
                base_price,
                selling_price: rule.selling_price(base_price),
                top_features: top3_feats(&cell("features")),
                image_url,
            }
        })
        .collect();

    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rule(markup_pct: f64, rounding_step: u32) -> PricingRule {
        PricingRule { markup_pct, rounding_step }
    }

    #[test]
    fn markup_then_step_rounding() {
        assert_eq!(rule(25.0, 1).selling_price(280.0), 350);
        assert_eq!(rule(25.0, 10).selling_price(280.0), 350);
        assert_eq!(rule(25.0, 100).selling_price(280.0), 400);
        assert_eq!(rule(10.0, 50).selling_price(199.0), 200);
    }

    #[test]
    fn selling_price_is_nonnegative_multiple_of_step() {
        for step in [1u32, 10, 50, 100] {
            for base in [0.0, 1.0, 9.99, 123.45, 280.0, 999.0, 12345.6, -50.0] {
                let price = rule(37.5, step).selling_price(base);
                assert!(price >= 0, "negative price for base {}", base);
                assert_eq!(price % i64::from(step), 0, "base {} step {}", base, step);
            }
        }
    }

    #[test]
    fn top_three_features_in_order() {
        assert_eq!(top3_feats("透氣;快乾;耐磨;保暖"), "透氣; 快乾; 耐磨");
        assert_eq!(top3_feats(" a ;; b ;"), "a; b");
        assert_eq!(top3_feats(""), "");
    }

    #[test]
    fn bad_prices_coerce_to_zero() {
        assert_eq!(coerce_price("1,200"), 1200.0);
        assert_eq!(coerce_price("n/a"), 0.0);
        assert_eq!(coerce_price(""), 0.0);
        assert_eq!(coerce_price("NaN"), 0.0);
    }

    #[test]
    fn builds_rows_with_optional_columns() {
        let raw = RawTable {
            headers: vec!["sku", "name", "base_price", "features", "image_url"]
                .into_iter()
                .map(String::from)
                .collect(),
            rows: vec![
                vec!["S1", "Shirt", "280", "透氣;快乾;耐磨;保暖", "http://img/s1.png"],
                vec!["S2", "Cap", "oops", "", ""],
            ]
            .into_iter()
            .map(|r| r.into_iter().map(String::from).collect())
            .collect(),
        };
        let rows = build(&raw, &rule(25.0, 10)).unwrap();
        assert_eq!(rows[0].selling_price, 350);
        assert_eq!(rows[0].top_features, "透氣; 快乾; 耐磨");
        assert_eq!(rows[0].image_url.as_deref(), Some("http://img/s1.png"));
        assert_eq!(rows[0].description, "");
        assert_eq!(rows[1].base_price, 0.0);
        assert_eq!(rows[1].selling_price, 0);
        assert_eq!(rows[1].image_url, None);
    }

    #[test]
    fn missing_required_columns_reported_together() {
        let raw = RawTable {
            headers: vec!["name".to_string()],
            rows: vec![],
        };
        match build(&raw, &PricingRule::default()) {
            Err(CatalogError::MissingColumns(cols)) => assert_eq!(cols, vec!["sku", "base_price"]),
            other => panic!("unexpected result: {:?}", other),
        }
    }
}
