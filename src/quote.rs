use lazy_static::lazy_static;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::{CatalogError, Result};

/// Base price, add-ons and standard lead time of one product code
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PriceRule {
    pub base: f64,
    pub fast_addon: f64,
    pub premium_addon: f64,
    pub lead_days: i32,
}

lazy_static! {
    static ref PRICE_RULES: BTreeMap<&'static str, PriceRule> = {
        let mut rules = BTreeMap::new();
        rules.insert("A100", PriceRule { base: 1000.0, fast_addon: 150.0, premium_addon: 200.0, lead_days: 7 });
        rules.insert("B200", PriceRule { base: 1500.0, fast_addon: 200.0, premium_addon: 300.0, lead_days: 10 });
        rules.insert("C300", PriceRule { base: 2200.0, fast_addon: 250.0, premium_addon: 400.0, lead_days: 14 });
        rules
    };
}

const BASE_MARGIN: f64 = 0.28;
const PREMIUM_MARGIN: f64 = 0.03;
const DISCOUNT_MARGIN_CUT: f64 = 0.01;
const DISCOUNT_MARGIN_THRESHOLD: f64 = 10.0;
const FAST_TRACK_DAYS: i32 = 2;
const PREMIUM_EXTRA_DAYS: i32 = 1;

pub const MAX_DISCOUNT_PCT: f64 = 30.0;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct QuoteRequest {
    pub code: String,
    pub quantity: u32,
    #[serde(default)]
    pub fast: bool,
    #[serde(default)]
    pub premium: bool,
    #[serde(default)]
    pub discount_pct: f64,
}

impl QuoteRequest {
    /// Range checks applied by the surfaces before calling [`quote`]
    pub fn validate(&self) -> Result<()> {
        if self.quantity < 1 {
            return Err(CatalogError::InvalidRequest("quantity must be at least 1".to_string()));
        }
        if !(0.0..=MAX_DISCOUNT_PCT).contains(&self.discount_pct) {
            return Err(CatalogError::InvalidRequest(format!(
                "discount must be between 0 and {}",
                MAX_DISCOUNT_PCT
            )));
        }
        Ok(())
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct QuoteResult {
    pub unit_price: f64,
    pub subtotal: f64,
    pub discount_amount: f64,
    pub total: f64,
    pub lead_days: i32,
    pub margin: f64,
}

/// Static lookup of price rules by product code
#[derive(Clone, Debug)]
pub struct PriceRules {
    rules: BTreeMap<String, PriceRule>,
}

impl Default for PriceRules {
    fn default() -> Self {
        PriceRules {
            rules: PRICE_RULES
                .iter()
                .map(|(code, rule)| (code.to_string(), rule.clone()))
                .collect(),
        }
    }
}

impl PriceRules {
    pub fn new(rules: BTreeMap<String, PriceRule>) -> Self {
        PriceRules { rules }
    }

    pub fn get(&self, code: &str) -> Result<&PriceRule> {
        self.rules
            .get(code)
            .ok_or_else(|| CatalogError::ProductNotFound(code.to_string()))
    }

    pub fn codes(&self) -> impl Iterator<Item = &str> {
        self.rules.keys().map(String::as_str)
    }

    /// Price a request; inputs are assumed already range-checked
    pub fn quote(&self, request: &QuoteRequest) -> Result<QuoteResult> {
        let rule = self.get(&request.code)?;

        let mut unit_price = rule.base;
        if request.fast {
            unit_price += rule.fast_addon;
        }
        if request.premium {
            unit_price += rule.premium_addon;
        }
        let subtotal = unit_price * f64::from(request.quantity);
        let discount_amount = subtotal * request.discount_pct / 100.0;
        let total = subtotal - discount_amount;

        let mut lead_days = rule.lead_days;
        if request.fast {
            lead_days -= FAST_TRACK_DAYS;
        }
        if request.premium {
            lead_days += PREMIUM_EXTRA_DAYS;
        }

        let mut margin = BASE_MARGIN;
        if request.premium {
            margin += PREMIUM_MARGIN;
        }
        if request.discount_pct >= DISCOUNT_MARGIN_THRESHOLD {
            margin -= DISCOUNT_MARGIN_CUT;
        }

        Ok(QuoteResult {
            unit_price,
            subtotal,
            discount_amount,
            total,
            lead_days: lead_days.max(1),
            margin,
        })
    }
}

/// Price a request against the built-in rule table
pub fn quote(request: &QuoteRequest) -> Result<QuoteResult> {
    PriceRules::default().quote(request)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(code: &str, quantity: u32, fast: bool, premium: bool, discount_pct: f64) -> QuoteRequest {
        QuoteRequest {
            code: code.to_string(),
            quantity,
            fast,
            premium,
            discount_pct,
        }
    }

    #[test]
    fn fast_track_a100_with_small_discount() {
        let result = quote(&request("A100", 100, true, false, 5.0)).unwrap();
        assert_eq!(result.unit_price, 1150.0);
        assert_eq!(result.subtotal, 115000.0);
        assert_eq!(result.discount_amount, 5750.0);
        assert_eq!(result.total, 109250.0);
        assert_eq!(result.lead_days, 5);
        assert!((result.margin - 0.28).abs() < 1e-9);
    }

    #[test]
    fn premium_adds_day_and_margin_discount_cuts_margin() {
        let result = quote(&request("A100", 1, false, true, 10.0)).unwrap();
        assert_eq!(result.unit_price, 1200.0);
        assert_eq!(result.lead_days, 8);
        assert!((result.margin - 0.30).abs() < 1e-9);
    }

    #[test]
    fn lead_time_is_floored_at_one_day() {
        let mut rules = BTreeMap::new();
        rules.insert(
            "Z1".to_string(),
            PriceRule { base: 10.0, fast_addon: 1.0, premium_addon: 1.0, lead_days: 2 },
        );
        let result = PriceRules::new(rules).quote(&request("Z1", 3, true, false, 0.0)).unwrap();
        assert_eq!(result.lead_days, 1);
        assert_eq!(result.total, 33.0);
    }

    #[test]
    fn unknown_code_is_not_found() {
        assert!(matches!(
            quote(&request("X999", 1, false, false, 0.0)),
            Err(CatalogError::ProductNotFound(code)) if code == "X999"
        ));
    }

    #[test]
    fn validation_bounds_quantity_and_discount() {
        assert!(request("A100", 1, false, false, 30.0).validate().is_ok());
        assert!(request("A100", 0, false, false, 0.0).validate().is_err());
        assert!(request("A100", 1, false, false, 30.5).validate().is_err());
        assert!(request("A100", 1, false, false, -1.0).validate().is_err());
    }
}
