//! Rate Table
//!
//! The pricing collaborator publishes a flat, string-keyed payload in the
//! shape `{tier}_license_{field}_in_{CUR}` (e.g.
//! `single_license_offer_price_in_USD`). That payload is converted ONCE into
//! a strongly typed table keyed by `(LicenseTier, Currency)`; combinations
//! that cannot be priced are flagged at construction, never at point of use.

use std::collections::HashMap;

use rust_decimal::Decimal;
use serde_json::Value;

use crate::error::{CoreError, Result};
use crate::license::LicenseTier;
use crate::money::Currency;

/// Prices for one (tier, currency) combination
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RateRow {
    /// Undiscounted list price
    pub list_price: Option<Decimal>,

    /// Pre-discounted offer price
    pub offer_price: Option<Decimal>,

    /// Percent discount off the list price
    pub discount_percent: Option<Decimal>,
}

impl RateRow {
    /// A row with neither price field cannot produce a quote
    pub fn is_priceable(&self) -> bool {
        self.list_price.is_some() || self.offer_price.is_some()
    }
}

/// GST rates for one tier, as percentages
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct GstRates {
    pub cgst: Option<Decimal>,
    pub sgst: Option<Decimal>,
}

/// Typed view over the collaborator's flat pricing payload
#[derive(Clone, Debug, Default)]
pub struct RateTable {
    rows: HashMap<(LicenseTier, Currency), RateRow>,
    gst: HashMap<LicenseTier, GstRates>,
    coupons: HashMap<(LicenseTier, Currency, String), Decimal>,
    missing: Vec<(LicenseTier, Currency)>,
}

impl RateTable {
    /// Build the table from the raw collaborator payload.
    ///
    /// Unrecognized keys are ignored; (tier, currency) combinations with no
    /// resolvable price are recorded in `missing()` and logged.
    pub fn from_raw(raw: &serde_json::Map<String, Value>) -> Self {
        let mut table = RateTable::default();

        for (key, value) in raw {
            let Some((tier, field, currency)) = parse_key(key) else {
                continue;
            };
            let Some(amount) = decimal_from_value(value) else {
                tracing::warn!(key = %key, "Rate table value is not numeric, skipping");
                continue;
            };

            match field {
                "price" => table.row_mut(tier, currency).list_price = Some(amount),
                "offer_price" => table.row_mut(tier, currency).offer_price = Some(amount),
                "discount" => table.row_mut(tier, currency).discount_percent = Some(amount),
                "cgst" if currency == Currency::Inr => {
                    table.gst.entry(tier).or_default().cgst = Some(amount);
                }
                "sgst" if currency == Currency::Inr => {
                    table.gst.entry(tier).or_default().sgst = Some(amount);
                }
                code => {
                    // Any other field fragment is a coupon code scoped to
                    // this exact (tier, currency) pair.
                    table
                        .coupons
                        .insert((tier, currency, code.to_uppercase()), amount);
                }
            }
        }

        for tier in LicenseTier::ALL {
            for currency in Currency::ALL {
                let priceable = table
                    .rows
                    .get(&(tier, currency))
                    .is_some_and(RateRow::is_priceable);
                if !priceable {
                    table.missing.push((tier, currency));
                }
            }
        }

        if !table.missing.is_empty() {
            tracing::warn!(
                combinations = table.missing.len(),
                "Rate table is missing priceable rows; USD fallback will apply"
            );
        }

        table
    }

    /// Build from a JSON value; the payload must be an object
    pub fn from_value(value: &Value) -> Result<Self> {
        let Some(object) = value.as_object() else {
            return Err(CoreError::RateTableParse(
                "expected a JSON object of rate keys".into(),
            ));
        };
        Ok(Self::from_raw(object))
    }

    fn row_mut(&mut self, tier: LicenseTier, currency: Currency) -> &mut RateRow {
        self.rows.entry((tier, currency)).or_default()
    }

    /// Look up the row for a (tier, currency) combination
    pub fn row(&self, tier: LicenseTier, currency: Currency) -> Option<&RateRow> {
        self.rows.get(&(tier, currency))
    }

    /// GST rates published for the tier (INR only)
    pub fn gst_rates(&self, tier: LicenseTier) -> GstRates {
        self.gst.get(&tier).copied().unwrap_or_default()
    }

    /// Resulting total for a coupon code scoped to (tier, currency)
    pub fn coupon_total(
        &self,
        tier: LicenseTier,
        currency: Currency,
        code: &str,
    ) -> Option<Decimal> {
        self.coupons
            .get(&(tier, currency, code.trim().to_uppercase()))
            .copied()
    }

    /// Combinations flagged un-priceable at construction
    pub fn missing(&self) -> &[(LicenseTier, Currency)] {
        &self.missing
    }
}

/// Split `{tier}_license_{field}_in_{CUR}` into its parts
fn parse_key(key: &str) -> Option<(LicenseTier, &str, Currency)> {
    for tier in LicenseTier::ALL {
        let prefix = format!("{}_license_", tier.as_str());
        let Some(rest) = key.strip_prefix(&prefix) else {
            continue;
        };
        for currency in Currency::ALL {
            let suffix = format!("_in_{}", currency.code());
            if let Some(field) = rest.strip_suffix(&suffix) {
                return Some((tier, field, currency));
            }
        }
    }
    None
}

/// Accept numbers or numeric strings (the collaborator emits both)
fn decimal_from_value(value: &Value) -> Option<Decimal> {
    match value {
        Value::Number(n) => n.to_string().parse().ok(),
        Value::String(s) => s.trim().replace(',', "").parse().ok(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use serde_json::json;

    fn sample_table() -> RateTable {
        let raw = json!({
            "single_license_price_in_USD": 100,
            "single_license_offer_price_in_USD": "80",
            "single_license_discount_in_USD": 20,
            "team_license_offer_price_in_INR": "10,000",
            "team_license_cgst_in_INR": 9,
            "team_license_sgst_in_INR": 9,
            "single_license_WELCOME10_in_USD": 70,
            "not_a_rate_key": "ignored",
            "single_license_price_in_EUR": true,
        });
        RateTable::from_value(&raw).unwrap()
    }

    #[test]
    fn test_typed_rows_from_raw_keys() {
        let table = sample_table();
        let row = table.row(LicenseTier::Single, Currency::Usd).unwrap();
        assert_eq!(row.list_price, Some(dec!(100)));
        assert_eq!(row.offer_price, Some(dec!(80)));
        assert_eq!(row.discount_percent, Some(dec!(20)));
    }

    #[test]
    fn test_numeric_strings_with_separators() {
        let table = sample_table();
        let row = table.row(LicenseTier::Team, Currency::Inr).unwrap();
        assert_eq!(row.offer_price, Some(dec!(10000)));
    }

    #[test]
    fn test_gst_rates_per_tier() {
        let table = sample_table();
        let gst = table.gst_rates(LicenseTier::Team);
        assert_eq!(gst.cgst, Some(dec!(9)));
        assert_eq!(gst.sgst, Some(dec!(9)));
        assert_eq!(table.gst_rates(LicenseTier::Single), GstRates::default());
    }

    #[test]
    fn test_coupon_lookup_is_scoped_and_case_insensitive() {
        let table = sample_table();
        assert_eq!(
            table.coupon_total(LicenseTier::Single, Currency::Usd, "welcome10"),
            Some(dec!(70))
        );
        assert_eq!(
            table.coupon_total(LicenseTier::Single, Currency::Eur, "WELCOME10"),
            None
        );
        assert_eq!(
            table.coupon_total(LicenseTier::Team, Currency::Usd, "WELCOME10"),
            None
        );
    }

    #[test]
    fn test_missing_combinations_flagged_at_construction() {
        let table = sample_table();
        assert!(table
            .missing()
            .contains(&(LicenseTier::Enterprise, Currency::Gbp)));
        // A non-numeric value never becomes a silent zero
        assert!(table
            .missing()
            .contains(&(LicenseTier::Single, Currency::Eur)));
        assert!(!table
            .missing()
            .contains(&(LicenseTier::Single, Currency::Usd)));
    }

    #[test]
    fn test_from_value_rejects_non_object() {
        assert!(RateTable::from_value(&json!([1, 2, 3])).is_err());
    }
}
