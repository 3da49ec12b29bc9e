//! Tax Policy
//!
//! Region-conditional GST selection. Tax only ever applies to INR purchases:
//! Maharashtra bills integrated GST at 18%, every other Indian state bills
//! the CGST+SGST split, and non-India buyers pay nothing.

use checkout_core::{Currency, LicenseTier, RateTable, Region, TaxBreakdown};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

const HUNDRED: Decimal = dec!(100);

/// IGST percentage for Maharashtra
pub const IGST_RATE: Decimal = dec!(18);

/// Documented CGST/SGST defaults, applied when the rate-table collaborator
/// supplies no rate for the tier (a fallback, not a silent zero)
pub const DEFAULT_CGST_RATE: Decimal = dec!(9);
pub const DEFAULT_SGST_RATE: Decimal = dec!(9);

/// Compute the GST breakdown on a subtotal.
///
/// CGST/SGST rates come from the same rate-table collaborator as pricing,
/// keyed per tier; amounts are rounded to 2 decimal places.
pub fn compute_tax(
    subtotal: Decimal,
    region: &Region,
    currency: Currency,
    tier: LicenseTier,
    table: &RateTable,
) -> TaxBreakdown {
    if currency != Currency::Inr || !region.is_india() {
        return TaxBreakdown::none();
    }

    if region.bills_igst() {
        return TaxBreakdown::integrated((subtotal * IGST_RATE / HUNDRED).round_dp(2));
    }

    let rates = table.gst_rates(tier);
    let cgst_rate = rates.cgst.unwrap_or(DEFAULT_CGST_RATE);
    let sgst_rate = rates.sgst.unwrap_or(DEFAULT_SGST_RATE);
    if rates.cgst.is_none() || rates.sgst.is_none() {
        tracing::debug!(tier = %tier, "No published GST rates, using 9% + 9% defaults");
    }

    TaxBreakdown::split(
        (subtotal * cgst_rate / HUNDRED).round_dp(2),
        (subtotal * sgst_rate / HUNDRED).round_dp(2),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn table() -> RateTable {
        RateTable::from_value(&json!({
            "team_license_cgst_in_INR": 9,
            "team_license_sgst_in_INR": 9,
        }))
        .unwrap()
    }

    #[test]
    fn test_non_inr_is_untaxed() {
        let tax = compute_tax(
            dec!(1000),
            &Region::international("Germany"),
            Currency::Eur,
            LicenseTier::Single,
            &table(),
        );
        assert!(tax.is_zero());
        assert_eq!(tax.label(), "Not Applicable");
    }

    #[test]
    fn test_maharashtra_bills_igst_18() {
        // offerPrice=₹10,000 => igst=₹1,800
        let tax = compute_tax(
            dec!(10000),
            &Region::india("Maharashtra"),
            Currency::Inr,
            LicenseTier::Team,
            &table(),
        );
        assert_eq!(tax.igst, dec!(1800));
        assert_eq!(tax.cgst, Decimal::ZERO);
        assert_eq!(tax.sgst, Decimal::ZERO);
    }

    #[test]
    fn test_other_indian_states_split_cgst_sgst() {
        let tax = compute_tax(
            dec!(10000),
            &Region::india("Karnataka"),
            Currency::Inr,
            LicenseTier::Team,
            &table(),
        );
        assert_eq!(tax.cgst, dec!(900));
        assert_eq!(tax.sgst, dec!(900));
        assert_eq!(tax.igst, Decimal::ZERO);
    }

    #[test]
    fn test_missing_rates_fall_back_to_documented_defaults() {
        // Single tier has no published rates in the fixture table
        let tax = compute_tax(
            dec!(200),
            &Region::india("Kerala"),
            Currency::Inr,
            LicenseTier::Single,
            &table(),
        );
        assert_eq!(tax.cgst, dec!(18));
        assert_eq!(tax.sgst, dec!(18));
    }

    #[test]
    fn test_inr_outside_india_is_untaxed() {
        // The currency lock makes this unreachable in practice, but the
        // policy itself must not tax a non-India region.
        let tax = compute_tax(
            dec!(1000),
            &Region::international("Nepal"),
            Currency::Inr,
            LicenseTier::Single,
            &table(),
        );
        assert!(tax.is_zero());
    }
}
