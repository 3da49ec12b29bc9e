//! # checkout-pricing
//!
//! Pure pricing computation for the report checkout engine: the pricing
//! resolver, the region-conditional tax policy, the coupon resolver, and
//! `build_quote` composing all three into a fresh `Quote`.
//!
//! Nothing in this crate performs I/O; every function is deterministic over
//! its inputs, so a quote can be recomputed from scratch on every tier,
//! currency or coupon change instead of being patched in place.

pub mod coupon;
pub mod error;
pub mod resolver;
pub mod tax;

pub use error::{CouponError, PricingError, Result};
pub use resolver::PriceBreakdown;

use checkout_core::{AppliedCoupon, Currency, LicenseTier, Quote, RateTable, Region, ReportRef};

/// Build the complete price breakdown for the current selection.
///
/// Always derives the quote from scratch. A supplied coupon is honored only
/// if its recorded (tier, currency) scope matches the resolved prices;
/// otherwise it is silently dropped, which is what makes tier/currency
/// changes invalidate coupons.
pub fn build_quote(
    report: &ReportRef,
    tier: LicenseTier,
    currency: Currency,
    region: &Region,
    coupon: Option<&AppliedCoupon>,
    table: &RateTable,
) -> Result<Quote> {
    let prices = resolver::resolve(tier, currency, table)?;

    let coupon = coupon
        .filter(|c| c.matches(tier, prices.currency))
        .cloned();

    let subtotal = coupon
        .as_ref()
        .map_or(prices.offer_price, |c| c.new_total);

    let tax = tax::compute_tax(subtotal, region, prices.currency, tier, table);

    let coupon_discount = coupon
        .as_ref()
        .map_or(rust_decimal::Decimal::ZERO, |c| c.discount_amount);

    Ok(Quote {
        report: report.clone(),
        license_title: tier.title().to_string(),
        tier,
        currency: prices.currency,
        list_price: prices.list_price,
        offer_price: prices.offer_price,
        discount: prices.standing_discount() + coupon_discount,
        tax,
        coupon,
        used_usd_fallback: prices.fell_back_to_usd,
        total: subtotal + tax.total(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;
    use serde_json::json;

    fn table() -> RateTable {
        RateTable::from_value(&json!({
            "single_license_price_in_USD": 100,
            "single_license_discount_in_USD": 20,
            "team_license_offer_price_in_INR": 10000,
            "single_license_WELCOME10_in_USD": 70,
        }))
        .unwrap()
    }

    fn report() -> ReportRef {
        ReportRef::new("rep-42", "Global Widgets Market 2026")
    }

    #[test]
    fn test_usd_quote_is_untaxed() {
        // single/USD: list $100, 20% => offer $80, tax 0, total $80
        let quote = build_quote(
            &report(),
            LicenseTier::Single,
            Currency::Usd,
            &Region::international("USA"),
            None,
            &table(),
        )
        .unwrap();

        assert_eq!(quote.offer_price, dec!(80));
        assert!(quote.tax.is_zero());
        assert_eq!(quote.total, dec!(80));
        assert_eq!(quote.license_title, "Single User License");
    }

    #[test]
    fn test_maharashtra_quote_adds_igst() {
        // team/INR, Maharashtra: offer ₹10,000 => igst ₹1,800, total ₹11,800
        let quote = build_quote(
            &report(),
            LicenseTier::Team,
            Currency::Inr,
            &Region::india("Maharashtra"),
            None,
            &table(),
        )
        .unwrap();

        assert_eq!(quote.tax.igst, dec!(1800));
        assert_eq!(quote.total, dec!(11800));
    }

    #[test]
    fn test_coupon_feeds_subtotal_and_discount() {
        let applied = coupon::apply(
            "WELCOME10",
            LicenseTier::Single,
            Currency::Usd,
            dec!(80),
            &table(),
        )
        .unwrap();

        let quote = build_quote(
            &report(),
            LicenseTier::Single,
            Currency::Usd,
            &Region::international("USA"),
            Some(&applied),
            &table(),
        )
        .unwrap();

        assert_eq!(quote.total, dec!(70));
        // list-offer ($20) plus the coupon ($10)
        assert_eq!(quote.discount, dec!(30));
        assert!(quote.coupon.is_some());
    }

    #[test]
    fn test_out_of_scope_coupon_is_dropped() {
        let applied = coupon::apply(
            "WELCOME10",
            LicenseTier::Single,
            Currency::Usd,
            dec!(80),
            &table(),
        )
        .unwrap();

        // Same coupon object, but the quote is now for the team tier
        let quote = build_quote(
            &report(),
            LicenseTier::Team,
            Currency::Inr,
            &Region::india("Karnataka"),
            Some(&applied),
            &table(),
        )
        .unwrap();

        assert!(quote.coupon.is_none());
        assert_eq!(quote.discount, Decimal::ZERO);
    }

    #[test]
    fn test_quote_is_deterministic() {
        let build = || {
            build_quote(
                &report(),
                LicenseTier::Team,
                Currency::Inr,
                &Region::india("Maharashtra"),
                None,
                &table(),
            )
            .unwrap()
        };
        assert_eq!(build(), build());
    }
}
