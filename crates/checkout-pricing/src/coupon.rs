//! Coupon Resolver
//!
//! Validates a coupon code against the rate table. Coupons are published per
//! exact (tier, currency) scope; the resolved `AppliedCoupon` records that
//! scope so the session can discard it the moment either changes.

use checkout_core::{AppliedCoupon, Currency, LicenseTier, RateTable};
use rust_decimal::Decimal;

use crate::error::CouponError;

/// Apply a coupon code to a base total.
///
/// Idempotent: identical (code, tier, currency, base_total) inputs always
/// produce the identical result. The returned discount never affects the
/// quote until the caller attaches it; a rejection leaves the total untouched.
pub fn apply(
    code: &str,
    tier: LicenseTier,
    currency: Currency,
    base_total: Decimal,
    table: &RateTable,
) -> Result<AppliedCoupon, CouponError> {
    let normalized = code.trim().to_uppercase();
    if normalized.is_empty() {
        return Err(CouponError::Empty);
    }

    let Some(new_total) = table.coupon_total(tier, currency, &normalized) else {
        return Err(CouponError::InvalidOrUnsupported);
    };

    if new_total > base_total || new_total < Decimal::ZERO {
        // A coupon that raises the price (or goes negative) is a bad table
        // row; fail closed rather than surprise the buyer.
        tracing::warn!(
            code = %normalized,
            tier = %tier,
            currency = %currency,
            %base_total,
            %new_total,
            "Coupon resulting total is out of range, rejecting"
        );
        return Err(CouponError::InvalidOrUnsupported);
    }

    Ok(AppliedCoupon {
        code: normalized,
        tier,
        currency,
        discount_amount: (base_total - new_total).round_dp(2),
        new_total,
    })
}
