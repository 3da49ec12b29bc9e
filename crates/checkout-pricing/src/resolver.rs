//! Pricing Resolver
//!
//! Pure mapping from (tier, currency, rate table) to a priced breakdown.
//! No I/O, no side effects; unit-tested with tabular fixtures.

use checkout_core::{Currency, LicenseTier, RateRow, RateTable};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::error::{PricingError, Result};

const HUNDRED: Decimal = dec!(100);

/// Resolved prices for one (tier, currency) selection
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceBreakdown {
    /// Undiscounted list price
    pub list_price: Decimal,

    /// Offer price after the standing discount
    pub offer_price: Decimal,

    /// Percent discount off the list price
    pub discount_percent: Decimal,

    /// Currency the amounts are actually denominated in. Differs from the
    /// requested currency only when the USD fallback applied.
    pub currency: Currency,

    /// Whether the requested row was missing and the USD row was used
    pub fell_back_to_usd: bool,
}

impl PriceBreakdown {
    /// list_price - offer_price
    pub fn standing_discount(&self) -> Decimal {
        self.list_price - self.offer_price
    }
}

/// Resolve prices for a (tier, currency) selection.
///
/// Resolution order:
/// 1. the (tier, currency) row, deriving `offer = list * (1 - discount/100)`
///    when the offer price is absent;
/// 2. the (tier, USD) row, flagged via `fell_back_to_usd`;
/// 3. `PricingError::Unavailable` - never a silent zero.
pub fn resolve(
    tier: LicenseTier,
    currency: Currency,
    table: &RateTable,
) -> Result<PriceBreakdown> {
    if let Some(breakdown) = resolve_row(table.row(tier, currency), currency, false) {
        return Ok(breakdown);
    }

    if currency != Currency::Usd {
        if let Some(breakdown) = resolve_row(table.row(tier, Currency::Usd), Currency::Usd, true) {
            tracing::warn!(
                tier = %tier,
                requested = %currency,
                "No rate row for requested currency, quoting the USD row"
            );
            return Ok(breakdown);
        }
    }

    Err(PricingError::Unavailable { tier, currency })
}

fn resolve_row(
    row: Option<&RateRow>,
    currency: Currency,
    fell_back_to_usd: bool,
) -> Option<PriceBreakdown> {
    let row = row?;

    let offer_price = match (row.offer_price, row.list_price, row.discount_percent) {
        (Some(offer), _, _) => offer,
        (None, Some(list), Some(discount)) => {
            (list * (Decimal::ONE - discount / HUNDRED)).round_dp(2)
        }
        (None, Some(list), None) => list,
        (None, None, _) => return None,
    };

    let list_price = row.list_price.unwrap_or(offer_price);
    let discount_percent = row.discount_percent.unwrap_or_else(|| {
        if list_price > Decimal::ZERO {
            ((list_price - offer_price) / list_price * HUNDRED).round_dp(2)
        } else {
            Decimal::ZERO
        }
    });

    Some(PriceBreakdown {
        list_price,
        offer_price,
        discount_percent,
        currency,
        fell_back_to_usd,
    })
}
