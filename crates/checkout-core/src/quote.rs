//! Quote Model
//!
//! A `Quote` is the fully computed price breakdown for one
//! (tier, currency, coupon) combination. It is always derived fresh from the
//! rate table and never patched incrementally, so stale-discount bugs cannot
//! occur by construction.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::license::LicenseTier;
use crate::money::Currency;

/// The report being purchased
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportRef {
    /// Catalog identifier of the report
    pub id: String,

    /// Report title, echoed on the order record
    pub title: String,
}

impl ReportRef {
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
        }
    }
}

/// Indian GST components; at most one of {cgst+sgst} or {igst} is non-zero
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaxBreakdown {
    pub cgst: Decimal,
    pub sgst: Decimal,
    pub igst: Decimal,
}

impl TaxBreakdown {
    /// No tax applies (non-INR purchases)
    pub fn none() -> Self {
        Self::default()
    }

    pub fn split(cgst: Decimal, sgst: Decimal) -> Self {
        Self {
            cgst,
            sgst,
            igst: Decimal::ZERO,
        }
    }

    pub fn integrated(igst: Decimal) -> Self {
        Self {
            cgst: Decimal::ZERO,
            sgst: Decimal::ZERO,
            igst,
        }
    }

    /// Sum of all tax components
    pub fn total(&self) -> Decimal {
        self.cgst + self.sgst + self.igst
    }

    pub fn is_zero(&self) -> bool {
        self.total() == Decimal::ZERO
    }

    /// Label shown next to the tax line
    pub fn label(&self) -> &'static str {
        if self.is_zero() {
            "Not Applicable"
        } else if self.igst > Decimal::ZERO {
            "IGST"
        } else {
            "CGST + SGST"
        }
    }
}

/// A coupon resolved against its exact (tier, currency) scope.
///
/// The scope fields exist so the session can detect and discard a coupon
/// the moment the tier or currency it was validated against changes.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppliedCoupon {
    /// Normalized (uppercased) coupon code
    pub code: String,

    /// Tier the coupon was validated against
    pub tier: LicenseTier,

    /// Currency the coupon was validated against
    pub currency: Currency,

    /// Amount taken off the pre-coupon total
    pub discount_amount: Decimal,

    /// Total after the coupon
    pub new_total: Decimal,
}

impl AppliedCoupon {
    /// Whether this coupon still applies to the given scope
    pub fn matches(&self, tier: LicenseTier, currency: Currency) -> bool {
        self.tier == tier && self.currency == currency
    }
}

/// Fully computed price breakdown for the current checkout selection
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Quote {
    /// Report being licensed
    pub report: ReportRef,

    /// Human-readable license title, e.g. "Single User License"
    pub license_title: String,

    /// Tier the quote was computed for
    pub tier: LicenseTier,

    /// Currency every amount below is denominated in
    pub currency: Currency,

    /// Undiscounted list price
    pub list_price: Decimal,

    /// Offer price after the standing discount
    pub offer_price: Decimal,

    /// list_price - offer_price, plus any coupon discount
    pub discount: Decimal,

    /// Region-conditional GST breakdown on the subtotal
    pub tax: TaxBreakdown,

    /// Coupon applied to this quote, if any
    pub coupon: Option<AppliedCoupon>,

    /// Whether pricing fell back to the USD row for this tier
    pub used_usd_fallback: bool,

    /// Final payable amount: subtotal + tax
    pub total: Decimal,
}

impl Quote {
    /// Amount the tax was computed on (offer price less coupon discount)
    pub fn subtotal(&self) -> Decimal {
        self.total - self.tax.total()
    }
}
