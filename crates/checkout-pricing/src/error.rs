//! Pricing Error Types

use checkout_core::{Currency, LicenseTier};
use thiserror::Error;

/// Result type alias for pricing operations
pub type Result<T> = std::result::Result<T, PricingError>;

/// Pricing errors; `Unavailable` is fatal and must block the payment step
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PricingError {
    /// No rate row resolvable, even after the USD fallback. Zero-priced
    /// orders must never reach the payment step.
    #[error("No price available for {tier} license in {currency}")]
    Unavailable {
        tier: LicenseTier,
        currency: Currency,
    },
}

/// Coupon rejection reasons; recoverable, surfaced inline, and never
/// affecting the quote total
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CouponError {
    /// Buyer submitted an empty code
    #[error("Coupon code is empty")]
    Empty,

    /// Code unknown for this exact (tier, currency) scope
    #[error("Coupon code is invalid or not supported for this license")]
    InvalidOrUnsupported,
}
