//! # checkout-core
//!
//! Domain types for the report checkout engine: currencies and money,
//! license tiers, buyer regions, the typed rate table, and the `Quote`
//! price-breakdown model.
//!
//! Everything here is pure data; pricing computation lives in
//! `checkout-pricing` and external collaborators in `checkout-payments`.

pub mod billing;
pub mod error;
pub mod license;
pub mod money;
pub mod quote;
pub mod rates;
pub mod region;

pub use billing::BillingDetails;
pub use error::{CoreError, Result};
pub use license::LicenseTier;
pub use money::{Currency, Money};
pub use quote::{AppliedCoupon, Quote, ReportRef, TaxBreakdown};
pub use rates::{GstRates, RateRow, RateTable};
pub use region::Region;
