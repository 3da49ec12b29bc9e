//! Checkout Session
//!
//! Explicit value object owning everything the buyer has selected: tier,
//! currency, region, coupon and billing. Every derived price is recomputed
//! through pure functions on each read; nothing is patched incrementally, so
//! a stale discount cannot survive a tier or currency change.

use std::sync::Arc;

use checkout_core::{
    AppliedCoupon, BillingDetails, CoreError, Currency, LicenseTier, Quote, RateTable, Region,
    ReportRef,
};
use checkout_payments::{GatewayKind, InternalOrderId, PaymentAttempt};
use checkout_pricing::{coupon, resolver};

use crate::error::{EngineError, Result};
use crate::machine::{CheckoutStateMachine, OrderState};

/// One buyer's checkout for one report
pub struct CheckoutSession {
    report: ReportRef,
    language_id: u32,
    rate_table: Arc<RateTable>,

    tier: Option<LicenseTier>,
    currency: Currency,
    currency_locked: bool,
    region: Region,
    coupon: Option<AppliedCoupon>,
    billing: Option<BillingDetails>,

    machine: CheckoutStateMachine,
    attempt: Option<PaymentAttempt>,
    issued_order_ids: Vec<InternalOrderId>,
}

impl CheckoutSession {
    pub fn new(report: ReportRef, language_id: u32, rate_table: Arc<RateTable>) -> Self {
        Self {
            report,
            language_id,
            rate_table,
            tier: None,
            currency: Currency::Usd,
            currency_locked: false,
            region: Region::international("Unspecified"),
            coupon: None,
            billing: None,
            machine: CheckoutStateMachine::new(),
            attempt: None,
            issued_order_ids: Vec::new(),
        }
    }

    // -- selection ---------------------------------------------------------

    /// Reject selection changes once a payment attempt is in flight: the
    /// gateway order was created at the current quote's total, and any
    /// input drift would make completion disagree with it.
    fn ensure_mutable(&self, event: &'static str) -> Result<()> {
        match self.machine.state() {
            OrderState::PaymentPending | OrderState::Captured | OrderState::Verified { .. } => {
                Err(EngineError::InvalidTransition {
                    from: self.machine.state().name(),
                    event,
                })
            }
            _ => Ok(()),
        }
    }

    /// Pick (or change) the license tier. Advances the machine out of
    /// `SELECTING_LICENSE` on the first pick; any change drops an applied
    /// coupon, whose scope no longer matches.
    pub fn select_tier(&mut self, tier: LicenseTier) -> Result<()> {
        self.ensure_mutable("select_tier")?;
        if matches!(self.machine.state(), OrderState::SelectingLicense) {
            self.machine.choose_tier()?;
        }
        if self.tier != Some(tier) {
            self.clear_coupon("tier changed");
        }
        self.tier = Some(tier);
        Ok(())
    }

    /// Change the display/billing currency. Rejected while the region lock
    /// holds (India ⇒ INR); any change drops an applied coupon.
    pub fn set_currency(&mut self, currency: Currency) -> Result<()> {
        self.ensure_mutable("set_currency")?;
        if self.currency_locked && currency != Currency::Inr {
            return Err(CoreError::CurrencyLocked(Currency::Inr.code()).into());
        }
        if self.currency != currency {
            self.clear_coupon("currency changed");
        }
        self.currency = currency;
        Ok(())
    }

    /// Declare the buyer's region. India forces the currency to INR and
    /// locks the selector; leaving India unlocks it.
    pub fn set_region(&mut self, region: Region) -> Result<()> {
        self.ensure_mutable("set_region")?;
        self.apply_region(region);
        Ok(())
    }

    fn apply_region(&mut self, region: Region) {
        if region.is_india() {
            if self.currency != Currency::Inr {
                self.clear_coupon("currency forced to INR");
            }
            self.currency = Currency::Inr;
            self.currency_locked = true;
        } else {
            self.currency_locked = false;
        }
        self.region = region;
    }

    /// Whether the currency selector must be shown locked
    pub fn currency_locked(&self) -> bool {
        self.currency_locked
    }

    // -- coupon ------------------------------------------------------------

    /// Validate and attach a coupon for the CURRENT (tier, currency) scope.
    /// Rejections leave the quote untouched.
    pub fn apply_coupon(&mut self, code: &str) -> Result<AppliedCoupon> {
        self.ensure_mutable("apply_coupon")?;
        let tier = self.tier.ok_or(EngineError::NoLicenseSelected)?;
        let prices = resolver::resolve(tier, self.currency, &self.rate_table)?;

        let applied = coupon::apply(
            code,
            tier,
            prices.currency,
            prices.offer_price,
            &self.rate_table,
        )?;
        tracing::info!(code = %applied.code, discount = %applied.discount_amount, "Coupon applied");
        self.coupon = Some(applied.clone());
        Ok(applied)
    }

    pub fn remove_coupon(&mut self) -> Result<()> {
        self.ensure_mutable("remove_coupon")?;
        self.clear_coupon("removed by buyer");
        Ok(())
    }

    fn clear_coupon(&mut self, why: &'static str) {
        if self.coupon.take().is_some() {
            tracing::info!(why, "Coupon invalidated, discount reset");
        }
    }

    // -- billing -----------------------------------------------------------

    /// Submit the billing form. Validation is region-conditional; success
    /// derives the region (with its INR lock) and advances to
    /// `PAYMENT_PENDING`.
    pub fn submit_billing(&mut self, billing: BillingDetails) -> Result<()> {
        billing.validate()?;
        self.machine.submit_billing()?;
        self.apply_region(billing.region());
        self.billing = Some(billing);
        Ok(())
    }

    /// Navigate back from billing to license selection
    pub fn back(&mut self) -> Result<()> {
        self.machine.back()
    }

    // -- derived state -----------------------------------------------------

    /// Recompute the full quote from scratch for the current selection
    pub fn quote(&self) -> Result<Quote> {
        let tier = self.tier.ok_or(EngineError::NoLicenseSelected)?;
        Ok(checkout_pricing::build_quote(
            &self.report,
            tier,
            self.currency,
            &self.region,
            self.coupon.as_ref(),
            &self.rate_table,
        )?)
    }

    pub fn state(&self) -> &OrderState {
        self.machine.state()
    }

    pub fn report(&self) -> &ReportRef {
        &self.report
    }

    pub fn language_id(&self) -> u32 {
        self.language_id
    }

    pub fn region(&self) -> &Region {
        &self.region
    }

    pub fn currency(&self) -> Currency {
        self.currency
    }

    pub fn billing(&self) -> Option<&BillingDetails> {
        self.billing.as_ref()
    }

    pub fn attempt(&self) -> Option<&PaymentAttempt> {
        self.attempt.as_ref()
    }

    /// Every internal order id this session has issued, oldest first
    pub fn issued_order_ids(&self) -> &[InternalOrderId] {
        &self.issued_order_ids
    }

    // -- attempt management (orchestrator-facing) --------------------------

    /// Issue the attempt for the next payment try: a retry of the failed
    /// attempt when one exists (fresh id, same ledger continuity), otherwise
    /// a brand new attempt.
    pub(crate) fn issue_attempt(&mut self, gateway: GatewayKind) -> PaymentAttempt {
        let attempt = match &self.attempt {
            Some(previous) if previous.gateway == gateway => previous.retry(),
            _ => PaymentAttempt::new(gateway),
        };
        self.issued_order_ids
            .push(attempt.internal_order_id.clone());
        self.attempt = Some(attempt.clone());
        attempt
    }

    pub(crate) fn attempt_mut(&mut self) -> Option<&mut PaymentAttempt> {
        self.attempt.as_mut()
    }

    pub(crate) fn machine_mut(&mut self) -> &mut CheckoutStateMachine {
        &mut self.machine
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use serde_json::json;

    fn rate_table() -> Arc<RateTable> {
        Arc::new(
            RateTable::from_value(&json!({
                "single_license_price_in_USD": 100,
                "single_license_discount_in_USD": 20,
                "single_license_price_in_EUR": 95,
                "single_license_offer_price_in_INR": 7000,
                "team_license_offer_price_in_INR": 10000,
                "single_license_WELCOME10_in_USD": 70,
            }))
            .unwrap(),
        )
    }

    fn session() -> CheckoutSession {
        CheckoutSession::new(
            ReportRef::new("rep-42", "Global Widgets Market 2026"),
            1,
            rate_table(),
        )
    }

    #[test]
    fn test_quote_requires_tier() {
        let s = session();
        assert!(matches!(
            s.quote(),
            Err(EngineError::NoLicenseSelected)
        ));
    }

    #[test]
    fn test_coupon_reset_on_currency_change() {
        let mut s = session();
        s.select_tier(LicenseTier::Single).unwrap();
        s.apply_coupon("WELCOME10").unwrap();
        assert_eq!(s.quote().unwrap().total, dec!(70));

        // Switching to EUR must reset the discount to the non-coupon value
        s.set_currency(Currency::Eur).unwrap();
        let quote = s.quote().unwrap();
        assert!(quote.coupon.is_none());
        assert_eq!(quote.total, dec!(95));
    }

    #[test]
    fn test_coupon_reset_on_tier_change() {
        let mut s = session();
        s.select_tier(LicenseTier::Single).unwrap();
        s.apply_coupon("WELCOME10").unwrap();
        s.select_tier(LicenseTier::Team).unwrap();
        assert!(s.quote().unwrap().coupon.is_none());
    }

    #[test]
    fn test_india_locks_currency_to_inr() {
        let mut s = session();
        s.select_tier(LicenseTier::Single).unwrap();
        s.set_region(Region::india("Karnataka")).unwrap();

        assert!(s.currency_locked());
        assert_eq!(s.currency(), Currency::Inr);
        assert!(s.set_currency(Currency::Usd).is_err());
        // INR itself is still accepted
        s.set_currency(Currency::Inr).unwrap();

        // Leaving India unlocks the selector
        s.set_region(Region::international("USA")).unwrap();
        s.set_currency(Currency::Usd).unwrap();
    }

    #[test]
    fn test_billing_submission_derives_region() {
        let mut s = session();
        s.select_tier(LicenseTier::Single).unwrap();

        let billing = BillingDetails {
            first_name: "Priya".into(),
            last_name: "Sharma".into(),
            email: "priya@example.in".into(),
            phone: "+91 98765 43210".into(),
            country: "India".into(),
            state_province: Some("Maharashtra".into()),
            city: Some("Mumbai".into()),
            first_line_address: Some("1 Marine Drive".into()),
            postal_zipcode: Some("400001".into()),
        };
        s.submit_billing(billing).unwrap();

        assert_eq!(s.state(), &OrderState::PaymentPending);
        assert_eq!(s.currency(), Currency::Inr);
        let quote = s.quote().unwrap();
        // single/INR offer ₹7,000 in Maharashtra => IGST 18%
        assert_eq!(quote.tax.igst, dec!(1260));
        assert_eq!(quote.total, dec!(8260));
    }

    #[test]
    fn test_invalid_billing_blocks_transition() {
        let mut s = session();
        s.select_tier(LicenseTier::Single).unwrap();

        let incomplete = BillingDetails {
            first_name: "Priya".into(),
            country: "India".into(),
            ..Default::default()
        };
        assert!(s.submit_billing(incomplete).is_err());
        assert_eq!(s.state(), &OrderState::BillingEntry);
    }

    #[test]
    fn test_selection_is_frozen_once_payment_is_pending() {
        let mut s = session();
        s.select_tier(LicenseTier::Single).unwrap();
        s.submit_billing(BillingDetails {
            first_name: "Ana".into(),
            last_name: "Silva".into(),
            email: "ana@example.com".into(),
            phone: "+351 900 000 000".into(),
            country: "Portugal".into(),
            ..Default::default()
        })
        .unwrap();
        let before = s.quote().unwrap();

        // Every quote input is locked while the attempt is in flight
        assert!(s.select_tier(LicenseTier::Team).is_err());
        assert!(s.set_currency(Currency::Eur).is_err());
        assert!(s.set_region(Region::india("Karnataka")).is_err());
        assert!(s.apply_coupon("WELCOME10").is_err());
        assert!(s.remove_coupon().is_err());
        assert_eq!(s.quote().unwrap(), before);
    }

    #[test]
    fn test_issued_ids_are_unique_across_retries() {
        let mut s = session();
        let first = s.issue_attempt(GatewayKind::ThreePhase);
        let second = s.issue_attempt(GatewayKind::ThreePhase);
        assert_ne!(first.internal_order_id, second.internal_order_id);
        assert_eq!(s.issued_order_ids().len(), 2);
    }
}
