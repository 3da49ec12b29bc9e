//! Engine configuration
//!
//! Assembles the HTTP-backed collaborators from environment variables, with
//! localhost defaults for local development. Only the redirect merchant
//! credentials are mandatory.

use std::sync::Arc;

use checkout_payments::{
    GatewayConfig, HttpOrderLedger, HttpThreePhaseClient, LedgerConfig, RedirectConfig,
    RedirectGateway,
};

use crate::orchestrator::PaymentOrchestrator;

/// Orchestrator wired to the real HTTP collaborators
pub type HttpPaymentOrchestrator = PaymentOrchestrator<HttpOrderLedger, HttpThreePhaseClient>;

/// Full engine configuration
#[derive(Clone, Debug)]
pub struct CheckoutConfig {
    pub ledger: LedgerConfig,
    pub gateway: GatewayConfig,
    pub redirect: RedirectConfig,
}

impl CheckoutConfig {
    /// Read configuration from the environment.
    ///
    /// - `CHECKOUT_LEDGER_URL` (default `http://localhost:4100`)
    /// - `CHECKOUT_GATEWAY_API_URL` (default `http://localhost:4300`)
    /// - `CHECKOUT_GATEWAY_URL` (default `http://localhost:4200/transaction`)
    /// - `CHECKOUT_MERCHANT_ID` / `CHECKOUT_MERCHANT_SECRET` (required)
    /// - `CHECKOUT_RETURN_URL` (default `http://localhost:3000/checkout`)
    pub fn from_env() -> anyhow::Result<Self> {
        Ok(Self {
            ledger: LedgerConfig::from_env(),
            gateway: GatewayConfig::from_env(),
            redirect: RedirectConfig::from_env()?,
        })
    }

    /// Build the orchestrator for this configuration
    pub fn build(self) -> anyhow::Result<HttpPaymentOrchestrator> {
        let ledger = Arc::new(HttpOrderLedger::new(self.ledger)?);
        let gateway = Arc::new(HttpThreePhaseClient::new(self.gateway)?);
        let redirect = RedirectGateway::new(self.redirect);
        Ok(PaymentOrchestrator::new(ledger, gateway, redirect))
    }
}

impl HttpPaymentOrchestrator {
    /// Shortcut for `CheckoutConfig::from_env()?.build()`
    pub fn from_env() -> anyhow::Result<Self> {
        CheckoutConfig::from_env()?.build()
    }
}
