//! Redirect Gateway Adapter
//!
//! CCAvenue-style flow: the checkout submits a single signed form POST to the
//! external merchant endpoint carrying the final quote total; the merchant
//! service later redirects back with `status`, `orderId`, `transactionId`
//! and `error` query parameters.
//!
//! A `status=success` return is PROVISIONAL. The merchant return can be
//! forged, so it never marks an order verified by itself; the orchestrator
//! reconciles it against the ledger record, and the residual gap (the source
//! system defines no server-side reconciliation endpoint) is carried on
//! [`RedirectOutcome::ProvisionalSuccess`].

use checkout_core::Quote;
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use std::collections::HashMap;

use crate::attempt::PaymentAttempt;
use crate::error::{PaymentError, Result};

type HmacSha256 = Hmac<Sha256>;

/// Redirect gateway configuration
#[derive(Clone, Debug)]
pub struct RedirectConfig {
    /// Merchant endpoint the form posts to
    pub endpoint_url: String,

    /// Merchant account identifier
    pub merchant_id: String,

    /// Shared secret for the request checksum
    pub secret: String,

    /// Where the merchant redirects after payment
    pub return_url: String,

    /// Where the merchant redirects on cancellation
    pub cancel_url: String,
}

impl RedirectConfig {
    pub fn from_env() -> Result<Self> {
        let merchant_id = std::env::var("CHECKOUT_MERCHANT_ID")
            .map_err(|_| PaymentError::Config("CHECKOUT_MERCHANT_ID not set".into()))?;
        let secret = std::env::var("CHECKOUT_MERCHANT_SECRET")
            .map_err(|_| PaymentError::Config("CHECKOUT_MERCHANT_SECRET not set".into()))?;
        let endpoint_url = std::env::var("CHECKOUT_GATEWAY_URL")
            .unwrap_or_else(|_| "http://localhost:4200/transaction".into());
        let return_url = std::env::var("CHECKOUT_RETURN_URL")
            .unwrap_or_else(|_| "http://localhost:3000/checkout".into());

        Ok(Self {
            endpoint_url,
            merchant_id,
            secret,
            cancel_url: return_url.clone(),
            return_url,
        })
    }
}

/// The signed form submission for the merchant endpoint
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RedirectRequest {
    /// Endpoint to POST the fields to
    pub endpoint_url: String,

    /// Ordered form fields, checksum excluded
    pub fields: Vec<(String, String)>,

    /// Hex HMAC-SHA256 over the canonical field string
    pub checksum: String,
}

/// Parsed return-URL query parameters
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RedirectOutcome {
    /// `status=success` came back. Provisional only: must be reconciled
    /// against the ledger before the order counts as verified.
    ProvisionalSuccess {
        order_id: String,
        transaction_id: Option<String>,
    },

    /// Merchant reported a decline or error
    Declined { error: String },

    /// The return parameters were incomplete or unintelligible
    Invalid,
}

/// Adapter for the redirect-based gateway
pub struct RedirectGateway {
    config: RedirectConfig,
}

impl RedirectGateway {
    pub fn new(config: RedirectConfig) -> Self {
        Self { config }
    }

    pub fn from_env() -> Result<Self> {
        Ok(Self::new(RedirectConfig::from_env()?))
    }

    /// Build the signed form submission for the attempt's quote.
    ///
    /// The amount posted is the final quote total; the merchant will echo the
    /// attempt's internal order id back on the return URL.
    pub fn build_request(&self, quote: &Quote, attempt: &PaymentAttempt) -> Result<RedirectRequest> {
        let fields = vec![
            ("merchant_id".to_string(), self.config.merchant_id.clone()),
            (
                "order_id".to_string(),
                attempt.internal_order_id.as_str().to_string(),
            ),
            ("amount".to_string(), quote.total.to_string()),
            ("currency".to_string(), quote.currency.code().to_string()),
            ("redirect_url".to_string(), self.config.return_url.clone()),
            ("cancel_url".to_string(), self.config.cancel_url.clone()),
        ];

        let checksum = self.sign(&fields)?;

        tracing::info!(
            order_id = %attempt.internal_order_id,
            amount = %quote.total,
            currency = %quote.currency,
            "Built redirect gateway submission"
        );

        Ok(RedirectRequest {
            endpoint_url: self.config.endpoint_url.clone(),
            fields,
            checksum,
        })
    }

    /// Interpret the inbound return query parameters.
    ///
    /// When the merchant supplied a `checksum` parameter it is verified
    /// first; a bad signature makes the whole return `Invalid` regardless of
    /// the claimed status.
    pub fn parse_return(&self, params: &HashMap<String, String>) -> RedirectOutcome {
        if let Some(reported) = params.get("checksum") {
            let mut signed: Vec<(String, String)> = params
                .iter()
                .filter(|(k, _)| k.as_str() != "checksum")
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect();
            signed.sort();

            match self.sign(&signed) {
                Ok(expected) if &expected == reported => {}
                _ => {
                    tracing::warn!("Redirect return carried an invalid checksum");
                    return RedirectOutcome::Invalid;
                }
            }
        }

        let status = params.get("status").map(String::as_str);
        let order_id = params.get("orderId").cloned();

        match (status, order_id) {
            (Some("success"), Some(order_id)) => RedirectOutcome::ProvisionalSuccess {
                order_id,
                transaction_id: params.get("transactionId").cloned(),
            },
            (Some("success"), None) => RedirectOutcome::Invalid,
            (Some(_), _) => RedirectOutcome::Declined {
                error: params
                    .get("error")
                    .cloned()
                    .unwrap_or_else(|| "payment was not completed".into()),
            },
            (None, _) => RedirectOutcome::Invalid,
        }
    }

    /// HMAC-SHA256 over `k1=v1&k2=v2&...` in field order
    fn sign(&self, fields: &[(String, String)]) -> Result<String> {
        let canonical = fields
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect::<Vec<_>>()
            .join("&");

        let mut mac = HmacSha256::new_from_slice(self.config.secret.as_bytes())
            .map_err(|e| PaymentError::Config(e.to_string()))?;
        mac.update(canonical.as_bytes());
        Ok(hex::encode(mac.finalize().into_bytes()))
    }
}
