//! Three-Phase Gateway Adapter
//!
//! PayPal-style protocol: create-order, capture, then a server-side verify
//! that re-fetches the order from the gateway and cross-checks amount and
//! currency against the original quote. Capture responses arriving from the
//! buyer's browser are never trusted on their own; only the verify step can
//! confirm an order.

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::{PaymentError, Result};

/// Create-order request: the amount and currency here must EXACTLY match
/// what the gateway later reports as captured
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateGatewayOrder {
    pub report_id: String,
    pub license_type: String,
    pub currency: String,
    pub amount: Decimal,
    pub internal_order_id: String,
}

/// Gateway's order handle
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GatewayOrderId {
    #[serde(rename = "orderID")]
    pub order_id: String,
}

/// Result of capturing an approved order
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaptureResult {
    /// Gateway status string; anything but `COMPLETED` fails the attempt
    pub status: String,
    pub transaction_id: String,
    pub amount: Decimal,
    pub currency: String,
}

/// Server-side verification request
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyOrder {
    #[serde(rename = "orderID")]
    pub order_id: String,
    pub report_id: String,
    pub license_type: String,
    pub amount: Decimal,
    pub currency: String,
    pub internal_order_id: String,
}

/// Verification verdict from the server-side re-fetch
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct VerifyOutcome {
    pub valid: bool,
    #[serde(default)]
    pub payer: Option<serde_json::Value>,
}

/// Three-phase gateway collaborator
#[async_trait]
pub trait ThreePhaseClient: Send + Sync {
    /// Phase 1: register the order with the gateway at the final total
    async fn create_order(&self, request: &CreateGatewayOrder) -> Result<GatewayOrderId>;

    /// Phase 2: capture after the buyer approved in the hosted UI
    async fn capture(&self, gateway_order_id: &str) -> Result<CaptureResult>;

    /// Phase 3: server-side re-fetch and cross-check; the only trusted step
    async fn verify(&self, request: &VerifyOrder) -> Result<VerifyOutcome>;
}

/// Gateway API configuration
#[derive(Clone, Debug)]
pub struct GatewayConfig {
    /// Base URL of the payments API
    pub base_url: String,

    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:4300".into(),
            timeout_secs: 30,
        }
    }
}

impl GatewayConfig {
    pub fn from_env() -> Self {
        let base_url = std::env::var("CHECKOUT_GATEWAY_API_URL")
            .unwrap_or_else(|_| "http://localhost:4300".into());
        Self {
            base_url,
            ..Default::default()
        }
    }
}

/// reqwest-backed three-phase client
pub struct HttpThreePhaseClient {
    client: reqwest::Client,
    config: GatewayConfig,
}

impl HttpThreePhaseClient {
    pub fn new(config: GatewayConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| PaymentError::Config(e.to_string()))?;
        Ok(Self { client, config })
    }

    pub fn from_env() -> Result<Self> {
        Self::new(GatewayConfig::from_env())
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.base_url.trim_end_matches('/'), path)
    }
}

#[async_trait]
impl ThreePhaseClient for HttpThreePhaseClient {
    async fn create_order(&self, request: &CreateGatewayOrder) -> Result<GatewayOrderId> {
        let response = self
            .client
            .post(self.url("/payments/create-order"))
            .json(request)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(PaymentError::GatewayAuth(format!(
                "create-order answered {}",
                response.status()
            )));
        }

        let order: GatewayOrderId = response
            .json()
            .await
            .map_err(|e| PaymentError::InvalidResponse(e.to_string()))?;

        tracing::info!(
            gateway_order_id = %order.order_id,
            internal_order_id = %request.internal_order_id,
            amount = %request.amount,
            currency = %request.currency,
            "Gateway order created"
        );

        Ok(order)
    }

    async fn capture(&self, gateway_order_id: &str) -> Result<CaptureResult> {
        let response = self
            .client
            .post(self.url("/payments/capture-order"))
            .json(&serde_json::json!({ "orderID": gateway_order_id }))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(PaymentError::Declined(format!(
                "capture answered {}",
                response.status()
            )));
        }

        response
            .json()
            .await
            .map_err(|e| PaymentError::InvalidResponse(e.to_string()))
    }

    async fn verify(&self, request: &VerifyOrder) -> Result<VerifyOutcome> {
        let response = self
            .client
            .post(self.url("/payments/verify-order"))
            .json(request)
            .send()
            .await?;

        // The verify endpoint answers 400 on status/amount/currency
        // mismatch and 5xx on upstream auth/fetch failure.
        let status = response.status();
        if status == reqwest::StatusCode::BAD_REQUEST {
            return Err(PaymentError::OrderMismatch {
                field: "gateway_state",
                expected: format!("{} {}", request.amount, request.currency),
                reported: "rejected by server-side verification".into(),
            });
        }
        if !status.is_success() {
            return Err(PaymentError::GatewayAuth(format!(
                "verify-order answered {status}"
            )));
        }

        response
            .json()
            .await
            .map_err(|e| PaymentError::InvalidResponse(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_wire_field_names() {
        let create = CreateGatewayOrder {
            report_id: "rep-42".into(),
            license_type: "single".into(),
            currency: "USD".into(),
            amount: dec!(80),
            internal_order_id: "ord_abc".into(),
        };
        let json = serde_json::to_value(&create).unwrap();
        assert!(json.get("reportId").is_some());
        assert!(json.get("licenseType").is_some());
        assert!(json.get("internalOrderId").is_some());

        let verify = VerifyOrder {
            order_id: "GW-1".into(),
            report_id: "rep-42".into(),
            license_type: "single".into(),
            amount: dec!(80),
            currency: "USD".into(),
            internal_order_id: "ord_abc".into(),
        };
        let json = serde_json::to_value(&verify).unwrap();
        assert!(json.get("orderID").is_some());
    }

    #[test]
    fn test_verify_outcome_tolerates_missing_payer() {
        let outcome: VerifyOutcome = serde_json::from_str(r#"{"valid": true}"#).unwrap();
        assert!(outcome.valid);
        assert!(outcome.payer.is_none());
    }
}
