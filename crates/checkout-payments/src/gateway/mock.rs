//! Mock three-phase gateway for development and tests.
//!
//! Remembers every created order and replays it on capture/verify, with
//! switches to simulate wrong captured amounts, non-COMPLETED statuses and
//! network failures.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use rust_decimal::Decimal;

use crate::error::{PaymentError, Result};
use crate::gateway::{
    CAPTURE_COMPLETED, CaptureResult, CreateGatewayOrder, GatewayOrderId, ThreePhaseClient,
    VerifyOrder, VerifyOutcome,
};

#[derive(Default)]
struct MockState {
    orders: HashMap<String, CreateGatewayOrder>,
    captured: Vec<String>,
    counter: u64,
}

/// Scriptable in-memory gateway
pub struct MockThreePhaseClient {
    state: Mutex<MockState>,
    captured_amount_override: Option<Decimal>,
    capture_status: String,
    fail_network: bool,
}

impl Default for MockThreePhaseClient {
    fn default() -> Self {
        Self::new()
    }
}

impl MockThreePhaseClient {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(MockState::default()),
            captured_amount_override: None,
            capture_status: CAPTURE_COMPLETED.into(),
            fail_network: false,
        }
    }

    /// Report a different captured amount than was created (mismatch drill)
    pub fn with_captured_amount(mut self, amount: Decimal) -> Self {
        self.captured_amount_override = Some(amount);
        self
    }

    /// Report a non-COMPLETED capture status
    pub fn with_capture_status(mut self, status: impl Into<String>) -> Self {
        self.capture_status = status.into();
        self
    }

    /// Fail every call with a network error
    pub fn failing_network(mut self) -> Self {
        self.fail_network = true;
        self
    }

    /// Gateway order ids created so far
    pub fn created_order_ids(&self) -> Vec<String> {
        self.state.lock().unwrap().orders.keys().cloned().collect()
    }

    fn check_network(&self) -> Result<()> {
        if self.fail_network {
            Err(PaymentError::GatewayNetwork("connection refused".into()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl ThreePhaseClient for MockThreePhaseClient {
    async fn create_order(&self, request: &CreateGatewayOrder) -> Result<GatewayOrderId> {
        self.check_network()?;
        let mut state = self.state.lock().unwrap();
        state.counter += 1;
        let order_id = format!("GW-{}", state.counter);
        state.orders.insert(order_id.clone(), request.clone());
        Ok(GatewayOrderId { order_id })
    }

    async fn capture(&self, gateway_order_id: &str) -> Result<CaptureResult> {
        self.check_network()?;
        let mut state = self.state.lock().unwrap();
        let Some(order) = state.orders.get(gateway_order_id).cloned() else {
            return Err(PaymentError::Declined("unknown gateway order".into()));
        };
        state.captured.push(gateway_order_id.to_string());

        Ok(CaptureResult {
            status: self.capture_status.clone(),
            transaction_id: format!("TXN-{gateway_order_id}"),
            amount: self.captured_amount_override.unwrap_or(order.amount),
            currency: order.currency,
        })
    }

    async fn verify(&self, request: &VerifyOrder) -> Result<VerifyOutcome> {
        self.check_network()?;
        let state = self.state.lock().unwrap();
        let Some(order) = state.orders.get(&request.order_id) else {
            return Err(PaymentError::GatewayAuth("unknown gateway order".into()));
        };

        // Mirror the real endpoint: mismatch answers 400, mapped to
        // OrderMismatch by the client.
        let captured = self.captured_amount_override.unwrap_or(order.amount);
        let completed = state.captured.contains(&request.order_id)
            && self.capture_status == CAPTURE_COMPLETED;
        if !completed || captured != request.amount || order.currency != request.currency {
            return Err(PaymentError::OrderMismatch {
                field: "gateway_state",
                expected: format!("{} {}", request.amount, request.currency),
                reported: format!("{} {} ({})", captured, order.currency, self.capture_status),
            });
        }

        Ok(VerifyOutcome {
            valid: true,
            payer: Some(serde_json::json!({ "payer_id": "MOCKPAYER" })),
        })
    }
}
