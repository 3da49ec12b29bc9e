//! Checkout State Machine
//!
//! Owns the step sequence and the guard conditions between steps:
//!
//! ```text
//! SELECTING_LICENSE --(choose tier)-----------> BILLING_ENTRY
//! BILLING_ENTRY ----(submit valid billing)----> PAYMENT_PENDING
//! BILLING_ENTRY ----(back)--------------------> SELECTING_LICENSE
//! PAYMENT_PENDING --(capture COMPLETED)-------> CAPTURED
//! CAPTURED --------(server-side verified)-----> VERIFIED   [terminal]
//! PAYMENT_PENDING / CAPTURED --(failure)------> FAILED
//! FAILED ----------(retry)--------------------> PAYMENT_PENDING
//! ```
//!
//! `Verified` carries the server-confirmed transaction id and is reachable
//! only through the orchestrator's verify step, never from a client-side
//! success callback.

use checkout_payments::PaymentError;
use serde::{Deserialize, Serialize};

use crate::error::{EngineError, Result};

/// Why an attempt failed; drives user messaging and retry eligibility
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum FailureReason {
    GatewayAuth,
    GatewayNetwork,
    Declined,
    OrderMismatch,
    LedgerCreate,
    /// Redirect return parameters were missing or unintelligible
    InvalidReturn,
    /// Buyer closed the payment UI before capture completed
    Abandoned,
}

impl FailureReason {
    /// Whether a fresh attempt may succeed. Every failure is fatal only to
    /// its own attempt except a mismatch, which indicates disagreeing
    /// records rather than a transient fault.
    pub fn is_retryable(&self) -> bool {
        !matches!(self, FailureReason::OrderMismatch)
    }

    pub fn from_payment_error(err: &PaymentError) -> Self {
        match err {
            PaymentError::GatewayAuth(_) | PaymentError::Config(_) => FailureReason::GatewayAuth,
            PaymentError::Declined(_) => FailureReason::Declined,
            PaymentError::OrderMismatch { .. } => FailureReason::OrderMismatch,
            PaymentError::LedgerCreate(_) => FailureReason::LedgerCreate,
            _ => FailureReason::GatewayNetwork,
        }
    }
}

/// Checkout progress for one attempt at buying a report
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderState {
    SelectingLicense,
    BillingEntry,
    PaymentPending,
    Captured,
    Verified { transaction_id: String },
    Failed { reason: FailureReason },
}

impl OrderState {
    /// Short name for logging and transition errors
    pub fn name(&self) -> &'static str {
        match self {
            OrderState::SelectingLicense => "SELECTING_LICENSE",
            OrderState::BillingEntry => "BILLING_ENTRY",
            OrderState::PaymentPending => "PAYMENT_PENDING",
            OrderState::Captured => "CAPTURED",
            OrderState::Verified { .. } => "VERIFIED",
            OrderState::Failed { .. } => "FAILED",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderState::Verified { .. })
    }
}

/// Guarded transition driver
#[derive(Clone, Debug, Default)]
pub struct CheckoutStateMachine {
    state: OrderState,
}

impl Default for OrderState {
    fn default() -> Self {
        OrderState::SelectingLicense
    }
}

impl CheckoutStateMachine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &OrderState {
        &self.state
    }

    fn transition(&mut self, next: OrderState, event: &'static str) {
        tracing::info!(from = self.state.name(), to = next.name(), event, "Checkout transition");
        self.state = next;
    }

    fn invalid(&self, event: &'static str) -> EngineError {
        EngineError::InvalidTransition {
            from: self.state.name(),
            event,
        }
    }

    /// Buyer picked a license tier
    pub fn choose_tier(&mut self) -> Result<()> {
        match self.state {
            OrderState::SelectingLicense => {
                self.transition(OrderState::BillingEntry, "choose_tier");
                Ok(())
            }
            _ => Err(self.invalid("choose_tier")),
        }
    }

    /// Billing form passed validation
    pub fn submit_billing(&mut self) -> Result<()> {
        match self.state {
            OrderState::BillingEntry => {
                self.transition(OrderState::PaymentPending, "submit_billing");
                Ok(())
            }
            _ => Err(self.invalid("submit_billing")),
        }
    }

    /// Buyer navigated back to license selection
    pub fn back(&mut self) -> Result<()> {
        match self.state {
            OrderState::BillingEntry => {
                self.transition(OrderState::SelectingLicense, "back");
                Ok(())
            }
            _ => Err(self.invalid("back")),
        }
    }

    /// Gateway reported a COMPLETED capture (still unverified)
    pub fn mark_captured(&mut self) -> Result<()> {
        match self.state {
            OrderState::PaymentPending => {
                self.transition(OrderState::Captured, "mark_captured");
                Ok(())
            }
            _ => Err(self.invalid("mark_captured")),
        }
    }

    /// Server-side verification confirmed the transaction. The redirect
    /// path verifies without a distinct capture phase, so `PaymentPending`
    /// is accepted as well as `Captured`.
    pub fn mark_verified(&mut self, transaction_id: impl Into<String>) -> Result<()> {
        match self.state {
            OrderState::Captured | OrderState::PaymentPending => {
                self.transition(
                    OrderState::Verified {
                        transaction_id: transaction_id.into(),
                    },
                    "mark_verified",
                );
                Ok(())
            }
            _ => Err(self.invalid("mark_verified")),
        }
    }

    /// Attempt failed; the reason decides retry eligibility
    pub fn fail(&mut self, reason: FailureReason) -> Result<()> {
        match self.state {
            OrderState::PaymentPending | OrderState::Captured => {
                self.transition(OrderState::Failed { reason }, "fail");
                Ok(())
            }
            _ => Err(self.invalid("fail")),
        }
    }

    /// Buyer closed the payment UI before capture completed
    pub fn abandon(&mut self) -> Result<()> {
        self.fail(FailureReason::Abandoned)
    }

    /// Start a fresh attempt after a retryable failure
    pub fn retry(&mut self) -> Result<()> {
        match &self.state {
            OrderState::Failed { reason } if reason.is_retryable() => {
                self.transition(OrderState::PaymentPending, "retry");
                Ok(())
            }
            _ => Err(self.invalid("retry")),
        }
    }
}
