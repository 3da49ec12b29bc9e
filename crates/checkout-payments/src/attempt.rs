//! Payment Attempt
//!
//! One `PaymentAttempt` per try. The `InternalOrderId` is generated before
//! any external call and is the idempotency key threaded through the ledger
//! create, gateway create, verify and ledger update calls of that attempt.
//! An id is never reused across two attempts; a retry gets a fresh one.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::ledger::LedgerRef;

/// Client-generated idempotency key for one payment attempt
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct InternalOrderId(String);

impl InternalOrderId {
    /// Generate a fresh id
    pub fn generate() -> Self {
        Self(format!("ord_{}", Uuid::new_v4().simple()))
    }

    pub fn from_string(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for InternalOrderId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Which gateway the buyer chose
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum GatewayKind {
    /// Single POST to the merchant endpoint, confirmation via return URL
    Redirect,

    /// Create / capture / verify protocol with server-side verification
    ThreePhase,
}

impl GatewayKind {
    /// `payment_method` label on the ledger update call
    pub fn payment_method_label(&self) -> &'static str {
        match self {
            GatewayKind::Redirect => "CCAvenue",
            GatewayKind::ThreePhase => "PayPal",
        }
    }
}

/// Mutable record of the single in-flight payment attempt
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PaymentAttempt {
    /// Idempotency key for every external call of this attempt
    pub internal_order_id: InternalOrderId,

    /// Gateway driving this attempt
    pub gateway: GatewayKind,

    /// Order id assigned by the gateway, once created
    pub gateway_order_id: Option<String>,

    /// Transaction id confirmed by server-side verification
    pub transaction_id: Option<String>,

    /// Ledger reference from the create call; retained across a retry so the
    /// pending order is reattached instead of re-created
    pub ledger_ref: Option<LedgerRef>,

    /// When the attempt began
    pub started_at: DateTime<Utc>,
}

impl PaymentAttempt {
    /// Start a new attempt; the id exists before any external call is made
    pub fn new(gateway: GatewayKind) -> Self {
        Self {
            internal_order_id: InternalOrderId::generate(),
            gateway,
            gateway_order_id: None,
            transaction_id: None,
            ledger_ref: None,
            started_at: Utc::now(),
        }
    }

    /// A follow-up attempt after failure: fresh id, same ledger continuity
    pub fn retry(&self) -> Self {
        Self {
            internal_order_id: InternalOrderId::generate(),
            gateway: self.gateway,
            gateway_order_id: None,
            transaction_id: None,
            ledger_ref: self.ledger_ref.clone(),
            started_at: Utc::now(),
        }
    }
}
