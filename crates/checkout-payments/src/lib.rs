//! # checkout-payments
//!
//! External collaborators of the checkout engine: the order ledger client
//! and the two payment gateway adapters.
//!
//! ## Payment flows
//!
//! ### 1. Redirect gateway (CCAvenue-style)
//!
//! **Flow:** Checkout → signed POST to merchant → redirect back with status
//!
//! ```text
//! ┌─────────────┐     ┌──────────────────┐     ┌─────────────┐
//! │  Checkout   │────▶│  Merchant Hosted │────▶│  Checkout   │
//! │  (pay)      │     │  Payment Page    │     │  (return)   │
//! └─────────────┘     └──────────────────┘     └─────────────┘
//! ```
//!
//! The return's `status=success` is provisional; it is reconciled against
//! the ledger, never trusted alone.
//!
//! ### 2. Three-phase gateway (PayPal-style)
//!
//! **Flow:** create-order → buyer approval → capture → server-side verify
//!
//! Verification re-fetches the order server-side and cross-checks amount and
//! currency against the original quote; a mismatch fails closed with
//! `PaymentError::OrderMismatch` and money is never recorded as captured
//! without a matching verified order.
//!
//! Both flows thread one `InternalOrderId`, generated before any external
//! call, through every ledger and gateway interaction of an attempt.

pub mod attempt;
pub mod error;
pub mod gateway;
pub mod ledger;

pub use attempt::{GatewayKind, InternalOrderId, PaymentAttempt};
pub use error::{PaymentError, Result};
pub use gateway::{
    CaptureResult, CreateGatewayOrder, GatewayConfig, GatewayOrderId, HttpThreePhaseClient,
    MockThreePhaseClient, RedirectConfig, RedirectGateway, RedirectOutcome, RedirectRequest,
    ThreePhaseClient, VerifyOrder, VerifyOutcome,
};
pub use ledger::{
    HttpOrderLedger, InvoiceFile, LedgerConfig, LedgerRef, MemoryOrderLedger, OrderDraft,
    OrderLedger, OrderUpdate,
};
