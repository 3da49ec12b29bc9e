//! # checkout-engine
//!
//! Session, state machine and payment orchestration for the report store
//! checkout.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────┐   selections    ┌─────────────────────┐
//! │ CheckoutSession  │────────────────▶│ CheckoutStateMachine │
//! │ (tier, currency, │                 │ (guarded transitions)│
//! │  region, coupon, │                 └─────────────────────┘
//! │  billing)        │
//! └────────┬─────────┘
//!          │ quote(): recomputed from scratch, never patched
//!          ▼
//! ┌──────────────────┐   begin/complete   ┌──────────────┐ ┌─────────┐
//! │ PaymentOrchestr. │───────────────────▶│ OrderLedger  │ │ Gateways │
//! └──────────────────┘                    └──────────────┘ └─────────┘
//! ```
//!
//! The orchestrator is the only way to reach `VERIFIED`: ledger creation
//! happens exactly once per attempt, captured amount and currency are
//! cross-checked against the quote, and any disagreement fails closed.

pub mod config;
pub mod error;
pub mod machine;
pub mod orchestrator;
pub mod session;

pub use config::{CheckoutConfig, HttpPaymentOrchestrator};
pub use error::{EngineError, Result};
pub use machine::{CheckoutStateMachine, FailureReason, OrderState};
pub use orchestrator::{Confirmation, PaymentOrchestrator};
pub use session::CheckoutSession;
