//! Engine Error Types

use checkout_core::CoreError;
use checkout_payments::PaymentError;
use checkout_pricing::{CouponError, PricingError};
use thiserror::Error;

/// Result type alias for engine operations
pub type Result<T> = std::result::Result<T, EngineError>;

/// Errors surfaced by the session, state machine and orchestrator
#[derive(Error, Debug)]
pub enum EngineError {
    /// Domain-level failure (validation, currency lock, ...)
    #[error(transparent)]
    Core(#[from] CoreError),

    /// Pricing failure; fatal, blocks the payment step
    #[error(transparent)]
    Pricing(#[from] PricingError),

    /// Coupon rejection; recoverable, the quote is left untouched
    #[error(transparent)]
    Coupon(#[from] CouponError),

    /// Gateway or ledger failure
    #[error(transparent)]
    Payment(#[from] PaymentError),

    /// An event arrived in a state that does not accept it
    #[error("Invalid transition: {event} while {from}")]
    InvalidTransition {
        from: &'static str,
        event: &'static str,
    },

    /// Quote requested before a license tier was chosen
    #[error("No license tier selected")]
    NoLicenseSelected,

    /// A payment attempt is already in flight for this session
    #[error("A payment attempt is already in progress")]
    AttemptInFlight,

    /// A completion/return event arrived with no active attempt
    #[error("No active payment attempt")]
    NoActiveAttempt,
}

impl EngineError {
    /// Get user-friendly message
    pub fn user_message(&self) -> String {
        match self {
            EngineError::Core(e) => e.user_message(),
            EngineError::Payment(e) => e.user_message().to_string(),
            EngineError::Pricing(_) => {
                "Pricing is currently unavailable for this selection.".into()
            }
            EngineError::Coupon(e) => e.to_string(),
            EngineError::AttemptInFlight => {
                "Your payment is already being processed.".into()
            }
            _ => "An error occurred processing your request.".into(),
        }
    }
}
