//! Payment Error Types

use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, PaymentError>;

/// Payment and ledger errors
#[derive(Error, Debug)]
pub enum PaymentError {
    /// Gateway rejected our credentials or failed upstream auth
    #[error("Gateway authentication error: {0}")]
    GatewayAuth(String),

    /// Network failure talking to the gateway or ledger
    #[error("Gateway network error: {0}")]
    GatewayNetwork(String),

    /// Gateway declined the payment
    #[error("Payment declined: {0}")]
    Declined(String),

    /// Amount/currency/status disagreement between client-reported and
    /// server-verified gateway state. Never downgraded to a warning.
    #[error("Order mismatch on {field}: expected {expected}, gateway reported {reported}")]
    OrderMismatch {
        field: &'static str,
        expected: String,
        reported: String,
    },

    /// The ledger could not record the attempt; payment must not proceed
    #[error("Ledger create failed: {0}")]
    LedgerCreate(String),

    /// The ledger could not be updated after capture; tolerated (the buyer
    /// still reaches confirmation, without an invoice link)
    #[error("Ledger update failed: {0}")]
    LedgerUpdate(String),

    /// A collaborator answered with a shape we cannot interpret
    #[error("Invalid response from collaborator: {0}")]
    InvalidResponse(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}

impl PaymentError {
    /// Whether a fresh attempt may succeed where this one failed. Gateway
    /// auth and network failures are fatal to the current attempt only; a
    /// mismatch means disagreeing records and is never retried.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            PaymentError::GatewayAuth(_)
                | PaymentError::GatewayNetwork(_)
                | PaymentError::Declined(_)
                | PaymentError::LedgerCreate(_)
        )
    }

    /// Get user-friendly message
    pub fn user_message(&self) -> &str {
        match self {
            PaymentError::GatewayAuth(_) | PaymentError::GatewayNetwork(_) => {
                "Payment processing failed. Please try again."
            }
            PaymentError::Declined(_) => "Your payment was declined.",
            PaymentError::OrderMismatch { .. } => {
                "We could not verify your payment. You have not been charged an incorrect amount; please contact support."
            }
            PaymentError::LedgerCreate(_) => {
                "We could not start your order. Please try again in a moment."
            }
            PaymentError::LedgerUpdate(_) => {
                "Your payment succeeded; the invoice will be emailed to you shortly."
            }
            _ => "An error occurred processing your payment.",
        }
    }
}

impl From<reqwest::Error> for PaymentError {
    fn from(err: reqwest::Error) -> Self {
        PaymentError::GatewayNetwork(err.to_string())
    }
}
