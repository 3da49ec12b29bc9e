//! Core Error Types

use thiserror::Error;

/// Result type alias for core domain operations
pub type Result<T> = std::result::Result<T, CoreError>;

/// Domain-level errors
#[derive(Error, Debug)]
pub enum CoreError {
    /// Arithmetic attempted across two different currencies
    #[error("Currency mismatch: {left} vs {right}")]
    CurrencyMismatch {
        left: &'static str,
        right: &'static str,
    },

    /// Billing form failed validation; lists the offending fields
    #[error("Validation failed: {}", missing.join(", "))]
    Validation { missing: Vec<String> },

    /// Currency selector is locked (India ⇒ INR) and cannot be changed
    #[error("Currency is locked to {0} for the buyer's region")]
    CurrencyLocked(&'static str),

    /// Raw rate-table payload could not be interpreted
    #[error("Rate table parse error: {0}")]
    RateTableParse(String),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl CoreError {
    /// Whether the buyer can fix this by editing their input
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            CoreError::Validation { .. } | CoreError::CurrencyLocked(_)
        )
    }

    /// Get user-friendly message
    pub fn user_message(&self) -> String {
        match self {
            CoreError::Validation { missing } => {
                format!("Please fill in the required fields: {}", missing.join(", "))
            }
            CoreError::CurrencyLocked(code) => {
                format!("Purchases from your region are billed in {code}.")
            }
            _ => "An error occurred processing your request.".into(),
        }
    }
}
