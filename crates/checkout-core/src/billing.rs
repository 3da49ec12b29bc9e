//! Billing Details
//!
//! The billing form captured before payment. Validation is region-conditional:
//! Indian buyers must supply the full GST-invoice address, everyone else only
//! the contact fields. The engine re-runs this validation server-side before
//! any gateway call; client-side checks can be bypassed.

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, Result};
use crate::region::Region;

/// Billing form contents
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BillingDetails {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: String,

    /// Country of residence; source of the buyer's `Region`
    pub country: String,

    /// State/province, required for India
    pub state_province: Option<String>,

    /// City, required for India
    pub city: Option<String>,

    /// Street address, required for India
    pub first_line_address: Option<String>,

    /// Postal code, required for India
    pub postal_zipcode: Option<String>,
}

impl BillingDetails {
    /// Region derived from the declared country/state
    pub fn region(&self) -> Region {
        Region::new(self.country.clone(), self.state_province.clone())
    }

    /// Validate the form against the region-conditional requirements.
    ///
    /// Returns `CoreError::Validation` naming every missing field so the
    /// caller can surface them all at once.
    pub fn validate(&self) -> Result<()> {
        let mut missing = Vec::new();

        require(&mut missing, "first_name", &self.first_name);
        require(&mut missing, "last_name", &self.last_name);
        require(&mut missing, "email", &self.email);
        require(&mut missing, "phone", &self.phone);
        require(&mut missing, "country", &self.country);

        if !self.email.trim().is_empty() && !looks_like_email(&self.email) {
            missing.push("email (invalid format)".into());
        }

        if self.region().is_india() {
            require_opt(&mut missing, "first_line_address", self.first_line_address.as_deref());
            require_opt(&mut missing, "state_province", self.state_province.as_deref());
            require_opt(&mut missing, "city", self.city.as_deref());
            require_opt(&mut missing, "postal_zipcode", self.postal_zipcode.as_deref());
        }

        if missing.is_empty() {
            Ok(())
        } else {
            Err(CoreError::Validation { missing })
        }
    }
}

fn require(missing: &mut Vec<String>, field: &str, value: &str) {
    if value.trim().is_empty() {
        missing.push(field.to_string());
    }
}

fn require_opt(missing: &mut Vec<String>, field: &str, value: Option<&str>) {
    if value.is_none_or(|v| v.trim().is_empty()) {
        missing.push(field.to_string());
    }
}

/// Minimal shape check; real deliverability is the mail provider's problem
fn looks_like_email(value: &str) -> bool {
    let trimmed = value.trim();
    match trimmed.split_once('@') {
        Some((local, domain)) => !local.is_empty() && domain.contains('.'),
        None => false,
    }
}
