//! Buyer Region
//!
//! Derived from the buyer's declared country/state; drives tax-policy
//! selection and the India ⇒ INR currency lock.

use serde::{Deserialize, Serialize};

/// The Indian state that bills IGST instead of CGST+SGST
pub const IGST_STATE: &str = "Maharashtra";

/// Buyer's declared region
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Region {
    /// Country name as declared on the billing form
    pub country: String,

    /// State/province, significant only for India
    pub state: Option<String>,
}

impl Region {
    pub fn new(country: impl Into<String>, state: Option<String>) -> Self {
        Self {
            country: country.into(),
            state,
        }
    }

    /// A non-India region with no state significance
    pub fn international(country: impl Into<String>) -> Self {
        Self::new(country, None)
    }

    /// An Indian region in the given state
    pub fn india(state: impl Into<String>) -> Self {
        Self::new("India", Some(state.into()))
    }

    /// Whether the buyer declared India; triggers the INR currency lock
    /// and the GST-split billing fields
    pub fn is_india(&self) -> bool {
        self.country.eq_ignore_ascii_case("india")
    }

    /// Whether the region bills integrated GST rather than the CGST+SGST split
    pub fn bills_igst(&self) -> bool {
        self.is_india()
            && self
                .state
                .as_deref()
                .is_some_and(|s| s.eq_ignore_ascii_case(IGST_STATE))
    }
}

impl std::fmt::Display for Region {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.state {
            Some(state) => write!(f, "{}, {}", state, self.country),
            None => write!(f, "{}", self.country),
        }
    }
}
