//! License Tiers
//!
//! A report is sold under one of three license classes; the tier determines
//! which rate-table rows apply and how the line item is titled.

use serde::{Deserialize, Serialize};

/// License tier for a report purchase
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LicenseTier {
    Single,
    Team,
    Enterprise,
}

impl LicenseTier {
    /// All tiers, in display order
    pub const ALL: [LicenseTier; 3] = [
        LicenseTier::Single,
        LicenseTier::Team,
        LicenseTier::Enterprise,
    ];

    /// Rate-table key fragment, e.g. `single` in `single_license_price_in_USD`
    pub fn as_str(&self) -> &'static str {
        match self {
            LicenseTier::Single => "single",
            LicenseTier::Team => "team",
            LicenseTier::Enterprise => "enterprise",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "single" => Some(LicenseTier::Single),
            "team" => Some(LicenseTier::Team),
            "enterprise" => Some(LicenseTier::Enterprise),
            _ => None,
        }
    }

    /// Human-readable license title used on quotes and invoices
    pub fn title(&self) -> &'static str {
        match self {
            LicenseTier::Single => "Single User License",
            LicenseTier::Team => "Team License",
            LicenseTier::Enterprise => "Enterprise License",
        }
    }

    /// Seat count granted by the tier
    pub fn seats(&self) -> u32 {
        match self {
            LicenseTier::Single => 1,
            LicenseTier::Team => 5,
            LicenseTier::Enterprise => u32::MAX,
        }
    }
}

impl std::fmt::Display for LicenseTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tier_roundtrip() {
        for tier in LicenseTier::ALL {
            assert_eq!(LicenseTier::from_str(tier.as_str()), Some(tier));
        }
        assert_eq!(LicenseTier::from_str("ENTERPRISE"), Some(LicenseTier::Enterprise));
        assert_eq!(LicenseTier::from_str("site"), None);
    }

    #[test]
    fn test_titles() {
        assert_eq!(LicenseTier::Single.title(), "Single User License");
        assert_eq!(LicenseTier::Team.seats(), 5);
    }
}
