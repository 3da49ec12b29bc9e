//! Payment Gateway Adapters
//!
//! Two supported flows with distinct protocols, both required to end in the
//! same server-verified outcome:
//!
//! - [`redirect`]: one signed POST to the merchant endpoint, confirmation via
//!   return-URL query parameters (provisional until reconciled);
//! - [`three_phase`]: create-order / capture / server-side verify, the only
//!   path that confirms an order without a reconciliation gap.

mod mock;
pub mod redirect;
pub mod three_phase;

pub use mock::MockThreePhaseClient;
pub use redirect::{RedirectConfig, RedirectGateway, RedirectOutcome, RedirectRequest};
pub use three_phase::{
    CaptureResult, CreateGatewayOrder, GatewayConfig, GatewayOrderId, HttpThreePhaseClient,
    ThreePhaseClient, VerifyOrder, VerifyOutcome,
};

/// Capture status the three-phase gateway must report before verification
/// is even attempted
pub const CAPTURE_COMPLETED: &str = "COMPLETED";
