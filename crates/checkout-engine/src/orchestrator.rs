//! Payment Orchestrator
//!
//! The single entry point for beginning and completing a payment attempt,
//! regardless of which gateway the buyer chose. Ledger creation happens
//! exactly once per attempt, every external call carries the attempt's
//! internal order id, and the state machine only reaches `VERIFIED` after
//! server-side verification succeeds.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;

use checkout_core::Quote;
use checkout_payments::{
    CreateGatewayOrder, GatewayKind, InvoiceFile, OrderDraft, OrderLedger, OrderUpdate,
    PaymentError, RedirectGateway, RedirectOutcome, RedirectRequest, ThreePhaseClient,
    VerifyOrder, gateway::CAPTURE_COMPLETED,
};

use crate::error::{EngineError, Result};
use crate::machine::{FailureReason, OrderState};
use crate::session::CheckoutSession;

/// What the confirmation view needs after a verified payment
#[derive(Clone, Debug)]
pub struct Confirmation {
    /// Server-confirmed transaction id
    pub transaction_id: String,

    /// "PayPal" or "CCAvenue"
    pub payment_method: &'static str,

    /// Invoice reference; absence disables the download action, it is
    /// never an error
    pub invoice: Option<InvoiceFile>,

    /// The quote the buyer paid, frozen at verification time
    pub quote: Quote,

    /// Payer details the gateway returned on verification, when any
    pub payer: Option<serde_json::Value>,
}

impl Confirmation {
    pub fn invoice_available(&self) -> bool {
        self.invoice.is_some()
    }
}

/// Drives both payment protocols against the ledger and gateway collaborators
pub struct PaymentOrchestrator<L: OrderLedger, G: ThreePhaseClient> {
    ledger: Arc<L>,
    gateway: Arc<G>,
    redirect: RedirectGateway,
}

impl<L: OrderLedger, G: ThreePhaseClient> PaymentOrchestrator<L, G> {
    pub fn new(ledger: Arc<L>, gateway: Arc<G>, redirect: RedirectGateway) -> Self {
        Self {
            ledger,
            gateway,
            redirect,
        }
    }

    // -- shared attempt plumbing -------------------------------------------

    /// Guard + quote + attempt + ledger creation, common to both gateways.
    ///
    /// Billing is re-validated here even though the session already checked
    /// it on submission: client-side checks can be bypassed, and no gateway
    /// call may be made for an invalid form.
    async fn start_attempt(
        &self,
        session: &mut CheckoutSession,
        kind: GatewayKind,
    ) -> Result<Quote> {
        if session.state() != &OrderState::PaymentPending {
            return Err(EngineError::InvalidTransition {
                from: session.state().name(),
                event: "begin_payment",
            });
        }

        match session.attempt() {
            Some(a) if a.gateway_order_id.is_some() || a.transaction_id.is_some() => {
                return Err(EngineError::AttemptInFlight);
            }
            Some(a) if a.gateway == kind => {} // issued by retry(), reuse
            _ => {
                session.issue_attempt(kind);
            }
        }

        let billing = session
            .billing()
            .cloned()
            .ok_or_else(|| checkout_core::CoreError::Validation {
                missing: vec!["billing details".into()],
            })?;
        billing.validate()?;

        let quote = session.quote()?;

        // Ledger creation is fatal when it fails and happens exactly once
        // per attempt; a retry carries the ledger_ref over.
        if session
            .attempt()
            .is_some_and(|a| a.ledger_ref.is_none())
        {
            let draft = OrderDraft {
                language_id: session.language_id(),
                billing,
                quote: quote.clone(),
            };
            match self.ledger.create_order(&draft).await {
                Ok(ledger_ref) => {
                    if let Some(attempt) = session.attempt_mut() {
                        attempt.ledger_ref = Some(ledger_ref);
                    }
                }
                Err(err) => return Err(self.fail_attempt(session, err)),
            }
        }

        Ok(quote)
    }

    /// Record the failure on the machine and hand the error back
    fn fail_attempt(&self, session: &mut CheckoutSession, err: PaymentError) -> EngineError {
        let reason = FailureReason::from_payment_error(&err);
        tracing::error!(error = %err, ?reason, "Payment attempt failed");
        let _ = session.machine_mut().fail(reason);
        EngineError::Payment(err)
    }

    /// Update the ledger after verification. Tolerated on failure: the
    /// buyer still reaches confirmation, without an invoice link.
    async fn finalize_ledger(
        &self,
        session: &CheckoutSession,
        quote: &Quote,
        transaction_id: &str,
        method: &'static str,
    ) -> Option<InvoiceFile> {
        let attempt = session.attempt()?;
        let Some(ledger_ref) = attempt.ledger_ref.clone() else {
            tracing::warn!("No ledger reference on attempt; skipping order update");
            return None;
        };

        let update = OrderUpdate {
            ledger_ref,
            internal_order_id: attempt.internal_order_id.clone(),
            transaction_id: transaction_id.to_string(),
            payment_method: method.to_string(),
            purchase_date: Utc::now().format("%Y-%m-%d").to_string(),
            report_title: quote.report.title.clone(),
            currency: quote.currency.code().to_string(),
            payment_status: "Completed".to_string(),
        };

        match self.ledger.update_order(&update).await {
            Ok(invoice) => invoice,
            Err(err) => {
                tracing::warn!(error = %err, "Ledger update failed; continuing without invoice");
                None
            }
        }
    }

    // -- three-phase protocol ----------------------------------------------

    /// Phase 1: create the pending ledger order, then register the order
    /// with the gateway at the final quote total. Returns the gateway order
    /// id the hosted approval UI needs.
    pub async fn begin_three_phase(&self, session: &mut CheckoutSession) -> Result<String> {
        let quote = self.start_attempt(session, GatewayKind::ThreePhase).await?;
        let attempt = session.attempt().ok_or(EngineError::NoActiveAttempt)?;

        let request = CreateGatewayOrder {
            report_id: quote.report.id.clone(),
            license_type: quote.tier.as_str().to_string(),
            currency: quote.currency.code().to_string(),
            amount: quote.total,
            internal_order_id: attempt.internal_order_id.as_str().to_string(),
        };

        match self.gateway.create_order(&request).await {
            Ok(order) => {
                if let Some(attempt) = session.attempt_mut() {
                    attempt.gateway_order_id = Some(order.order_id.clone());
                }
                Ok(order.order_id)
            }
            Err(err) => Err(self.fail_attempt(session, err)),
        }
    }

    /// Phases 2 and 3: capture after buyer approval, cross-check the
    /// captured amount and currency against the quote, verify server-side,
    /// and only then update the ledger and mark the order verified.
    pub async fn complete_three_phase(
        &self,
        session: &mut CheckoutSession,
    ) -> Result<Confirmation> {
        if session.state() != &OrderState::PaymentPending {
            return Err(EngineError::InvalidTransition {
                from: session.state().name(),
                event: "complete_payment",
            });
        }
        let Some(gateway_order_id) = session
            .attempt()
            .and_then(|a| a.gateway_order_id.clone())
        else {
            return Err(EngineError::NoActiveAttempt);
        };

        let quote = session.quote()?;

        let capture = match self.gateway.capture(&gateway_order_id).await {
            Ok(capture) => capture,
            Err(err) => return Err(self.fail_attempt(session, err)),
        };

        if capture.status != CAPTURE_COMPLETED {
            let err = PaymentError::Declined(format!(
                "capture status was {}, expected {CAPTURE_COMPLETED}",
                capture.status
            ));
            return Err(self.fail_attempt(session, err));
        }

        session.machine_mut().mark_captured()?;

        // The capture response arrived via the buyer's browser; check it
        // before spending a verify round-trip, and fail closed on any
        // disagreement with the quote.
        if capture.amount != quote.total {
            let err = PaymentError::OrderMismatch {
                field: "amount",
                expected: quote.total.to_string(),
                reported: capture.amount.to_string(),
            };
            return Err(self.fail_attempt(session, err));
        }
        if capture.currency != quote.currency.code() {
            let err = PaymentError::OrderMismatch {
                field: "currency",
                expected: quote.currency.code().to_string(),
                reported: capture.currency.clone(),
            };
            return Err(self.fail_attempt(session, err));
        }

        let attempt = session.attempt().ok_or(EngineError::NoActiveAttempt)?;
        let verify_request = VerifyOrder {
            order_id: gateway_order_id,
            report_id: quote.report.id.clone(),
            license_type: quote.tier.as_str().to_string(),
            amount: quote.total,
            currency: quote.currency.code().to_string(),
            internal_order_id: attempt.internal_order_id.as_str().to_string(),
        };

        let outcome = match self.gateway.verify(&verify_request).await {
            Ok(outcome) => outcome,
            Err(err) => return Err(self.fail_attempt(session, err)),
        };
        if !outcome.valid {
            let err = PaymentError::OrderMismatch {
                field: "verification",
                expected: "valid".into(),
                reported: "invalid".into(),
            };
            return Err(self.fail_attempt(session, err));
        }

        let transaction_id = capture.transaction_id.clone();
        if let Some(attempt) = session.attempt_mut() {
            attempt.transaction_id = Some(transaction_id.clone());
        }

        let method = GatewayKind::ThreePhase.payment_method_label();
        let invoice = self
            .finalize_ledger(session, &quote, &transaction_id, method)
            .await;

        session.machine_mut().mark_verified(transaction_id.clone())?;
        tracing::info!(%transaction_id, total = %quote.total, "Payment verified");

        Ok(Confirmation {
            transaction_id,
            payment_method: method,
            invoice,
            quote,
            payer: outcome.payer,
        })
    }

    // -- redirect protocol -------------------------------------------------

    /// Create the pending ledger order and build the signed merchant form
    /// submission for the redirect gateway.
    pub async fn begin_redirect(&self, session: &mut CheckoutSession) -> Result<RedirectRequest> {
        let quote = self.start_attempt(session, GatewayKind::Redirect).await?;
        let attempt = session.attempt().ok_or(EngineError::NoActiveAttempt)?;
        Ok(self.redirect.build_request(&quote, attempt)?)
    }

    /// Handle the merchant's return redirect.
    ///
    /// A `status=success` return is provisional. It is accepted only when
    /// the echoed order id matches the active attempt, and is then
    /// reconciled against the ledger; the source system defines no
    /// dedicated reconciliation endpoint, so the ledger update is the
    /// strongest confirmation available on this path.
    pub async fn handle_redirect_return(
        &self,
        session: &mut CheckoutSession,
        params: &HashMap<String, String>,
    ) -> Result<Confirmation> {
        if session.state() != &OrderState::PaymentPending {
            return Err(EngineError::InvalidTransition {
                from: session.state().name(),
                event: "redirect_return",
            });
        }
        let Some(attempt) = session.attempt().cloned() else {
            return Err(EngineError::NoActiveAttempt);
        };

        match self.redirect.parse_return(params) {
            RedirectOutcome::ProvisionalSuccess {
                order_id,
                transaction_id,
            } => {
                if order_id != attempt.internal_order_id.as_str() {
                    let err = PaymentError::OrderMismatch {
                        field: "order_id",
                        expected: attempt.internal_order_id.to_string(),
                        reported: order_id,
                    };
                    return Err(self.fail_attempt(session, err));
                }

                let quote = session.quote()?;
                let transaction_id = transaction_id.unwrap_or_else(|| order_id_fallback(&order_id));
                if let Some(attempt) = session.attempt_mut() {
                    attempt.transaction_id = Some(transaction_id.clone());
                }

                let method = GatewayKind::Redirect.payment_method_label();
                let invoice = self
                    .finalize_ledger(session, &quote, &transaction_id, method)
                    .await;

                session.machine_mut().mark_verified(transaction_id.clone())?;
                tracing::info!(%transaction_id, "Redirect payment reconciled");

                Ok(Confirmation {
                    transaction_id,
                    payment_method: method,
                    invoice,
                    quote,
                    payer: None,
                })
            }
            RedirectOutcome::Declined { error } => {
                Err(self.fail_attempt(session, PaymentError::Declined(error)))
            }
            RedirectOutcome::Invalid => {
                tracing::warn!("Unintelligible redirect return");
                let _ = session.machine_mut().fail(FailureReason::InvalidReturn);
                Err(EngineError::Payment(PaymentError::InvalidResponse(
                    "redirect return parameters were invalid".into(),
                )))
            }
        }
    }

    // -- failure handling --------------------------------------------------

    /// Buyer closed the payment UI before capture completed. The attempt
    /// (and its ledger order) is retained for a later retry.
    pub fn abandon(&self, session: &mut CheckoutSession) -> Result<()> {
        session.machine_mut().abandon()
    }

    /// Move a retryable failure back to `PAYMENT_PENDING` with a fresh
    /// internal order id; ledger continuity is carried over from the failed
    /// attempt.
    pub fn retry(&self, session: &mut CheckoutSession) -> Result<()> {
        session.machine_mut().retry()?;
        let kind = session
            .attempt()
            .map_or(GatewayKind::ThreePhase, |a| a.gateway);
        session.issue_attempt(kind);
        Ok(())
    }
}

/// The merchant omitted `transactionId`; fall back to its order reference
/// so the ledger still records a traceable id
fn order_id_fallback(order_id: &str) -> String {
    format!("REDIRECT-{order_id}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use checkout_core::{BillingDetails, LicenseTier, RateTable, ReportRef};
    use checkout_payments::{MemoryOrderLedger, MockThreePhaseClient, RedirectConfig};
    use rust_decimal_macros::dec;
    use serde_json::json;

    fn rate_table() -> Arc<RateTable> {
        Arc::new(
            RateTable::from_value(&json!({
                "single_license_offer_price_in_USD": 59.99,
                "single_license_price_in_USD": 79.99,
                "single_license_WELCOME10_in_USD": 49.99,
            }))
            .unwrap(),
        )
    }

    fn ready_session() -> CheckoutSession {
        let mut session = CheckoutSession::new(
            ReportRef::new("rep-42", "Global Widgets Market 2026"),
            1,
            rate_table(),
        );
        session.select_tier(LicenseTier::Single).unwrap();
        session
            .submit_billing(BillingDetails {
                first_name: "Ana".into(),
                last_name: "Silva".into(),
                email: "ana@example.com".into(),
                phone: "+351 900 000 000".into(),
                country: "Portugal".into(),
                ..Default::default()
            })
            .unwrap();
        session
    }

    fn redirect_gateway() -> RedirectGateway {
        RedirectGateway::new(RedirectConfig {
            endpoint_url: "https://merchant.example/transaction".into(),
            merchant_id: "M-123".into(),
            secret: "topsecret".into(),
            return_url: "https://shop.example/checkout".into(),
            cancel_url: "https://shop.example/checkout".into(),
        })
    }

    fn orchestrator(
        ledger: MemoryOrderLedger,
        gateway: MockThreePhaseClient,
    ) -> PaymentOrchestrator<MemoryOrderLedger, MockThreePhaseClient> {
        PaymentOrchestrator::new(Arc::new(ledger), Arc::new(gateway), redirect_gateway())
    }

    #[tokio::test]
    async fn test_three_phase_happy_path() {
        let orch = orchestrator(MemoryOrderLedger::new(), MockThreePhaseClient::new());
        let mut session = ready_session();

        orch.begin_three_phase(&mut session).await.unwrap();
        let confirmation = orch.complete_three_phase(&mut session).await.unwrap();

        assert!(session.state().is_terminal());
        assert!(confirmation.invoice_available());
        assert_eq!(confirmation.payment_method, "PayPal");
        assert_eq!(confirmation.quote.total, dec!(59.99));

        // Exactly one ledger create and one update, both on this attempt
        let ledger = &orch.ledger;
        assert_eq!(ledger.created_orders().len(), 1);
        let updates = ledger.updates();
        assert_eq!(updates.len(), 1);
        assert_eq!(
            updates[0].internal_order_id,
            session.attempt().unwrap().internal_order_id
        );
        assert_eq!(updates[0].payment_status, "Completed");
    }

    #[tokio::test]
    async fn test_amount_mismatch_fails_closed_without_ledger_update() {
        // Gateway captures 49.99 against a 59.99 quote
        let orch = orchestrator(
            MemoryOrderLedger::new(),
            MockThreePhaseClient::new().with_captured_amount(dec!(49.99)),
        );
        let mut session = ready_session();

        orch.begin_three_phase(&mut session).await.unwrap();
        let err = orch.complete_three_phase(&mut session).await.unwrap_err();

        assert!(matches!(
            err,
            EngineError::Payment(PaymentError::OrderMismatch { .. })
        ));
        assert_eq!(
            session.state(),
            &OrderState::Failed {
                reason: FailureReason::OrderMismatch
            }
        );
        assert!(orch.ledger.updates().is_empty());
    }

    #[tokio::test]
    async fn test_non_completed_capture_is_declined() {
        let orch = orchestrator(
            MemoryOrderLedger::new(),
            MockThreePhaseClient::new().with_capture_status("PENDING"),
        );
        let mut session = ready_session();

        orch.begin_three_phase(&mut session).await.unwrap();
        let err = orch.complete_three_phase(&mut session).await.unwrap_err();

        assert!(matches!(
            err,
            EngineError::Payment(PaymentError::Declined(_))
        ));
        assert!(orch.ledger.updates().is_empty());
    }

    #[tokio::test]
    async fn test_ledger_create_failure_blocks_gateway() {
        let gateway = MockThreePhaseClient::new();
        let orch = orchestrator(MemoryOrderLedger::failing_create(), gateway);
        let mut session = ready_session();

        let err = orch.begin_three_phase(&mut session).await.unwrap_err();
        assert!(matches!(
            err,
            EngineError::Payment(PaymentError::LedgerCreate(_))
        ));
        // No gateway order may exist when the ledger refused the attempt
        assert!(orch.gateway.created_order_ids().is_empty());
        assert_eq!(
            session.state(),
            &OrderState::Failed {
                reason: FailureReason::LedgerCreate
            }
        );
    }

    #[tokio::test]
    async fn test_ledger_update_failure_still_confirms_without_invoice() {
        let orch = orchestrator(MemoryOrderLedger::failing_update(), MockThreePhaseClient::new());
        let mut session = ready_session();

        orch.begin_three_phase(&mut session).await.unwrap();
        let confirmation = orch.complete_three_phase(&mut session).await.unwrap();

        assert!(session.state().is_terminal());
        assert!(!confirmation.invoice_available());
    }

    #[tokio::test]
    async fn test_retry_uses_fresh_id_and_keeps_ledger_continuity() {
        let orch = orchestrator(
            MemoryOrderLedger::new(),
            MockThreePhaseClient::new().failing_network(),
        );
        let mut session = ready_session();

        // Ledger create succeeds, gateway create fails
        let err = orch.begin_three_phase(&mut session).await.unwrap_err();
        assert!(matches!(
            err,
            EngineError::Payment(PaymentError::GatewayNetwork(_))
        ));
        let first_id = session.attempt().unwrap().internal_order_id.clone();

        orch.retry(&mut session).unwrap();
        let second_id = session.attempt().unwrap().internal_order_id.clone();

        assert_ne!(first_id, second_id);
        assert_eq!(session.issued_order_ids().len(), 2);
        // Ledger continuity: the pending order is reattached, not re-created
        assert!(session.attempt().unwrap().ledger_ref.is_some());
        assert_eq!(orch.ledger.created_orders().len(), 1);
        assert_eq!(session.state(), &OrderState::PaymentPending);
    }

    #[tokio::test]
    async fn test_quote_cannot_drift_between_begin_and_complete() {
        let orch = orchestrator(MemoryOrderLedger::new(), MockThreePhaseClient::new());
        let mut session = ready_session();

        orch.begin_three_phase(&mut session).await.unwrap();

        // A coupon (or any selection change) mid-attempt would make the
        // created gateway order disagree with the completion cross-check
        assert!(session.apply_coupon("WELCOME10").is_err());
        assert!(session.select_tier(LicenseTier::Team).is_err());

        let confirmation = orch.complete_three_phase(&mut session).await.unwrap();
        assert_eq!(confirmation.quote.total, dec!(59.99));
        assert!(session.state().is_terminal());
    }

    #[tokio::test]
    async fn test_second_begin_while_in_flight_is_rejected() {
        let orch = orchestrator(MemoryOrderLedger::new(), MockThreePhaseClient::new());
        let mut session = ready_session();

        orch.begin_three_phase(&mut session).await.unwrap();
        let err = orch.begin_three_phase(&mut session).await.unwrap_err();
        assert!(matches!(err, EngineError::AttemptInFlight));
    }

    #[tokio::test]
    async fn test_abandonment_leaves_failed_and_retryable() {
        let orch = orchestrator(MemoryOrderLedger::new(), MockThreePhaseClient::new());
        let mut session = ready_session();

        orch.begin_three_phase(&mut session).await.unwrap();
        // A begun attempt cannot be abandoned into VERIFIED
        orch.abandon(&mut session).unwrap();
        assert_eq!(
            session.state(),
            &OrderState::Failed {
                reason: FailureReason::Abandoned
            }
        );
        orch.retry(&mut session).unwrap();
        orch.begin_three_phase(&mut session).await.unwrap();
        let confirmation = orch.complete_three_phase(&mut session).await.unwrap();
        assert!(session.state().is_terminal());
        // Still only one pending ledger order across the whole journey
        assert_eq!(orch.ledger.created_orders().len(), 1);
        assert_eq!(confirmation.payment_method, "PayPal");
    }

    #[tokio::test]
    async fn test_redirect_happy_path_is_reconciled() {
        let orch = orchestrator(MemoryOrderLedger::new(), MockThreePhaseClient::new());
        let mut session = ready_session();

        let request = orch.begin_redirect(&mut session).await.unwrap();
        assert!(!request.checksum.is_empty());

        let order_id = session.attempt().unwrap().internal_order_id.to_string();
        let params = HashMap::from([
            ("status".to_string(), "success".to_string()),
            ("orderId".to_string(), order_id),
            ("transactionId".to_string(), "CCA-778".to_string()),
        ]);

        let confirmation = orch.handle_redirect_return(&mut session, &params).await.unwrap();
        assert!(session.state().is_terminal());
        assert_eq!(confirmation.transaction_id, "CCA-778");
        assert_eq!(confirmation.payment_method, "CCAvenue");
        assert_eq!(orch.ledger.updates().len(), 1);
    }

    #[tokio::test]
    async fn test_redirect_return_with_foreign_order_id_fails() {
        let orch = orchestrator(MemoryOrderLedger::new(), MockThreePhaseClient::new());
        let mut session = ready_session();
        orch.begin_redirect(&mut session).await.unwrap();

        let params = HashMap::from([
            ("status".to_string(), "success".to_string()),
            ("orderId".to_string(), "ord_someone_elses".to_string()),
        ]);
        let err = orch.handle_redirect_return(&mut session, &params).await.unwrap_err();
        assert!(matches!(
            err,
            EngineError::Payment(PaymentError::OrderMismatch { .. })
        ));
        assert!(orch.ledger.updates().is_empty());
    }

    #[tokio::test]
    async fn test_redirect_decline() {
        let orch = orchestrator(MemoryOrderLedger::new(), MockThreePhaseClient::new());
        let mut session = ready_session();
        orch.begin_redirect(&mut session).await.unwrap();

        let params = HashMap::from([
            ("status".to_string(), "failure".to_string()),
            ("error".to_string(), "card declined".to_string()),
        ]);
        let err = orch.handle_redirect_return(&mut session, &params).await.unwrap_err();
        assert!(matches!(
            err,
            EngineError::Payment(PaymentError::Declined(_))
        ));
        assert_eq!(
            session.state(),
            &OrderState::Failed {
                reason: FailureReason::Declined
            }
        );
    }
}
