//! Order Ledger Client
//!
//! External-collaborator boundary that persists orders and issues invoice
//! references. `create_order` failing is fatal (payment must not proceed);
//! `update_order` failing is tolerated (confirmation without an invoice).

use async_trait::async_trait;
use checkout_core::{BillingDetails, Quote};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::sync::Mutex;

use crate::attempt::InternalOrderId;
use crate::error::{PaymentError, Result};

/// Reference handed back by the ledger on create
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerRef {
    pub user_id: u64,
    pub language_id: u32,
}

/// Everything the ledger needs to record a pending order: the buyer, the
/// billing form and the quote frozen at the instant payment began
#[derive(Clone, Debug)]
pub struct OrderDraft {
    pub language_id: u32,
    pub billing: BillingDetails,
    pub quote: Quote,
}

/// Post-verification update carrying the confirmed transaction
#[derive(Clone, Debug)]
pub struct OrderUpdate {
    pub ledger_ref: LedgerRef,
    pub internal_order_id: InternalOrderId,
    pub transaction_id: String,
    pub payment_method: String,
    /// `%Y-%m-%d`
    pub purchase_date: String,
    pub report_title: String,
    pub currency: String,
    pub payment_status: String,
}

/// Invoice reference returned by a successful update, when the ledger
/// generated one. Absence disables the download action; it never errors.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvoiceFile(pub String);

/// Order ledger collaborator
#[async_trait]
pub trait OrderLedger: Send + Sync {
    /// Record a pending order. Must not fail silently: an `Err` here blocks
    /// the gateway call entirely.
    async fn create_order(&self, draft: &OrderDraft) -> Result<LedgerRef>;

    /// Attach the verified transaction to the order. Returns the invoice
    /// file when the ledger produced one.
    async fn update_order(&self, update: &OrderUpdate) -> Result<Option<InvoiceFile>>;
}

// ---------------------------------------------------------------------------
// Wire shapes
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
struct CreateOrderPayload<'a> {
    language_id: u32,
    first_name: &'a str,
    last_name: &'a str,
    email: &'a str,
    residence: &'a str,
    phone: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    first_line_add: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    state_province: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    city: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    postal_zipcode: Option<&'a str>,
    license_type: &'a str,
    discount: Decimal,
    subtotal: Decimal,
    cgst: Decimal,
    sgst: Decimal,
    igst: Decimal,
    total: Decimal,
    #[serde(skip_serializing_if = "Option::is_none")]
    offer_code: Option<&'a str>,
}

impl<'a> CreateOrderPayload<'a> {
    fn from_draft(draft: &'a OrderDraft) -> Self {
        let billing = &draft.billing;
        let quote = &draft.quote;
        Self {
            language_id: draft.language_id,
            first_name: &billing.first_name,
            last_name: &billing.last_name,
            email: &billing.email,
            residence: &billing.country,
            phone: &billing.phone,
            first_line_add: billing.first_line_address.as_deref(),
            state_province: billing.state_province.as_deref(),
            city: billing.city.as_deref(),
            postal_zipcode: billing.postal_zipcode.as_deref(),
            license_type: quote.tier.as_str(),
            discount: quote.discount,
            subtotal: quote.subtotal(),
            cgst: quote.tax.cgst,
            sgst: quote.tax.sgst,
            igst: quote.tax.igst,
            total: quote.total,
            offer_code: quote.coupon.as_ref().map(|c| c.code.as_str()),
        }
    }
}

#[derive(Debug, Deserialize)]
struct CreateOrderResponse {
    success: bool,
    user_id: u64,
    language_id: u32,
}

#[derive(Debug, Serialize)]
struct UpdateOrderPayload<'a> {
    user_id: u64,
    language_id: u32,
    order_id: &'a str,
    transaction_id: &'a str,
    payment_method: &'a str,
    purchase_date: &'a str,
    report_title: &'a str,
    currency: &'a str,
    payment_status: &'a str,
}

#[derive(Debug, Deserialize)]
struct UpdateOrderResponse {
    #[serde(default)]
    invoice_file: Option<String>,
}

// ---------------------------------------------------------------------------
// HTTP implementation
// ---------------------------------------------------------------------------

/// Ledger service configuration
#[derive(Clone, Debug)]
pub struct LedgerConfig {
    /// Base URL of the ledger service
    pub base_url: String,

    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:4100".into(),
            timeout_secs: 30,
        }
    }
}

impl LedgerConfig {
    pub fn from_env() -> Self {
        let base_url = std::env::var("CHECKOUT_LEDGER_URL")
            .unwrap_or_else(|_| "http://localhost:4100".into());
        Self {
            base_url,
            ..Default::default()
        }
    }
}

/// reqwest-backed ledger client
pub struct HttpOrderLedger {
    client: reqwest::Client,
    config: LedgerConfig,
}

impl HttpOrderLedger {
    pub fn new(config: LedgerConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| PaymentError::Config(e.to_string()))?;
        Ok(Self { client, config })
    }

    pub fn from_env() -> Result<Self> {
        Self::new(LedgerConfig::from_env())
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.base_url.trim_end_matches('/'), path)
    }
}

#[async_trait]
impl OrderLedger for HttpOrderLedger {
    async fn create_order(&self, draft: &OrderDraft) -> Result<LedgerRef> {
        let payload = CreateOrderPayload::from_draft(draft);
        let response = self
            .client
            .post(self.url("/customer-orders"))
            .json(&payload)
            .send()
            .await
            .map_err(|e| PaymentError::LedgerCreate(e.to_string()))?;

        if !response.status().is_success() {
            return Err(PaymentError::LedgerCreate(format!(
                "ledger answered {}",
                response.status()
            )));
        }

        let body: CreateOrderResponse = response
            .json()
            .await
            .map_err(|e| PaymentError::LedgerCreate(e.to_string()))?;

        if !body.success {
            return Err(PaymentError::LedgerCreate(
                "ledger rejected the order".into(),
            ));
        }

        tracing::info!(
            user_id = body.user_id,
            email = %draft.billing.email,
            total = %draft.quote.total,
            "Ledger recorded pending order"
        );

        Ok(LedgerRef {
            user_id: body.user_id,
            language_id: body.language_id,
        })
    }

    async fn update_order(&self, update: &OrderUpdate) -> Result<Option<InvoiceFile>> {
        let payload = UpdateOrderPayload {
            user_id: update.ledger_ref.user_id,
            language_id: update.ledger_ref.language_id,
            order_id: update.internal_order_id.as_str(),
            transaction_id: &update.transaction_id,
            payment_method: &update.payment_method,
            purchase_date: &update.purchase_date,
            report_title: &update.report_title,
            currency: &update.currency,
            payment_status: &update.payment_status,
        };

        let response = self
            .client
            .post(self.url("/customer-orders/update"))
            .json(&payload)
            .send()
            .await
            .map_err(|e| PaymentError::LedgerUpdate(e.to_string()))?;

        if !response.status().is_success() {
            return Err(PaymentError::LedgerUpdate(format!(
                "ledger answered {}",
                response.status()
            )));
        }

        let body: UpdateOrderResponse = response
            .json()
            .await
            .map_err(|e| PaymentError::LedgerUpdate(e.to_string()))?;

        tracing::info!(
            order_id = %update.internal_order_id,
            transaction_id = %update.transaction_id,
            invoice = body.invoice_file.is_some(),
            "Ledger order updated"
        );

        Ok(body.invoice_file.map(InvoiceFile))
    }
}

// ---------------------------------------------------------------------------
// In-memory implementation (for development/testing)
// ---------------------------------------------------------------------------

/// Records every call; failures are switchable per test
pub struct MemoryOrderLedger {
    created: Mutex<Vec<OrderDraft>>,
    updated: Mutex<Vec<OrderUpdate>>,
    fail_create: bool,
    fail_update: bool,
    invoice: Option<String>,
}

impl Default for MemoryOrderLedger {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryOrderLedger {
    pub fn new() -> Self {
        Self {
            created: Mutex::new(Vec::new()),
            updated: Mutex::new(Vec::new()),
            fail_create: false,
            fail_update: false,
            invoice: Some("invoices/inv-0001.pdf".into()),
        }
    }

    pub fn failing_create() -> Self {
        Self {
            fail_create: true,
            ..Self::new()
        }
    }

    pub fn failing_update() -> Self {
        Self {
            fail_update: true,
            ..Self::new()
        }
    }

    pub fn without_invoice() -> Self {
        Self {
            invoice: None,
            ..Self::new()
        }
    }

    pub fn created_orders(&self) -> Vec<OrderDraft> {
        self.created.lock().unwrap().clone()
    }

    pub fn updates(&self) -> Vec<OrderUpdate> {
        self.updated.lock().unwrap().clone()
    }
}

#[async_trait]
impl OrderLedger for MemoryOrderLedger {
    async fn create_order(&self, draft: &OrderDraft) -> Result<LedgerRef> {
        if self.fail_create {
            return Err(PaymentError::LedgerCreate("ledger unavailable".into()));
        }
        let mut created = self.created.lock().unwrap();
        created.push(draft.clone());
        Ok(LedgerRef {
            user_id: created.len() as u64,
            language_id: draft.language_id,
        })
    }

    async fn update_order(&self, update: &OrderUpdate) -> Result<Option<InvoiceFile>> {
        if self.fail_update {
            return Err(PaymentError::LedgerUpdate("ledger unavailable".into()));
        }
        self.updated.lock().unwrap().push(update.clone());
        Ok(self.invoice.clone().map(InvoiceFile))
    }
}
