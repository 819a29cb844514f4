use chrono::{DateTime, Utc};
use finvo_core::{Currency, InvoiceId, InvoiceStatus};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A customer invoice.
///
/// `status` is the stored lifecycle status except on read paths, where a
/// pending invoice past its due date is reported as overdue.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Invoice {
    pub id: InvoiceId,
    /// Human-facing number, unique per creator.
    pub invoice_number: String,
    pub creator_id: String,
    /// Wallet address payments for this invoice settle to.
    pub recipient_address: String,
    pub amount: Decimal,
    pub currency: Currency,
    /// USD value snapshot taken at creation, when a price was available.
    pub fiat_amount: Option<Decimal>,
    pub status: InvoiceStatus,
    pub description: Option<String>,
    pub due_date: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    /// Set when the invoice enters paid, cleared again on refund.
    pub paid_at: Option<DateTime<Utc>>,
}

/// Payload for creating an invoice.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateInvoice {
    pub creator_id: String,
    pub recipient_address: String,
    pub amount: Decimal,
    pub currency: Currency,
    /// Explicit invoice number. Generated from a per-creator sequence
    /// when absent.
    #[serde(default)]
    pub invoice_number: Option<String>,
    /// Initial status, draft or pending only. Defaults to draft.
    #[serde(default)]
    pub status: Option<InvoiceStatus>,
    #[serde(default)]
    pub fiat_amount: Option<Decimal>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub due_date: Option<DateTime<Utc>>,
}

/// Partial update for an invoice. Absent fields are left unchanged.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvoicePatch {
    pub amount: Option<Decimal>,
    pub currency: Option<Currency>,
    pub recipient_address: Option<String>,
    pub description: Option<String>,
    pub due_date: Option<DateTime<Utc>>,
}

impl InvoicePatch {
    /// Whether the patch touches commercial terms, which are frozen once
    /// the invoice leaves draft.
    pub fn touches_terms(&self) -> bool {
        self.amount.is_some() || self.currency.is_some() || self.recipient_address.is_some()
    }

    /// Whether the patch changes anything at all.
    pub fn is_empty(&self) -> bool {
        !self.touches_terms() && self.description.is_none() && self.due_date.is_none()
    }
}

/// Filter for listing invoices.
#[derive(Debug, Clone, Default)]
pub struct InvoiceFilter {
    pub creator_id: Option<String>,
    /// Matched against the derived read-time status.
    pub status: Option<InvoiceStatus>,
}
