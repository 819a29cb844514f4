use finvo_core::{Currency, InvoiceId};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A request to settle an invoice with an observed payment.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentRequest {
    pub invoice_id: InvoiceId,
    /// Address the payment came from.
    pub payer_address: String,
    /// Amount actually transferred, in `currency`.
    pub amount: Decimal,
    pub currency: Currency,
    /// Reference of the transfer on the underlying rail.
    pub transaction_hash: String,
    #[serde(default)]
    pub memo: Option<String>,
}

/// A value transfer with no invoice attached.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DirectPayment {
    pub sender_address: String,
    pub recipient_address: String,
    pub amount: Decimal,
    pub currency: Currency,
    /// USD value reported by the caller, recorded as-is.
    #[serde(default)]
    pub fiat_amount: Option<Decimal>,
    pub transaction_hash: String,
    #[serde(default)]
    pub memo: Option<String>,
}

/// A request to refund a settled invoice in full.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefundRequest {
    pub invoice_id: InvoiceId,
    /// Reference of the refund transfer on the underlying rail.
    pub transaction_hash: String,
    #[serde(default)]
    pub memo: Option<String>,
}
