use chrono::{DateTime, Utc};
use finvo_core::{Currency, InvoiceId, TransactionId, TransactionStatus, TransactionType};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A recorded value transfer.
///
/// Rows are append-only: once written they are never mutated. Corrections
/// are new rows (refunds).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    pub id: TransactionId,
    /// The invoice this transfer settles, if any.
    pub invoice_id: Option<InvoiceId>,
    pub sender_address: String,
    pub recipient_address: String,
    pub amount: Decimal,
    /// Denomination of `amount`.
    pub currency: Currency,
    /// USD value at recording time, when known.
    pub fiat_amount: Option<Decimal>,
    pub transaction_type: TransactionType,
    pub status: TransactionStatus,
    pub timestamp: DateTime<Utc>,
    /// Reference on the underlying rail, supplied by the caller.
    pub transaction_hash: String,
    pub memo: Option<String>,
}

/// Payload for appending a transaction.
#[derive(Debug, Clone)]
pub struct NewTransaction {
    pub invoice_id: Option<InvoiceId>,
    pub sender_address: String,
    pub recipient_address: String,
    pub amount: Decimal,
    pub currency: Currency,
    pub fiat_amount: Option<Decimal>,
    pub transaction_type: TransactionType,
    pub status: TransactionStatus,
    pub transaction_hash: String,
    pub memo: Option<String>,
}

/// Filter for listing transactions.
#[derive(Debug, Clone, Default)]
pub struct TransactionFilter {
    pub invoice_id: Option<InvoiceId>,
    /// Matches either side of the transfer.
    pub address: Option<String>,
}
