use std::sync::Arc;

use chrono::Utc;
use dashmap::DashMap;
use finvo_core::{TransactionId, TransactionStatus, TransactionType};

use crate::error::LedgerError;
use crate::store::InvoiceStore;
use crate::transaction::{NewTransaction, Transaction, TransactionFilter};

/// Append-only transaction ledger.
///
/// Invoice references are validated against the invoice store at append
/// time: a successful payment may only be recorded against an invoice that
/// has actually been marked paid. Whether a second success can ever be
/// attempted is decided upstream by the settlement compare-and-set, not
/// re-checked here.
pub struct TransactionLedger {
    transactions: DashMap<TransactionId, Transaction>,
    invoices: Arc<InvoiceStore>,
}

impl TransactionLedger {
    /// Create an empty ledger backed by the given invoice store.
    pub fn new(invoices: Arc<InvoiceStore>) -> Self {
        Self {
            transactions: DashMap::new(),
            invoices,
        }
    }

    /// Append a transaction. Rows are immutable once written.
    pub fn append(&self, new: NewTransaction) -> Result<Transaction, LedgerError> {
        if new.sender_address.trim().is_empty() {
            return Err(LedgerError::Validation("sender address is required".into()));
        }
        if new.recipient_address.trim().is_empty() {
            return Err(LedgerError::Validation(
                "recipient address is required".into(),
            ));
        }
        if new.amount.is_sign_negative() {
            return Err(LedgerError::Validation(format!(
                "amount must not be negative, got {}",
                new.amount
            )));
        }
        if new.transaction_hash.trim().is_empty() {
            return Err(LedgerError::Validation(
                "transaction hash is required".into(),
            ));
        }

        if let Some(invoice_id) = new.invoice_id {
            let invoice = self.invoices.stored(invoice_id)?;
            if new.status == TransactionStatus::Success {
                match new.transaction_type {
                    TransactionType::Payment if !invoice.status.is_settled() => {
                        return Err(LedgerError::InvariantViolation(format!(
                            "successful payment recorded against invoice {} in status {}",
                            invoice_id, invoice.status
                        )));
                    }
                    TransactionType::Refund
                        if invoice.status != finvo_core::InvoiceStatus::Refunded =>
                    {
                        return Err(LedgerError::InvariantViolation(format!(
                            "refund recorded against invoice {} in status {}",
                            invoice_id, invoice.status
                        )));
                    }
                    _ => {}
                }
            }
        }

        let transaction = Transaction {
            id: TransactionId::new(),
            invoice_id: new.invoice_id,
            sender_address: new.sender_address,
            recipient_address: new.recipient_address,
            amount: new.amount,
            currency: new.currency,
            fiat_amount: new.fiat_amount,
            transaction_type: new.transaction_type,
            status: new.status,
            timestamp: Utc::now(),
            transaction_hash: new.transaction_hash,
            memo: new.memo,
        };
        self.transactions.insert(transaction.id, transaction.clone());

        tracing::info!(
            transaction_id = %transaction.id,
            transaction_type = %transaction.transaction_type,
            amount = %transaction.amount,
            currency = %transaction.currency,
            "transaction appended"
        );
        Ok(transaction)
    }

    /// Get a transaction by id.
    pub fn get(&self, id: TransactionId) -> Result<Transaction, LedgerError> {
        self.transactions
            .get(&id)
            .map(|entry| entry.clone())
            .ok_or(LedgerError::TransactionNotFound(id))
    }

    /// List transactions matching the filter, ordered by timestamp.
    pub fn list(&self, filter: &TransactionFilter) -> Vec<Transaction> {
        let mut transactions: Vec<Transaction> = self
            .transactions
            .iter()
            .filter(|entry| {
                filter
                    .invoice_id
                    .map_or(true, |invoice_id| entry.invoice_id == Some(invoice_id))
                    && filter.address.as_ref().map_or(true, |address| {
                        &entry.sender_address == address || &entry.recipient_address == address
                    })
            })
            .map(|entry| entry.clone())
            .collect();
        transactions.sort_by(|a, b| a.timestamp.cmp(&b.timestamp).then(a.id.0.cmp(&b.id.0)));
        transactions
    }

    /// Number of recorded transactions.
    pub fn count(&self) -> usize {
        self.transactions.len()
    }
}
