use finvo_core::{InvoiceId, InvoiceStatus, TransactionId};

/// Ledger-layer errors.
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    #[error("invoice not found: {0}")]
    InvoiceNotFound(InvoiceId),

    #[error("transaction not found: {0}")]
    TransactionNotFound(TransactionId),

    #[error("invoice number {number} already exists for creator {creator_id}")]
    DuplicateInvoiceNumber { creator_id: String, number: String },

    #[error("invalid status transition from {from} to {to}")]
    InvalidTransition {
        from: InvoiceStatus,
        to: InvoiceStatus,
    },

    #[error("status conflict: expected {expected}, found {actual}")]
    Conflict {
        expected: InvoiceStatus,
        actual: InvoiceStatus,
    },

    #[error("invoice is not editable in status {status}")]
    NotEditable { status: InvoiceStatus },

    #[error("validation failed: {0}")]
    Validation(String),

    #[error("ledger invariant violated: {0}")]
    InvariantViolation(String),
}
