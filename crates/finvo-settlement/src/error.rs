use finvo_core::{Currency, InvoiceId, InvoiceStatus};
use finvo_rates::RateError;
use rust_decimal::Decimal;

/// Settlement-layer errors.
#[derive(Debug, thiserror::Error)]
pub enum SettlementError {
    #[error("validation failed: {0}")]
    Validation(String),

    #[error("invoice not found: {0}")]
    InvoiceNotFound(InvoiceId),

    #[error("invoice already settled: {0}")]
    AlreadySettled(InvoiceId),

    #[error("invoice {invoice_id} cannot accept payment in status {status}")]
    NotPayable {
        invoice_id: InvoiceId,
        status: InvoiceStatus,
    },

    #[error("invalid invoice state: {0}")]
    InvalidState(String),

    #[error("payment amount too low: expected {expected} {currency}, received {received} {currency}")]
    AmountMismatch {
        expected: Decimal,
        received: Decimal,
        currency: Currency,
    },

    #[error("price feed unavailable: {0}")]
    Upstream(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl From<RateError> for SettlementError {
    fn from(err: RateError) -> Self {
        match err {
            RateError::UnsupportedCurrency(symbol) => {
                SettlementError::Validation(format!("no market rate for {symbol}"))
            }
            RateError::Upstream(message) => SettlementError::Upstream(message),
            RateError::Internal(message) => SettlementError::Internal(message),
        }
    }
}
