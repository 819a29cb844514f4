//! Finvo Settlement
//!
//! The payment settlement pipeline. Observed payments are valued against
//! the invoice currency and checked against a shortfall tolerance before
//! the invoice store's compare-and-set transition marks the invoice paid.

pub mod error;
pub mod processor;
pub mod types;

pub use error::SettlementError;
pub use processor::SettlementProcessor;
pub use types::{DirectPayment, PaymentRequest, RefundRequest};
