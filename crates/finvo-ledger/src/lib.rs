//! Finvo Ledger
//!
//! Invoice storage with compare-and-set lifecycle transitions, and the
//! append-only ledger of recorded value transfers.

pub mod error;
pub mod invoice;
pub mod ledger;
pub mod store;
pub mod transaction;

pub use error::LedgerError;
pub use invoice::{CreateInvoice, Invoice, InvoiceFilter, InvoicePatch};
pub use ledger::TransactionLedger;
pub use store::InvoiceStore;
pub use transaction::{NewTransaction, Transaction, TransactionFilter};
