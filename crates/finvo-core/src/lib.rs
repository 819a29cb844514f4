pub mod address;
pub mod error;
pub mod status;
pub mod types;

pub use error::CoreError;
pub use status::{derived_status, InvoiceStatus, TransactionStatus, TransactionType};
pub use types::{CryptoCurrency, Currency, FiatCurrency, InvoiceId, TransactionId};
