pub mod balance;
pub mod convert;
pub mod create;
pub mod invoices;
pub mod pay;
pub mod prices;
