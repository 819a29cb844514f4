//! Finvo Rates
//!
//! The market data layer for settlement and display:
//! - [`PriceFeed`] implementations over HTTP and an in-process simulator
//! - [`PriceCache`] with per-symbol TTL and stale fallback on outages
//! - [`CurrencyConverter`] for snapshot-based conversion through USD

pub mod cache;
pub mod convert;
pub mod error;
pub mod feed;
pub mod price;

pub use cache::PriceCache;
pub use convert::{convert_with, CurrencyConverter};
pub use error::RateError;
pub use feed::{HttpPriceFeed, PriceFeed, SimulatedFeed};
pub use price::{CryptoPrice, RateSnapshot};
